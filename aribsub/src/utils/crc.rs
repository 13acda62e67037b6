//! CRC validation for caption data groups.
//!
//! Data groups end with a CRC-16 (ITU-T polynomial 0x1021, initial value 0,
//! no final XOR). Running the checksum over the group including the two CRC
//! bytes yields zero for an intact group.

/// CRC algorithm specification with polynomial and initial value.
pub struct Algorithm<T> {
    poly: T,
    init: T,
}

/// CRC-16 algorithm used by data groups.
pub const CRC_DATA_GROUP_ALG: Algorithm<u16> = Algorithm {
    poly: 0x1021,
    init: 0x0000,
};

/// Shifts `len` bits of `value` (held in the high byte) through the polynomial.
#[inline(always)]
pub const fn crc16(poly: u16, mut value: u16, len: usize) -> u16 {
    value <<= 8;

    let mut i = 0;
    while i < len {
        value = (value << 1) ^ (((value >> 15) & 1) * poly);
        i += 1;
    }

    value
}

#[inline(always)]
const fn crc16_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc16(poly, i as u16, 8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc16 {
    pub poly: u16,
    pub init: u16,
    table: [u16; 256],
}

impl Crc16 {
    pub const fn new(algorithm: &Algorithm<u16>) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            table: crc16_table(algorithm.poly),
        }
    }

    const fn table_entry(&self, index: u16) -> u16 {
        self.table[(index & 0xFF) as usize]
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u16, bytes: &[u8]) -> u16 {
        let mut i = 0;

        while i < bytes.len() {
            crc = self.table_entry((crc >> 8) ^ bytes[i] as u16) ^ (crc << 8);
            i += 1;
        }

        crc
    }

    pub const fn checksum(&self, bytes: &[u8]) -> u16 {
        self.update(self.init, bytes)
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new(&CRC_DATA_GROUP_ALG)
    }
}

#[test]
fn check_value() {
    let crc = Crc16::default();
    assert_eq!(crc.checksum(b"123456789"), 0x31C3);
}

#[test]
fn residue_is_zero() {
    let crc = Crc16::default();
    let mut data = b"caption group".to_vec();
    let sum = crc.checksum(&data);
    data.extend_from_slice(&sum.to_be_bytes());

    assert_eq!(crc.checksum(&data), 0);
}

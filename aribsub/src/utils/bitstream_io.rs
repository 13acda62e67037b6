//! Bitstream I/O utilities for caption parsing.
//!
//! Wraps a big-endian `bitstream_io` reader with explicit bounds checks so
//! every read or skip past the end of the buffer surfaces as
//! [`BitReaderError::OutOfRange`] instead of a bare I/O error.

use std::io;
use std::io::SeekFrom;

use bitstream_io::{BigEndian, BitRead, BitReader, UnsignedInteger};

use crate::utils::crc::Crc16;
use crate::utils::errors::BitReaderError;

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
    len: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R, len_bytes: u64) -> Self {
        Self {
            bs: BitReader::new(read),
            len: len_bytes << 3,
        }
    }

    #[inline(always)]
    fn ensure(&mut self, bits: u64) -> Result<(), BitReaderError> {
        let position = self.position()?;
        let available = self.len.saturating_sub(position);

        if bits > available {
            return Err(BitReaderError::OutOfRange {
                bits,
                position,
                available,
            });
        }

        Ok(())
    }

    #[inline(always)]
    pub fn get(&mut self) -> Result<bool, BitReaderError> {
        self.ensure(1)?;
        Ok(self.bs.read_bit()?)
    }

    /// Reads an unsigned value of `n` bits (at most 32), MSB first.
    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> Result<I, BitReaderError> {
        if n > 32 {
            return Err(BitReaderError::WidthTooLarge(n));
        }

        self.ensure(n as u64)?;
        Ok(self.bs.read_unsigned_var(n)?)
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> Result<(), BitReaderError> {
        self.ensure(n as u64)?;
        Ok(self.bs.skip(n)?)
    }

    /// Skips `n` whole bytes.
    pub fn skip_bytes(&mut self, n: usize) -> Result<(), BitReaderError> {
        let bits = (n as u64) << 3;
        self.ensure(bits)?;
        self.bs.seek_bits(SeekFrom::Current(bits as i64))?;

        Ok(())
    }

    /// Copies `n` bytes into a freshly allocated buffer.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, BitReaderError> {
        let mut buf = Vec::new();
        self.append_bytes(n, &mut buf)?;

        Ok(buf)
    }

    /// Appends `n` bytes to `out`, growing it only after the range is known
    /// to lie inside the buffer.
    pub fn append_bytes(&mut self, n: usize, out: &mut Vec<u8>) -> Result<(), BitReaderError> {
        self.ensure((n as u64) << 3)?;

        let start = out.len();
        out.try_reserve_exact(n)
            .map_err(|_| BitReaderError::Allocation(n))?;
        out.resize(start + n, 0);
        self.bs.read_bytes(&mut out[start..])?;

        Ok(())
    }

    #[inline(always)]
    pub fn seek(&mut self, offset: i64) -> Result<u64, BitReaderError> {
        let position = self.position()?;
        let target = position as i64 + offset;

        if target < 0 || target as u64 > self.len {
            return Err(BitReaderError::InvalidSeek(target));
        }

        Ok(self.bs.seek_bits(SeekFrom::Current(offset))?)
    }

    /// Moves the cursor to an absolute bit offset.
    pub fn seek_to(&mut self, bit: u64) -> Result<(), BitReaderError> {
        if bit > self.len {
            return Err(BitReaderError::InvalidSeek(bit as i64));
        }

        self.bs.seek_bits(SeekFrom::Start(bit))?;

        Ok(())
    }

    /// Runs `crc` over a byte-aligned range and restores the cursor.
    pub fn crc16_check(
        &mut self,
        crc: &Crc16,
        start: u64,
        len: u64,
    ) -> Result<u16, BitReaderError> {
        if start & 7 != 0 || len & 7 != 0 {
            return Err(BitReaderError::Unaligned(start));
        }

        if start + len > self.len {
            return Err(BitReaderError::OutOfRange {
                bits: len,
                position: start,
                available: self.len.saturating_sub(start),
            });
        }

        let position = self.position()?;
        self.bs.seek_bits(SeekFrom::Start(start))?;

        let mut checksum = crc.init;
        let mut buf = [0u8; 256];
        let mut remaining = (len >> 3) as usize;

        while remaining > 0 {
            let chunk = remaining.min(buf.len());
            self.bs.read_bytes(&mut buf[..chunk])?;
            checksum = crc.update(checksum, &buf[..chunk]);
            remaining -= chunk;
        }

        self.bs.seek_bits(SeekFrom::Start(position))?;

        Ok(checksum)
    }

    #[inline(always)]
    pub fn available(&mut self) -> Result<u64, BitReaderError> {
        let position = self.position()?;
        Ok(self.len.saturating_sub(position))
    }

    /// Remaining whole bytes.
    pub fn available_bytes(&mut self) -> Result<usize, BitReaderError> {
        Ok((self.available()? >> 3) as usize)
    }

    #[inline(always)]
    pub fn position(&mut self) -> Result<u64, BitReaderError> {
        Ok(self.bs.position_in_bits()?)
    }

    pub fn len_bits(&self) -> u64 {
        self.len
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let len = buf.len() as u64;
        let read = io::Cursor::new(buf);

        Self::new(read, len)
    }
}

impl Default for BsIoSliceReader<'_> {
    fn default() -> Self {
        Self::from_slice(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN: &[u8] = &[0xA5, 0x3C, 0xFF, 0x00, 0x12, 0x34, 0x56, 0x78, 0x9A];

    #[test]
    fn reads_every_width() -> anyhow::Result<()> {
        let mut bits = Vec::with_capacity(GOLDEN.len() * 8);
        for byte in GOLDEN {
            for i in (0..8).rev() {
                bits.push((byte >> i) & 1);
            }
        }

        for width in 1..=32u32 {
            let mut reader = BsIoSliceReader::from_slice(GOLDEN);
            let expected = bits[..width as usize]
                .iter()
                .fold(0u64, |acc, bit| (acc << 1) | *bit as u64);

            let value: u32 = reader.get_n(width)?;
            assert_eq!(value as u64, expected, "width {width}");
            assert_eq!(reader.position()?, width as u64);
        }

        Ok(())
    }

    #[test]
    fn reads_across_byte_boundaries() -> anyhow::Result<()> {
        let mut reader = BsIoSliceReader::from_slice(GOLDEN);

        assert_eq!(reader.get_n::<u8>(4)?, 0xA);
        assert_eq!(reader.get_n::<u8>(8)?, 0x53);
        assert_eq!(reader.get_n::<u16>(12)?, 0xCFF);
        reader.skip_n(8)?;
        assert_eq!(reader.get_n::<u32>(24)?, 0x123456);
        assert_eq!(reader.available()?, 16);

        Ok(())
    }

    #[test]
    fn rejects_reads_past_end() -> anyhow::Result<()> {
        let mut reader = BsIoSliceReader::from_slice(&GOLDEN[..2]);
        reader.skip_n(12)?;

        let err = reader.get_n::<u8>(5).unwrap_err();
        assert!(matches!(
            err,
            BitReaderError::OutOfRange {
                bits: 5,
                position: 12,
                available: 4
            }
        ));
        assert!(reader.skip_n(5).is_err());
        assert_eq!(reader.get_n::<u8>(4)?, 0xC);

        Ok(())
    }

    #[test]
    fn copies_bytes_and_seeks() -> anyhow::Result<()> {
        let mut reader = BsIoSliceReader::from_slice(GOLDEN);
        reader.skip_bytes(4)?;
        assert_eq!(reader.read_bytes(3)?, vec![0x12, 0x34, 0x56]);

        reader.seek_to(8)?;
        let mut out = vec![0xEE];
        reader.append_bytes(2, &mut out)?;
        assert_eq!(out, vec![0xEE, 0x3C, 0xFF]);

        assert!(reader.read_bytes(10).is_err());
        assert!(reader.seek_to(80).is_err());
        assert_eq!(reader.seek(-24)?, 0);

        Ok(())
    }
}

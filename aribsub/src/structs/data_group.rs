//! Data groups.
//!
//! A data group wraps one caption block:
//!
//! | field                        | bits |
//! |------------------------------|------|
//! | data_group_id                | 6    |
//! | data_group_version           | 2    |
//! | data_group_link_number       | 8    |
//! | last_data_group_link_number  | 8    |
//! | data_group_size              | 16   |
//! | data_group_data_byte         | 8 * size |
//! | CRC_16                       | 16   |
//!
//! Group ids 0x00 and 0x20 carry caption management data (sets A and B);
//! the others carry caption statements for language `id & 0x0F`.

use anyhow::{Result, anyhow};
use log::Level::{Debug, Warn};
use log::trace;

use crate::log_or_err;
use crate::process::parse::ParserState;
use crate::structs::caption::{CaptionBlock, CaptionManagement, CaptionStatement};
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::DataGroupError;

pub const DATA_GROUP_HEADER_LEN: u64 = 5;
pub const DATA_GROUP_CRC_LEN: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataGroup {
    pub data_group_id: u8,
    pub data_group_version: u8,
    pub data_group_link_number: u8,
    pub last_data_group_link_number: u8,
    /// Declared size, advisory only.
    pub data_group_size: u16,
    pub block: CaptionBlock,
    /// Outcome of the CRC check, `None` when the CRC is not in the input.
    pub crc_valid: Option<bool>,
}

impl DataGroup {
    pub fn read(state: &mut ParserState, reader: &mut BsIoSliceReader) -> Result<Self> {
        let start = reader.position()?;

        let data_group_id: u8 = reader.get_n(6)?;
        let data_group_version: u8 = reader.get_n(2)?;
        let data_group_link_number: u8 = reader.get_n(8)?;
        let last_data_group_link_number: u8 = reader.get_n(8)?;
        let data_group_size: u16 = reader.get_n(16)?;

        trace!(
            "Data group: id = {data_group_id:#04X}, version = {data_group_version}, \
             link = {data_group_link_number}/{last_data_group_link_number}, size = {data_group_size}"
        );

        let available = reader.available_bytes()?;
        if data_group_size as usize > available {
            log_or_err!(
                state,
                Debug,
                anyhow!(DataGroupError::SizeExceedsInput {
                    declared: data_group_size as usize,
                    available,
                })
            );
        }

        let block = if is_management_id(data_group_id) {
            CaptionBlock::Management(CaptionManagement::read(state, reader)?)
        } else {
            CaptionBlock::Statement(CaptionStatement::read(state, reader)?)
        };

        let checked_len = (DATA_GROUP_HEADER_LEN + data_group_size as u64 + DATA_GROUP_CRC_LEN) << 3;
        let crc_valid = if start + checked_len <= reader.len_bits() {
            let residue = reader.crc16_check(&state.crc, start, checked_len)?;
            if residue != 0 {
                log_or_err!(state, Warn, anyhow!(DataGroupError::CrcMismatch(residue)));
            }

            Some(residue == 0)
        } else {
            None
        };

        Ok(Self {
            data_group_id,
            data_group_version,
            data_group_link_number,
            last_data_group_link_number,
            data_group_size,
            block,
            crc_valid,
        })
    }

    /// Caption language number (1 to 8) of a statement group.
    pub fn language_index(&self) -> Option<u8> {
        (!self.block.is_management()).then_some(self.data_group_id & 0x0F)
    }

    /// Group set, `false` for set A and `true` for set B.
    pub fn is_set_b(&self) -> bool {
        self.data_group_id & 0x20 != 0
    }
}

pub fn is_management_id(data_group_id: u8) -> bool {
    data_group_id == 0x00 || data_group_id == 0x20
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crc::Crc16;

    fn with_crc(mut group: Vec<u8>) -> Vec<u8> {
        let crc = Crc16::default().checksum(&group);
        group.extend_from_slice(&crc.to_be_bytes());
        group
    }

    #[test]
    fn statement_group_with_valid_crc() -> Result<()> {
        let data = with_crc(vec![
            0x04, 0x00, 0x00, 0x00, 0x0A, // id 1, size 10
            0x00, 0x00, 0x00, 0x06, // TMD free, loop 6
            0x1F, 0x20, 0x00, 0x00, 0x01, 0x21,
        ]);
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let group = DataGroup::read(&mut state, &mut reader)?;
        assert_eq!(group.data_group_id, 1);
        assert_eq!(group.language_index(), Some(1));
        assert!(!group.is_set_b());
        assert_eq!(group.crc_valid, Some(true));
        assert_eq!(group.block.statement(), Some(&[0x21][..]));
        Ok(())
    }

    #[test]
    fn management_group_and_bad_crc() -> Result<()> {
        let mut data = with_crc(vec![
            0x80, 0x00, 0x00, 0x00, 0x05, // id 0x20, size 5
            0x00, 0x00, 0x00, 0x00, 0x00, // TMD free, no languages, loop 0
        ]);
        let last = data.len() - 1;
        data[last] ^= 0xFF;

        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let group = DataGroup::read(&mut state, &mut reader)?;
        assert!(group.block.is_management());
        assert!(group.is_set_b());
        assert_eq!(group.language_index(), None);
        assert_eq!(group.crc_valid, Some(false));

        state.fail_level = log::Level::Warn;
        let mut reader = BsIoSliceReader::from_slice(&data);
        assert!(DataGroup::read(&mut state, &mut reader).is_err());
        Ok(())
    }

    #[test]
    fn missing_crc_is_not_checked() -> Result<()> {
        let data = [0x08, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let group = DataGroup::read(&mut state, &mut reader)?;
        assert_eq!(group.crc_valid, None);
        assert_eq!(group.language_index(), Some(2));
        Ok(())
    }
}

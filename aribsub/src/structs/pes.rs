//! Independent PES data packets.
//!
//! The PES payload of a caption stream starts with a data identifier
//! (0x80 synchronized, 0x81 asynchronous), the private stream id 0xFF, a
//! reserved nibble and the length in bytes of the private header that
//! precedes the data group.

use anyhow::{Result, bail};
use log::trace;

use crate::process::parse::ParserState;
use crate::structs::data_group::DataGroup;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::PesError;

pub const DATA_IDENTIFIER_SYNCHRONIZED: u8 = 0x80;
pub const DATA_IDENTIFIER_ASYNCHRONOUS: u8 = 0x81;
pub const PRIVATE_STREAM_ID: u8 = 0xFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PesDataPacket {
    pub data_identifier: u8,
    pub private_stream_id: u8,
    pub header_length: u8,
    pub data_group: DataGroup,
}

impl PesDataPacket {
    pub fn read(state: &mut ParserState, reader: &mut BsIoSliceReader) -> Result<Self> {
        let data_identifier: u8 = reader.get_n(8)?;
        if data_identifier != DATA_IDENTIFIER_SYNCHRONIZED
            && data_identifier != DATA_IDENTIFIER_ASYNCHRONOUS
        {
            bail!(PesError::InvalidDataIdentifier(data_identifier));
        }

        let private_stream_id: u8 = reader.get_n(8)?;
        if private_stream_id != PRIVATE_STREAM_ID {
            bail!(PesError::InvalidStreamId(private_stream_id));
        }

        reader.skip_n(4)?;
        let header_length: u8 = reader.get_n(4)?;
        reader.skip_bytes(header_length as usize)?;

        trace!("PES data packet: identifier = {data_identifier:#04X}, header = {header_length}");

        let data_group = DataGroup::read(state, reader)?;

        Ok(Self {
            data_identifier,
            private_stream_id,
            header_length,
            data_group,
        })
    }

    pub fn is_synchronized(&self) -> bool {
        self.data_identifier == DATA_IDENTIFIER_SYNCHRONIZED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_private_header() -> Result<()> {
        let data = [
            0x81, 0xFF, 0xF2, 0xAA, 0xBB, // two private header bytes
            0x04, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let packet = PesDataPacket::read(&mut state, &mut reader)?;
        assert!(!packet.is_synchronized());
        assert_eq!(packet.header_length, 2);
        assert_eq!(packet.data_group.data_group_id, 1);
        Ok(())
    }

    #[test]
    fn reject_bad_identifiers() {
        let mut state = ParserState::default();

        let mut reader = BsIoSliceReader::from_slice(&[0x7F, 0xFF, 0xF0]);
        let err = PesDataPacket::read(&mut state, &mut reader).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PesError>(),
            Some(PesError::InvalidDataIdentifier(0x7F))
        ));

        let mut reader = BsIoSliceReader::from_slice(&[0x80, 0xFE, 0xF0]);
        let err = PesDataPacket::read(&mut state, &mut reader).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PesError>(),
            Some(PesError::InvalidStreamId(0xFE))
        ));
    }
}

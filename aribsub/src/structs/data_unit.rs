//! Data units.
//!
//! Every data unit is `0x1F`, an 8-bit parameter, a 24-bit size and `size`
//! payload bytes. The payload is always consumed exactly: when the field
//! walk of a unit ends anywhere else, the cursor is moved to the declared
//! end.

use anyhow::{Result, anyhow};
use log::Level::Warn;
use log::trace;

use crate::log_or_err;
use crate::process::parse::ParserState;
use crate::structs::drcs::DrcsData;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::DataUnitError;

pub const UNIT_SEPARATOR: u8 = 0x1F;

pub const PARAMETER_STATEMENT_BODY: u8 = 0x20;
pub const PARAMETER_DRCS_1_BYTE: u8 = 0x30;
pub const PARAMETER_DRCS_2_BYTE: u8 = 0x31;

/// Size of the separator, parameter and size fields.
pub const UNIT_HEADER_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataUnitPayload {
    /// Statement body bytes appended to the block's statement buffer at
    /// `offset`.
    StatementBody { offset: usize, len: usize },
    Drcs(DrcsData),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUnit {
    pub parameter: u8,
    pub size: u32,
    pub payload: DataUnitPayload,
}

impl DataUnit {
    /// Reads one unit. Statement body bytes are appended to `statement`.
    ///
    /// Returns `Ok(None)` when the unit loop has to stop: a bad separator or
    /// a size running past the input. Both are warnings unless the session
    /// fails on warnings.
    pub fn read(
        state: &mut ParserState,
        reader: &mut BsIoSliceReader,
        statement: &mut Vec<u8>,
    ) -> Result<Option<Self>> {
        let unit_separator: u8 = reader.get_n(8)?;
        if unit_separator != UNIT_SEPARATOR {
            log_or_err!(
                state,
                Warn,
                anyhow!(DataUnitError::MalformedUnit(unit_separator))
            );
            return Ok(None);
        }

        let parameter: u8 = reader.get_n(8)?;
        let size: u32 = reader.get_n(24)?;

        let available = reader.available_bytes()?;
        if size as usize > available {
            log_or_err!(
                state,
                Warn,
                anyhow!(DataUnitError::TruncatedStream {
                    declared: size as usize,
                    available,
                })
            );
            return Ok(None);
        }

        let start = reader.position()?;
        let end = start + ((size as u64) << 3);

        trace!("Data unit: parameter = {parameter:#04X}, size = {size}");

        let payload = match parameter {
            PARAMETER_STATEMENT_BODY => {
                let offset = statement.len();
                reader.append_bytes(size as usize, statement)?;

                DataUnitPayload::StatementBody {
                    offset,
                    len: size as usize,
                }
            }
            PARAMETER_DRCS_1_BYTE | PARAMETER_DRCS_2_BYTE => DataUnitPayload::Drcs(
                DrcsData::read(state, reader, parameter == PARAMETER_DRCS_1_BYTE, end)?,
            ),
            _ => {
                reader.skip_bytes(size as usize)?;
                DataUnitPayload::Skipped
            }
        };

        let position = reader.position()?;
        if position != end {
            log_or_err!(
                state,
                Warn,
                anyhow!(DataUnitError::SizeMismatch {
                    declared: size as usize,
                    consumed: (position.saturating_sub(start) >> 3) as usize,
                })
            );
            reader.seek_to(end)?;
        }

        Ok(Some(DataUnit {
            parameter,
            size,
            payload,
        }))
    }

    /// Bytes this unit occupies in the loop, header included.
    pub fn len(&self) -> usize {
        UNIT_HEADER_LEN + self.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn drcs(&self) -> Option<&DrcsData> {
        match &self.payload {
            DataUnitPayload::Drcs(drcs) => Some(drcs),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_body_is_copied() -> Result<()> {
        let data = [0x1F, 0x20, 0x00, 0x00, 0x03, 0xA4, 0xA2, 0x21, 0xFF];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);
        let mut statement = vec![0x0C];

        let unit = DataUnit::read(&mut state, &mut reader, &mut statement)?
            .expect("unit should parse");
        assert_eq!(
            unit.payload,
            DataUnitPayload::StatementBody { offset: 1, len: 3 }
        );
        assert_eq!(statement, vec![0x0C, 0xA4, 0xA2, 0x21]);
        assert_eq!(unit.len(), 8);
        assert_eq!(reader.position()?, 64);
        Ok(())
    }

    #[test]
    fn unknown_units_are_skipped() -> Result<()> {
        let data = [0x1F, 0x28, 0x00, 0x00, 0x02, 0x11, 0x22];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);
        let mut statement = Vec::new();

        let unit = DataUnit::read(&mut state, &mut reader, &mut statement)?
            .expect("unit should parse");
        assert_eq!(unit.payload, DataUnitPayload::Skipped);
        assert!(statement.is_empty());
        assert_eq!(reader.available()?, 0);
        Ok(())
    }

    #[test]
    fn malformed_separator_stops_the_loop() -> Result<()> {
        let data = [0x1E, 0x20, 0x00, 0x00, 0x00];
        let mut state = ParserState::default();
        let mut statement = Vec::new();

        let mut reader = BsIoSliceReader::from_slice(&data);
        assert!(DataUnit::read(&mut state, &mut reader, &mut statement)?.is_none());

        state.fail_level = log::Level::Warn;
        let mut reader = BsIoSliceReader::from_slice(&data);
        assert!(DataUnit::read(&mut state, &mut reader, &mut statement).is_err());
        Ok(())
    }

    #[test]
    fn truncated_size_stops_the_loop() -> Result<()> {
        let data = [0x1F, 0x20, 0x00, 0x00, 0x09, 0x41, 0x42];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);
        let mut statement = Vec::new();

        assert!(DataUnit::read(&mut state, &mut reader, &mut statement)?.is_none());
        assert!(statement.is_empty());
        Ok(())
    }

    #[test]
    fn drcs_underrun_resynchronizes() -> Result<()> {
        // DRCS unit declaring 6 bytes but defining zero codes in the first
        let data = [
            0x1F, 0x30, 0x00, 0x00, 0x06, 0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x1F,
        ];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);
        let mut statement = Vec::new();

        let unit = DataUnit::read(&mut state, &mut reader, &mut statement)?
            .expect("unit should parse");
        assert_eq!(unit.drcs().map(|drcs| drcs.codes.len()), Some(0));
        assert_eq!(reader.position()?, 11 * 8);
        Ok(())
    }

    #[test]
    fn declared_size_bounds_drcs_definition() -> Result<()> {
        // the glyph needs 12 more bytes than the 4 the unit declares
        let data = [
            0x1F, 0x30, 0x00, 0x00, 0x04, 0x01, 0x41, 0x21, 0x01, // DRCS unit
            0x1F, 0x20, 0x00, 0x00, 0x01, 0x21, // statement body
        ];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);
        let mut statement = Vec::new();

        let unit = DataUnit::read(&mut state, &mut reader, &mut statement)?
            .expect("unit should parse");
        assert_eq!(unit.len(), 9);
        assert_eq!(unit.drcs().map(|drcs| drcs.glyphs().count()), Some(0));
        assert_eq!(reader.position()?, 9 * 8);
        assert!(state.slots.is_empty());

        let unit = DataUnit::read(&mut state, &mut reader, &mut statement)?
            .expect("unit should parse");
        assert_eq!(
            unit.payload,
            DataUnitPayload::StatementBody { offset: 0, len: 1 }
        );
        assert_eq!(statement, vec![0x21]);
        assert_eq!(reader.available()?, 0);
        Ok(())
    }

    #[test]
    fn size_mismatch_fails_in_strict_mode() -> Result<()> {
        let data = [
            0x1F, 0x30, 0x00, 0x00, 0x06, 0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE,
        ];
        let mut state = ParserState::default();
        state.fail_level = log::Level::Warn;
        let mut reader = BsIoSliceReader::from_slice(&data);
        let mut statement = Vec::new();

        let err = DataUnit::read(&mut state, &mut reader, &mut statement).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataUnitError>(),
            Some(DataUnitError::SizeMismatch {
                declared: 6,
                consumed: 1
            })
        ));
        Ok(())
    }
}

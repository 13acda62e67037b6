//! Caption management and caption statement blocks.
//!
//! Both block types open with a time control mode and wrap a data unit
//! loop. Management blocks also carry the language table of the service.

use std::fmt::{Display, Formatter};

use anyhow::{Result, anyhow};
use log::Level::Warn;
use log::{trace, warn};

use crate::log_or_err;
use crate::process::parse::ParserState;
use crate::structs::data_unit::{DataUnit, DataUnitPayload};
use crate::structs::drcs::DrcsData;
use crate::structs::timestamp::ClockTime;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::CaptionError;

/// Time control mode (TMD).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeControlMode {
    #[default]
    Free,
    RealTime,
    OffsetTime,
    Reserved,
}

impl From<u8> for TimeControlMode {
    fn from(value: u8) -> Self {
        match value & 0x3 {
            0 => Self::Free,
            1 => Self::RealTime,
            2 => Self::OffsetTime,
            _ => Self::Reserved,
        }
    }
}

/// Display mode for one of reception or playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    AutoDisplay,
    AutoHide,
    Selectable,
    Conditional,
}

impl From<u8> for DisplayMode {
    fn from(value: u8) -> Self {
        match value & 0x3 {
            0 => Self::AutoDisplay,
            1 => Self::AutoHide,
            2 => Self::Selectable,
            _ => Self::Conditional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    StandardDensityHorizontal,
    StandardDensityVertical,
    HighDensityHorizontal,
    HighDensityVertical,
    WesternHorizontal,
    Horizontal1920x1080,
    Vertical1920x1080,
    Horizontal960x540,
    Vertical960x540,
    Horizontal720x480,
    Vertical720x480,
    Horizontal1280x720,
    Vertical1280x720,
    Reserved(u8),
}

impl From<u8> for CaptionFormat {
    fn from(value: u8) -> Self {
        match value {
            0x0 => Self::StandardDensityHorizontal,
            0x1 => Self::StandardDensityVertical,
            0x2 => Self::HighDensityHorizontal,
            0x3 => Self::HighDensityVertical,
            0x4 => Self::WesternHorizontal,
            0x6 => Self::Horizontal1920x1080,
            0x7 => Self::Vertical1920x1080,
            0x8 => Self::Horizontal960x540,
            0x9 => Self::Vertical960x540,
            0xA => Self::Horizontal720x480,
            0xB => Self::Vertical720x480,
            0xC => Self::Horizontal1280x720,
            0xD => Self::Vertical1280x720,
            v => Self::Reserved(v),
        }
    }
}

/// Character coding (TCS).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterCoding {
    EightUnit,
    Ucs,
    Reserved(u8),
}

impl From<u8> for CharacterCoding {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::EightUnit,
            1 => Self::Ucs,
            v => Self::Reserved(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollupMode {
    NonRollup,
    Rollup,
    Reserved(u8),
}

impl From<u8> for RollupMode {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::NonRollup,
            1 => Self::Rollup,
            v => Self::Reserved(v),
        }
    }
}

/// One entry of the management language table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageEntry {
    /// Language number, 0 for the first language.
    pub language_tag: u8,
    /// Raw 4-bit DMF.
    pub display_mode: u8,
    /// Display condition, present for DMF 0xC to 0xE.
    pub display_condition: Option<u8>,
    pub iso_639_language_code: [u8; 3],
    pub format: CaptionFormat,
    pub character_coding: CharacterCoding,
    pub rollup_mode: RollupMode,
}

impl LanguageEntry {
    fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let language_tag: u8 = reader.get_n(3)?;
        reader.skip_n(1)?;
        let display_mode: u8 = reader.get_n(4)?;

        let display_condition = if matches!(display_mode, 0xC..=0xE) {
            Some(reader.get_n(8)?)
        } else {
            None
        };

        let code: u32 = reader.get_n(24)?;
        let [_, a, b, c] = code.to_be_bytes();

        let format: u8 = reader.get_n(4)?;
        let character_coding: u8 = reader.get_n(2)?;
        let rollup_mode: u8 = reader.get_n(2)?;

        Ok(Self {
            language_tag,
            display_mode,
            display_condition,
            iso_639_language_code: [a, b, c],
            format: format.into(),
            character_coding: character_coding.into(),
            rollup_mode: rollup_mode.into(),
        })
    }

    /// Display mode on reception.
    pub fn reception_mode(&self) -> DisplayMode {
        (self.display_mode >> 2).into()
    }

    /// Display mode on recording playback.
    pub fn playback_mode(&self) -> DisplayMode {
        self.display_mode.into()
    }

    pub fn language(&self) -> String {
        String::from_utf8_lossy(&self.iso_639_language_code).into_owned()
    }
}

impl Display for LanguageEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} ({:?}, {:?}, {:?})",
            self.language_tag,
            self.language(),
            self.format,
            self.character_coding,
            self.rollup_mode
        )
    }
}

/// The data unit loop shared by both block types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataUnitLoop {
    /// Declared loop length in bytes.
    pub loop_length: u32,
    pub units: Vec<DataUnit>,
    /// Concatenated statement body bytes. `None` for an empty loop or when
    /// the declared length could not be honoured.
    pub statement: Option<Vec<u8>>,
    /// Bytes consumed by the unit walk.
    pub consumed: usize,
    /// Whether the walk reached the declared length.
    pub complete: bool,
}

impl DataUnitLoop {
    pub fn read(state: &mut ParserState, reader: &mut BsIoSliceReader) -> Result<Self> {
        let loop_length: u32 = reader.get_n(24)?;
        let declared = loop_length as usize;

        let available = reader.available_bytes()?;
        if declared > available {
            log_or_err!(
                state,
                Warn,
                anyhow!(CaptionError::TruncatedStream {
                    declared,
                    available
                })
            );

            return Ok(Self {
                loop_length,
                ..Default::default()
            });
        }

        let mut statement = Vec::new();
        statement
            .try_reserve_exact(declared)
            .map_err(|_| anyhow!(CaptionError::Allocation(declared)))?;

        let start = reader.position()?;
        let mut units = Vec::new();
        let mut consumed = 0;
        let mut complete = true;

        while consumed < declared {
            match DataUnit::read(state, reader, &mut statement)? {
                Some(unit) => units.push(unit),
                None => {
                    complete = false;
                    break;
                }
            }

            consumed = ((reader.position()? - start) >> 3) as usize;
        }

        if complete && consumed != declared {
            warn!("Data unit loop overran: declared {declared}, consumed {consumed}");
        }

        trace!(
            "Data unit loop: {} units, {} statement bytes",
            units.len(),
            statement.len()
        );

        Ok(Self {
            loop_length,
            units,
            statement: (loop_length > 0).then_some(statement),
            consumed,
            complete,
        })
    }

    pub fn drcs(&self) -> impl Iterator<Item = &DrcsData> {
        self.units.iter().filter_map(DataUnit::drcs)
    }

    pub fn statement_units(&self) -> usize {
        self.units
            .iter()
            .filter(|unit| matches!(unit.payload, DataUnitPayload::StatementBody { .. }))
            .count()
    }
}

/// Caption management data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionManagement {
    pub time_control_mode: TimeControlMode,
    /// Offset time, present in offset time mode.
    pub offset_time: Option<ClockTime>,
    pub languages: Vec<LanguageEntry>,
    pub data_units: DataUnitLoop,
}

impl CaptionManagement {
    pub fn read(state: &mut ParserState, reader: &mut BsIoSliceReader) -> Result<Self> {
        let time_control_mode = TimeControlMode::from(reader.get_n::<u8>(2)?);
        reader.skip_n(6)?;

        let offset_time = if time_control_mode == TimeControlMode::OffsetTime {
            ClockTime::read(reader)?
        } else {
            None
        };

        let num_languages: u8 = reader.get_n(8)?;
        let mut languages = Vec::with_capacity(num_languages as usize);
        for _ in 0..num_languages {
            let language = LanguageEntry::read(reader)?;
            trace!("Caption language {language}");
            languages.push(language);
        }

        let data_units = DataUnitLoop::read(state, reader)?;

        Ok(Self {
            time_control_mode,
            offset_time,
            languages,
            data_units,
        })
    }
}

/// Caption statement data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionStatement {
    pub time_control_mode: TimeControlMode,
    /// Presentation start time, present in real time and offset time modes.
    pub start_time: Option<ClockTime>,
    pub data_units: DataUnitLoop,
}

impl CaptionStatement {
    pub fn read(state: &mut ParserState, reader: &mut BsIoSliceReader) -> Result<Self> {
        let time_control_mode = TimeControlMode::from(reader.get_n::<u8>(2)?);
        reader.skip_n(6)?;

        let start_time = if matches!(
            time_control_mode,
            TimeControlMode::RealTime | TimeControlMode::OffsetTime
        ) {
            ClockTime::read(reader)?
        } else {
            None
        };

        let data_units = DataUnitLoop::read(state, reader)?;

        Ok(Self {
            time_control_mode,
            start_time,
            data_units,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionBlock {
    Management(CaptionManagement),
    Statement(CaptionStatement),
}

impl CaptionBlock {
    pub fn data_units(&self) -> &DataUnitLoop {
        match self {
            CaptionBlock::Management(management) => &management.data_units,
            CaptionBlock::Statement(statement) => &statement.data_units,
        }
    }

    pub fn statement(&self) -> Option<&[u8]> {
        self.data_units().statement.as_deref()
    }

    pub fn is_management(&self) -> bool {
        matches!(self, CaptionBlock::Management(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_management_with_languages() -> Result<()> {
        let data = [
            0x80, // TMD = offset time
            0x00, 0x01, 0x30, 0x50, 0x0F, // OTM 00:01:30.500
            0x02, // two languages
            0x0C, 0x05, b'j', b'p', b'n', 0x80, // DMF 0xC with DC
            0x21, b'e', b'n', b'g', 0x41, // tag 1, DMF 1
            0x00, 0x00, 0x00, // empty data unit loop
        ];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let management = CaptionManagement::read(&mut state, &mut reader)?;
        assert_eq!(management.time_control_mode, TimeControlMode::OffsetTime);
        assert_eq!(
            management.offset_time.map(|t| t.as_millis()),
            Some(90_500)
        );
        assert_eq!(management.languages.len(), 2);

        let jpn = &management.languages[0];
        assert_eq!(jpn.display_condition, Some(0x05));
        assert_eq!(jpn.language(), "jpn");
        assert_eq!(jpn.format, CaptionFormat::Horizontal960x540);
        assert_eq!(jpn.reception_mode(), DisplayMode::Conditional);
        assert_eq!(jpn.playback_mode(), DisplayMode::AutoDisplay);

        let eng = &management.languages[1];
        assert_eq!(eng.language_tag, 1);
        assert_eq!(eng.display_condition, None);
        assert_eq!(eng.format, CaptionFormat::WesternHorizontal);
        assert_eq!(eng.rollup_mode, RollupMode::Rollup);

        assert!(management.data_units.statement.is_none());
        assert!(management.data_units.complete);
        assert_eq!(reader.available()?, 0);
        Ok(())
    }

    #[test]
    fn consumed_bytes_match_loop_length() -> Result<()> {
        let data = [
            0x00, // TMD = free
            0x00, 0x00, 0x12, // loop length 18
            0x1F, 0x20, 0x00, 0x00, 0x02, 0xA4, 0xA2, // statement body
            0x1F, 0x28, 0x00, 0x00, 0x00, // empty geometric unit
            0x1F, 0x20, 0x00, 0x00, 0x01, 0x21, // statement body
        ];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let statement = CaptionStatement::read(&mut state, &mut reader)?;
        let units = &statement.data_units;

        assert!(units.complete);
        assert_eq!(units.consumed, 18);
        assert_eq!(units.units.iter().map(DataUnit::len).sum::<usize>(), 18);
        assert_eq!(units.statement.as_deref(), Some(&[0xA4, 0xA2, 0x21][..]));
        assert_eq!(units.statement_units(), 2);
        Ok(())
    }

    #[test]
    fn loop_length_past_input_is_truncated() -> Result<()> {
        let data = [0x40, 0x12, 0x34, 0x56, 0x00, 0x0F, 0x00, 0x01, 0x00];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let statement = CaptionStatement::read(&mut state, &mut reader)?;
        assert_eq!(statement.time_control_mode, TimeControlMode::RealTime);
        assert_eq!(statement.data_units.loop_length, 0x100);
        assert!(statement.data_units.statement.is_none());
        assert!(!statement.data_units.complete);
        Ok(())
    }

    #[test]
    fn invalid_start_time_keeps_statement() -> Result<()> {
        let data = [
            0x40, // TMD = real time
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // STM, not BCD
            0x00, 0x00, 0x07, // loop length 7
            0x1F, 0x20, 0x00, 0x00, 0x02, 0xA4, 0xA4, // statement body
        ];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let statement = CaptionStatement::read(&mut state, &mut reader)?;
        assert_eq!(statement.time_control_mode, TimeControlMode::RealTime);
        assert_eq!(statement.start_time, None);
        assert!(statement.data_units.complete);
        assert_eq!(statement.data_units.statement.as_deref(), Some(&[0xA4, 0xA4][..]));
        Ok(())
    }

    #[test]
    fn malformed_unit_keeps_earlier_text() -> Result<()> {
        let data = [
            0x00, 0x00, 0x00, 0x0C, // loop length 12
            0x1F, 0x20, 0x00, 0x00, 0x01, 0x21, // statement body
            0x2F, 0x20, 0x00, 0x00, 0x00, 0x00, // bad separator
        ];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let statement = CaptionStatement::read(&mut state, &mut reader)?;
        assert!(!statement.data_units.complete);
        assert_eq!(statement.data_units.statement.as_deref(), Some(&[0x21][..]));
        Ok(())
    }
}

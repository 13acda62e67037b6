use anyhow::{Result, anyhow};
use log::Level::Warn;
use log::trace;

use crate::log_or_err;
use crate::process::drcs::{DrcsConversionTable, DrcsSlotTable};
use crate::process::extract::Frame;
use crate::structs::drcs::DrcsGlyph;
use crate::structs::pes::PesDataPacket;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::crc::{CRC_DATA_GROUP_ALG, Crc16};
use crate::utils::errors::DrcsError;

/// Parses caption PES payloads into structured packets.
///
/// The parser is the session object: it owns the DRCS conversion table
/// for its whole lifetime and the per-frame DRCS slot table, which is
/// reset at the start of every [`parse`](Parser::parse) call.
#[derive(Debug, Default)]
pub struct Parser {
    state: ParserState,
}

impl Parser {
    /// Parses one frame into a [`CaptionFrame`].
    ///
    /// Errors abort the frame only; the parser stays usable for the next
    /// frame.
    pub fn parse(&mut self, frame: &Frame) -> Result<CaptionFrame> {
        self.state.begin_frame();

        let reader = &mut BsIoSliceReader::from_slice(frame.as_ref());
        let packet = PesDataPacket::read(&mut self.state, reader)?;

        Ok(CaptionFrame {
            pts: frame.pts,
            packet,
            slots: std::mem::take(&mut self.state.slots),
            stored_glyphs: std::mem::take(&mut self.state.stored_glyphs),
        })
    }

    /// Sets the failure level for validation errors.
    ///
    /// - `log::Level::Error`: Only fail on Error level messages (default)
    /// - `log::Level::Warn`: Fail on Warning level and above (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.state.fail_level = level;
    }

    pub fn set_conversion_table(&mut self, conversion: DrcsConversionTable) {
        self.state.conversion = conversion;
    }

    pub fn conversion_table(&self) -> &DrcsConversionTable {
        &self.state.conversion
    }

    /// Number of frames handed to [`parse`](Parser::parse) so far.
    pub fn frame_count(&self) -> usize {
        self.state.frame_index
    }
}

/// A parsed frame together with the DRCS state it produced.
#[derive(Debug, Clone)]
pub struct CaptionFrame {
    /// Presentation timestamp in 90 kHz ticks.
    pub pts: Option<u64>,
    pub packet: PesDataPacket,
    /// Glyphs registered by this frame, in definition order.
    pub slots: DrcsSlotTable,
    /// Glyphs seen for the first time in this frame and absent from the
    /// conversion table.
    pub stored_glyphs: Vec<DrcsGlyph>,
}

impl CaptionFrame {
    pub fn statement(&self) -> Option<&[u8]> {
        self.packet.data_group.block.statement()
    }
}

#[derive(Debug)]
pub struct ParserState {
    pub fail_level: log::Level,

    pub conversion: DrcsConversionTable,
    pub slots: DrcsSlotTable,
    pub stored_glyphs: Vec<DrcsGlyph>,

    pub crc: Crc16,
    pub frame_index: usize,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,

            conversion: DrcsConversionTable::default(),
            slots: DrcsSlotTable::default(),
            stored_glyphs: Vec::new(),

            crc: Crc16::new(&CRC_DATA_GROUP_ALG),
            frame_index: 0,
        }
    }
}

impl ParserState {
    fn begin_frame(&mut self) {
        self.slots.clear();
        self.stored_glyphs.clear();
        self.frame_index += 1;
    }

    /// Registers a pattern glyph in the slot table.
    ///
    /// A glyph whose hash is in neither the conversion table nor the slot
    /// table is also kept in `stored_glyphs`. Returns the slot index, or
    /// `None` when the table is full and the glyph was dropped.
    pub fn register_glyph(&mut self, glyph: &DrcsGlyph) -> Result<Option<usize>> {
        let known = self.conversion.contains(&glyph.hash) || self.slots.contains(&glyph.hash);

        let Some(index) = self.slots.register(&glyph.hash) else {
            log_or_err!(
                self,
                Warn,
                anyhow!(DrcsError::SlotTableFull(glyph.hash.clone()))
            );
            return Ok(None);
        };

        trace!("DRCS slot {index}: {} (known = {known})", glyph.hash);

        if !known {
            self.stored_glyphs.push(glyph.clone());
        }

        Ok(Some(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::EXAMPLE_DATA;
    use crate::process::test_frame::{drcs_unit, frame, statement_unit};
    use crate::structs::drcs::pattern_hash;
    use crate::utils::errors::PesError;

    #[test]
    fn parse_example_frame() -> Result<()> {
        let mut parser = Parser::default();
        let caption = parser.parse(&Frame::new(Some(900_000), EXAMPLE_DATA))?;

        assert_eq!(caption.pts, Some(900_000));
        assert_eq!(caption.packet.data_group.crc_valid, Some(true));
        assert_eq!(caption.slots.len(), 1);
        assert_eq!(caption.stored_glyphs.len(), 1);
        assert!(caption.statement().is_some_and(|s| !s.is_empty()));
        Ok(())
    }

    #[test]
    fn identical_glyph_is_stored_once() -> Result<()> {
        let glyph = [0x41, 0x21, 0x01, 0x00, 0x00, 0x02, 0x02, 0x5A];
        let mut body = vec![0x02];
        body.extend_from_slice(&glyph);
        body.extend_from_slice(&glyph);

        let data = frame(&[drcs_unit(&body)]);
        let mut parser = Parser::default();
        let caption = parser.parse(&Frame::new(None, &data))?;

        assert_eq!(caption.slots.len(), 2);
        assert_eq!(caption.slots.get(0), caption.slots.get(1));
        assert_eq!(caption.stored_glyphs.len(), 1);
        assert_eq!(caption.stored_glyphs[0].hash, pattern_hash(&[0x5A]));
        Ok(())
    }

    #[test]
    fn known_glyph_is_not_stored() -> Result<()> {
        let hash = pattern_hash(&[0x5A]);
        let mut parser = Parser::default();
        parser.set_conversion_table(DrcsConversionTable::parse(&format!("{hash}=U+2661\n")));

        let data = frame(&[drcs_unit(&[
            0x01, 0x41, 0x21, 0x01, 0x00, 0x00, 0x02, 0x02, 0x5A,
        ])]);
        let caption = parser.parse(&Frame::new(None, &data))?;

        assert_eq!(caption.slots.len(), 1);
        assert!(caption.stored_glyphs.is_empty());
        Ok(())
    }

    #[test]
    fn eleventh_glyph_is_dropped() -> Result<()> {
        let mut body = vec![11];
        for i in 0..11u8 {
            body.extend_from_slice(&[0x41, 0x21 + i, 0x01, 0x00, 0x00, 0x02, 0x02, i]);
        }

        let data = frame(&[drcs_unit(&body)]);
        let mut parser = Parser::default();
        let caption = parser.parse(&Frame::new(None, &data))?;

        assert_eq!(caption.slots.len(), 10);
        assert_eq!(caption.slots.dropped, 1);
        assert_eq!(caption.stored_glyphs.len(), 10);

        // slot table is per frame
        let caption = parser.parse(&Frame::new(None, &frame(&[statement_unit(&[0x21])])))?;
        assert!(caption.slots.is_empty());
        assert_eq!(caption.slots.dropped, 0);
        assert_eq!(parser.frame_count(), 2);

        parser.set_fail_level(log::Level::Warn);
        assert!(parser.parse(&Frame::new(None, &data)).is_err());
        Ok(())
    }

    #[test]
    fn invalid_identifier_keeps_parser_usable() -> Result<()> {
        let mut parser = Parser::default();

        let mut data = EXAMPLE_DATA.to_vec();
        data[0] = 0x7F;
        let err = parser.parse(&Frame::new(None, &data)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PesError>(),
            Some(PesError::InvalidDataIdentifier(0x7F))
        ));

        let caption = parser.parse(&Frame::new(None, EXAMPLE_DATA))?;
        assert_eq!(caption.slots.len(), 1);
        Ok(())
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut parser = Parser::default();
        assert!(parser.parse(&Frame::new(None, &EXAMPLE_DATA[..6])).is_err());
    }
}

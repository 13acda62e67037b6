use anyhow::Result;
use log::debug;

use crate::process::assemble::TextAssembler;
use crate::process::drcs::DrcsConversionTable;
use crate::process::extract::Frame;
use crate::process::parse::{CaptionFrame, Parser};
use crate::structs::drcs::DrcsGlyph;
use crate::structs::region::SubtitleEvent;
use crate::text::eight_unit::EightUnitDecoder;
use crate::text::{DrcsContext, TextDecoder};

/// Options applied when turning decoded text into regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Drop regions set in ruby size (font height 18).
    pub ignore_ruby_text: bool,
    /// Report positions without the half-interval cell adjustment.
    pub ignore_position_adjustment: bool,
    pub default_font_family: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ignore_ruby_text: false,
            ignore_position_adjustment: true,
            default_font_family: "sans-serif".to_string(),
        }
    }
}

/// Decodes caption frames to subtitle events.
///
/// A `Decoder` is the caption session: the DRCS conversion table and the
/// parser state live here between frames. Any error aborts the current
/// frame only and the decoder can be fed the next one.
///
/// ```rust,no_run
/// use aribsub::process::{decode::Decoder, extract::Frame, EXAMPLE_DATA};
///
/// let mut decoder = Decoder::default();
/// if let Some(event) = decoder.decode(&Frame::new(Some(90_000), EXAMPLE_DATA))? {
///     println!("{} -> {}: {}", event.start, event.stop, event.text());
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Decoder<T: TextDecoder = EightUnitDecoder> {
    parser: Parser,
    assembler: TextAssembler,
    text_decoder: T,
    stored_glyphs: Vec<DrcsGlyph>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self::with_text_decoder(config, EightUnitDecoder::default())
    }
}

impl<T: TextDecoder> Decoder<T> {
    pub fn with_text_decoder(config: DecoderConfig, text_decoder: T) -> Self {
        Self {
            parser: Parser::default(),
            assembler: TextAssembler::new(config),
            text_decoder,
            stored_glyphs: Vec::new(),
        }
    }

    /// Decodes one frame.
    ///
    /// Returns `None` when the frame carries no statement text, e.g. for
    /// caption management groups.
    pub fn decode(&mut self, frame: &Frame) -> Result<Option<SubtitleEvent>> {
        self.stored_glyphs.clear();
        let caption = self.parser.parse(frame)?;
        self.decode_caption(caption)
    }

    /// Decodes a frame already parsed by this decoder's parser.
    pub fn decode_caption(&mut self, caption: CaptionFrame) -> Result<Option<SubtitleEvent>> {
        let CaptionFrame {
            pts,
            packet,
            slots,
            stored_glyphs,
        } = caption;
        self.stored_glyphs = stored_glyphs;

        let Some(statement) = packet.data_group.block.statement() else {
            debug!(
                "No statement in data group {:#04X}",
                packet.data_group.data_group_id
            );
            return Ok(None);
        };

        let drcs = DrcsContext::new(&slots, self.parser.conversion_table());
        self.assembler
            .run(&mut self.text_decoder, statement, &drcs, pts)
            .map(Some)
    }

    /// Glyphs first seen in the last decoded frame that have no entry in
    /// the conversion table.
    pub fn stored_glyphs(&self) -> &[DrcsGlyph] {
        &self.stored_glyphs
    }

    pub fn take_stored_glyphs(&mut self) -> Vec<DrcsGlyph> {
        std::mem::take(&mut self.stored_glyphs)
    }

    pub fn parser(&mut self) -> &mut Parser {
        &mut self.parser
    }

    pub fn config(&self) -> &DecoderConfig {
        self.assembler.config()
    }

    /// Sets the failure level for validation errors.
    ///
    /// - `log::Level::Error`: Only fail on Error level messages (default)
    /// - `log::Level::Warn`: Fail on Warning level and above (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.parser.set_fail_level(level);
    }

    pub fn set_conversion_table(&mut self, conversion: DrcsConversionTable) {
        self.parser.set_conversion_table(conversion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::EXAMPLE_DATA;
    use crate::process::test_frame::{frame, statement_unit};
    use crate::structs::drcs::pattern_hash;

    #[test]
    fn decode_example_frame() -> Result<()> {
        let mut decoder = Decoder::default();
        let event = decoder
            .decode(&Frame::new(Some(90_000), EXAMPLE_DATA))?
            .expect("statement");

        assert_eq!((event.start, event.stop), (90_000, 360_000));
        assert!(!event.ephemeral);
        assert_eq!(event.regions.len(), 1);

        let region = &event.regions[0];
        assert_eq!(region.text, "字幕です〓");
        assert_eq!((region.left, region.bottom), (240, 540));
        assert_eq!((region.font_width, region.font_height), (36, 36));
        assert_eq!(region.font_color, 0xFFFFFF);
        assert_eq!(region.font_family, "sans-serif");

        assert_eq!(decoder.stored_glyphs().len(), 1);
        assert_eq!(decoder.stored_glyphs()[0].hash, pattern_hash(&[0x5A]));
        Ok(())
    }

    #[test]
    fn conversion_table_resolves_glyph() -> Result<()> {
        let mut decoder = Decoder::default();
        decoder.set_conversion_table(DrcsConversionTable::parse(&format!(
            "{}=U+2192",
            pattern_hash(&[0x5A])
        )));

        let event = decoder
            .decode(&Frame::new(None, EXAMPLE_DATA))?
            .expect("statement");
        assert_eq!(event.text(), "字幕です→");
        assert_eq!((event.start, event.stop), (0, 270_000));
        assert!(decoder.stored_glyphs().is_empty());
        Ok(())
    }

    #[test]
    fn invalid_frame_then_valid_frame() -> Result<()> {
        let mut decoder = Decoder::default();

        let mut invalid = EXAMPLE_DATA.to_vec();
        invalid[0] = 0x7F;
        assert!(decoder.decode(&Frame::new(Some(0), &invalid)).is_err());

        let event = decoder.decode(&Frame::new(Some(0), EXAMPLE_DATA))?;
        assert!(event.is_some());
        Ok(())
    }

    #[test]
    fn ephemeral_event_without_time() -> Result<()> {
        let data = frame(&[statement_unit(&[0x0C, 0xA2, 0xA4, 0x0D, 0x20])]);

        let event = Decoder::default()
            .decode(&Frame::new(Some(500), &data))?
            .expect("statement");
        assert!(event.ephemeral);
        assert_eq!(event.regions.len(), 1);
        assert_eq!(event.text(), "あい");
        Ok(())
    }

    #[test]
    fn empty_statement_has_no_event() -> Result<()> {
        let data = frame(&[]);
        assert!(Decoder::default().decode(&Frame::new(None, &data))?.is_none());
        Ok(())
    }
}

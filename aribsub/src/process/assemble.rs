use anyhow::Result;
use log::trace;

use crate::process::decode::DecoderConfig;
use crate::structs::region::{SubtitleEvent, TextRegion};
use crate::text::{DecodedRegion, DecodedText, DrcsContext, TextDecoder};
use crate::utils::timing::duration_to_ticks;

/// Turns decoded statement text into timed [`TextRegion`]s.
///
/// Regions keep the order in which the text decoder produced them. Ruby
/// regions (font height 18) are dropped when `ignore_ruby_text` is set,
/// and regions holding only whitespace are always dropped.
#[derive(Debug, Clone, Default)]
pub struct TextAssembler {
    config: DecoderConfig,
}

impl TextAssembler {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes `statement` with `decoder` and assembles the result.
    pub fn run<T: TextDecoder + ?Sized>(
        &self,
        decoder: &mut T,
        statement: &[u8],
        drcs: &DrcsContext<'_>,
        pts: Option<u64>,
    ) -> Result<SubtitleEvent> {
        let decoded = decoder.decode(statement, drcs)?;
        Ok(self.assemble(&decoded, pts))
    }

    pub fn assemble(&self, decoded: &DecodedText, pts: Option<u64>) -> SubtitleEvent {
        let start = pts.unwrap_or(0);
        let stop = start + duration_to_ticks(decoded.duration);

        let regions = decoded
            .regions
            .iter()
            .filter_map(|region| self.region(decoded, region, start, stop))
            .collect::<Vec<_>>();

        SubtitleEvent {
            start,
            stop,
            ephemeral: start == stop,
            regions,
        }
    }

    fn region(
        &self,
        decoded: &DecodedText,
        region: &DecodedRegion,
        start: u64,
        stop: u64,
    ) -> Option<TextRegion> {
        let text = decoded.region_text(region);

        if self.config.ignore_ruby_text && region.font_height == 18 {
            trace!("Dropping ruby region {text:?}");
            return None;
        }
        if text.chars().all(char::is_whitespace) {
            return None;
        }

        let mut left = region.left;
        let mut bottom = region.bottom;
        let mut font_width = region.font_width;

        if !self.config.ignore_position_adjustment {
            left = left.saturating_add(region.horizontal_adjustment);
            bottom = bottom.saturating_add(region.vertical_adjustment);
            if region.font_width != region.font_height {
                font_width = font_width.saturating_sub(region.horizontal_interval / 2);
            }
        }

        Some(TextRegion {
            text: text.to_string(),
            font_family: self.config.default_font_family.clone(),
            font_color: region.foreground_color,
            plane_width: region.plane_width,
            plane_height: region.plane_height,
            font_width,
            font_height: region.font_height,
            vertical_interval: region.vertical_interval,
            horizontal_interval: region.horizontal_interval,
            left,
            bottom,
            start,
            stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn region(span: std::ops::Range<usize>, font_width: u32, font_height: u32) -> DecodedRegion {
        DecodedRegion {
            span,
            foreground_color: 0xFFFFFF,
            plane_width: 960,
            plane_height: 540,
            font_width,
            font_height,
            horizontal_interval: 4,
            vertical_interval: 24,
            left: 240,
            bottom: 540,
            horizontal_adjustment: 2,
            vertical_adjustment: 12,
        }
    }

    #[test]
    fn ignore_ruby_regions() {
        let decoded = DecodedText {
            text: "本文るびtext".to_string(),
            regions: vec![region(0..6, 36, 36), region(6..12, 18, 18), region(12..16, 24, 24)],
            duration: Duration::ZERO,
        };

        let assembler = TextAssembler::new(DecoderConfig {
            ignore_ruby_text: true,
            ..Default::default()
        });
        let event = assembler.assemble(&decoded, Some(1000));

        let texts = event.regions.iter().map(|r| r.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, ["本文", "text"]);
        assert!(event.regions.iter().all(|r| r.font_height != 18));
        assert!(event.ephemeral);
        assert_eq!((event.start, event.stop), (1000, 1000));

        let event = TextAssembler::default().assemble(&decoded, Some(1000));
        assert_eq!(event.regions.len(), 3);
    }

    #[test]
    fn drop_whitespace_and_adjust() {
        let decoded = DecodedText {
            text: "\u{3000} \nＡB".to_string(),
            regions: vec![region(0..5, 36, 36), region(5..9, 18, 36)],
            duration: Duration::from_millis(1500),
        };

        let event = TextAssembler::default().assemble(&decoded, None);
        assert_eq!(event.regions.len(), 1);
        assert_eq!(event.regions[0].text, "ＡB");
        assert_eq!(event.regions[0].font_family, "sans-serif");
        assert_eq!((event.regions[0].left, event.regions[0].bottom), (240, 540));
        assert_eq!(event.regions[0].font_width, 18);
        assert_eq!((event.start, event.stop), (0, 135_000));
        assert!(!event.ephemeral);

        let adjusting = TextAssembler::new(DecoderConfig {
            ignore_position_adjustment: false,
            default_font_family: "serif".to_string(),
            ..Default::default()
        });
        let region = &adjusting.assemble(&decoded, Some(10)).regions[0];
        assert_eq!((region.left, region.bottom), (242, 552));
        assert_eq!(region.font_width, 16);
        assert_eq!(region.font_family, "serif");
        assert_eq!((region.start, region.stop), (10, 135_010));
    }
}

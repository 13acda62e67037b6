//! Statement body text decoding.
//!
//! The caption parsers only collect statement body bytes. Turning those
//! bytes into characters and layout is the job of a [`TextDecoder`]; the
//! [`EightUnitDecoder`](eight_unit::EightUnitDecoder) handles the ARIB
//! eight-unit code used by terrestrial and BS broadcasts.

use std::ops::Range;
use std::time::Duration;

use anyhow::Result;

use crate::process::drcs::{DrcsConversionTable, DrcsSlotTable};

pub mod eight_unit;
pub mod symbols;

/// Decodes statement body bytes into text and styled regions.
pub trait TextDecoder {
    fn decode(&mut self, bytes: &[u8], drcs: &DrcsContext<'_>) -> Result<DecodedText>;
}

/// DRCS lookups available while decoding one frame.
#[derive(Debug, Clone, Copy)]
pub struct DrcsContext<'a> {
    pub slots: &'a DrcsSlotTable,
    pub conversion: &'a DrcsConversionTable,
}

impl<'a> DrcsContext<'a> {
    pub fn new(slots: &'a DrcsSlotTable, conversion: &'a DrcsConversionTable) -> Self {
        Self { slots, conversion }
    }

    /// Hash of the glyph registered at `index` in this frame.
    pub fn hash(&self, index: usize) -> Option<&'a str> {
        self.slots.get(index)
    }

    /// Replacement character for the glyph registered at `index`.
    pub fn resolve(&self, index: usize) -> Option<char> {
        self.conversion
            .lookup(self.hash(index)?)
            .and_then(char::from_u32)
    }
}

/// Output of a [`TextDecoder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub regions: Vec<DecodedRegion>,
    /// Display duration requested by the statement, zero when absent.
    pub duration: Duration,
}

impl DecodedText {
    pub fn region_text(&self, region: &DecodedRegion) -> &str {
        self.text.get(region.span.clone()).unwrap_or_default()
    }
}

/// A run of text with uniform style and position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRegion {
    /// Byte range into [`DecodedText::text`].
    pub span: Range<usize>,
    /// `0xRRGGBB`.
    pub foreground_color: u32,
    pub plane_width: u32,
    pub plane_height: u32,
    pub font_width: u32,
    pub font_height: u32,
    pub horizontal_interval: u32,
    pub vertical_interval: u32,
    /// Right edge of the first character cell.
    pub left: i32,
    /// Bottom edge of the character row.
    pub bottom: i32,
    pub horizontal_adjustment: i32,
    pub vertical_adjustment: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_through_both_tables() {
        let hash = "0123456789abcdef0123456789abcdef";
        let conversion = DrcsConversionTable::parse(&format!("{hash}=U+266A"));

        let mut slots = DrcsSlotTable::default();
        slots.register("ffffffffffffffffffffffffffffffff");
        slots.register(hash);

        let drcs = DrcsContext::new(&slots, &conversion);
        assert_eq!(drcs.resolve(1), Some('♪'));
        assert_eq!(drcs.resolve(0), None);
        assert_eq!(drcs.resolve(2), None);
        assert_eq!(drcs.hash(1), Some(hash));
    }
}

//! DRCS glyph bookkeeping.
//!
//! [`DrcsConversionTable`] maps glyph content hashes to Unicode code points
//! and is loaded once per session. [`DrcsSlotTable`] records the glyphs
//! defined by the frame being parsed, in definition order, so that DRCS
//! character references in the statement body can be resolved by index.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::utils::errors::DrcsError;

/// Length of a rendered MD5 glyph hash.
pub const HASH_LEN: usize = 32;

/// Maximum number of glyphs tracked per frame.
pub const MAX_DRCS_SLOTS: usize = 10;

/// Hash to code point replacements for DRCS glyphs.
///
/// The text format is line based. Lines starting with `;` or `#` are
/// comments. A valid entry is `<32 hex chars>=U+<hex code point>`:
///
/// ```text
/// ; volume symbol
/// 1f0b0d4c7f10b2a0b0e1a4c45bfe9ddd=U+1F50A
/// ```
///
/// Malformed lines and code points above U+10FFFF are skipped silently.
#[derive(Debug, Clone, Default)]
pub struct DrcsConversionTable {
    entries: HashMap<String, u32>,
}

impl DrcsConversionTable {
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();

        for line in content.lines() {
            if line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some((hash, code)) = Self::parse_line(line) {
                entries.insert(hash, code);
            }
        }

        debug!("Loaded {} DRCS conversion entries", entries.len());

        Self { entries }
    }

    fn parse_line(line: &str) -> Option<(String, u32)> {
        let (hash, code) = line.trim_end().split_once('=')?;
        if hash.len() != HASH_LEN || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let digits = code.strip_prefix("U+")?;
        if digits.is_empty() || digits.len() > 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let code = u32::from_str_radix(digits, 16).ok()?;
        if code > 0x10FFFF {
            return None;
        }

        Some((hash.to_string(), code))
    }

    /// Loads the table from `path`, or returns the error describing why it
    /// could not be read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DrcsError> {
        let path = path.as_ref();

        fs::read_to_string(path)
            .map(|content| Self::parse(&content))
            .map_err(|source| DrcsError::ConversionTableUnreadable {
                path: path.display().to_string(),
                source,
            })
    }

    /// Loads the table from `path`, falling back to an empty table with a
    /// warning when the file is missing or unreadable.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("{e}");
            Self::default()
        })
    }

    pub fn lookup(&self, hash: &str) -> Option<u32> {
        self.entries.get(hash).copied()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A glyph registered for the current frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrcsSlot {
    pub hash: String,
    pub index: usize,
}

/// Per-frame list of glyph hashes, bounded by [`MAX_DRCS_SLOTS`].
#[derive(Debug, Clone, Default)]
pub struct DrcsSlotTable {
    slots: Vec<DrcsSlot>,
    /// Glyphs that arrived after the table was full.
    pub dropped: usize,
}

impl DrcsSlotTable {
    /// Appends `hash`, returning its index, or `None` when the table is full.
    pub fn register(&mut self, hash: &str) -> Option<usize> {
        if self.slots.len() >= MAX_DRCS_SLOTS {
            self.dropped += 1;
            return None;
        }

        let index = self.slots.len();
        self.slots.push(DrcsSlot {
            hash: hash.to_string(),
            index,
        });

        Some(index)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.slots.iter().any(|slot| slot.hash == hash)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|slot| slot.hash.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrcsSlot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn parse_conversion_table() {
        let content = format!(
            ";comment line\n{HASH_A}=U+1F50A\n0123456789abcdef=U+3042\n# another comment\n"
        );

        let table = DrcsConversionTable::parse(&content);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(HASH_A), Some(0x1F50A));
    }

    #[test]
    fn reject_malformed_entries() {
        let content = format!(
            "0123456789abcdef0123456789abcdeg=U+3042\n\
             {HASH_A}=U+12x\n\
             {HASH_A} =U+3042\n\
             fedcba9876543210fedcba9876543210=U+3042 \n"
        );

        let table = DrcsConversionTable::parse(&content);
        assert_eq!(table.len(), 1);
        assert!(!table.contains(HASH_A));
        assert_eq!(
            table.lookup("fedcba9876543210fedcba9876543210"),
            Some(0x3042)
        );
    }

    #[test]
    fn skip_invalid_code_points() {
        let content = format!(
            "{HASH_A}=U+110000\nfedcba9876543210fedcba9876543210=3042\n\
             00000000000000000000000000000000=U+\n11111111111111111111111111111111=U+25A0\r\n"
        );

        let table = DrcsConversionTable::parse(&content);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.lookup("11111111111111111111111111111111"),
            Some(0x25A0)
        );
    }

    #[test]
    fn missing_table_is_empty() {
        let table = DrcsConversionTable::load_or_empty("/nonexistent/drcs_conv.ini");
        assert!(table.is_empty());
        assert!(DrcsConversionTable::load("/nonexistent/drcs_conv.ini").is_err());
    }

    #[test]
    fn slot_table_is_bounded() {
        let mut slots = DrcsSlotTable::default();

        for i in 0..MAX_DRCS_SLOTS {
            assert_eq!(slots.register(HASH_A), Some(i));
        }
        assert_eq!(slots.register(HASH_A), None);
        assert_eq!(slots.len(), MAX_DRCS_SLOTS);
        assert_eq!(slots.dropped, 1);

        slots.clear();
        assert!(slots.is_empty());
        assert_eq!(slots.dropped, 0);
    }
}

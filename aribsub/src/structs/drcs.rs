//! DRCS (dynamically redefinable character set) definitions.
//!
//! A DRCS data unit defines custom glyphs referenced from the statement
//! body. Each character code carries one or more fonts; pattern fonts hold
//! a packed bitmap, the other modes hold geometric drawing data that is
//! kept verbatim.
//!
//! ## Pattern size
//!
//! Pixels are packed at `ceil(sqrt(depth + 2))` bits each, and a pattern
//! occupies `width * height * bits_per_pixel / 8` bytes.

use anyhow::{Result, anyhow};
use log::Level::Warn;
use log::trace;
use md5::{Digest, Md5};

use crate::log_or_err;
use crate::process::parse::ParserState;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::DrcsError;

/// Font modes carrying a pattern bitmap.
pub const MODE_PATTERN_2_TONE: u8 = 0x0;
pub const MODE_PATTERN_MULTI_TONE: u8 = 0x1;

/// DRCS character code as transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrcsCharCode {
    /// One-byte DRCS: set number (DRCS-1 to DRCS-15) and code.
    OneByte { set: u8, code: u8 },
    /// Two-byte DRCS-0 code.
    TwoByte(u16),
}

impl DrcsCharCode {
    fn new(raw: u16, one_byte: bool) -> Self {
        if one_byte {
            Self::OneByte {
                set: ((raw >> 8) as u8).wrapping_sub(0x40),
                code: raw as u8,
            }
        } else {
            Self::TwoByte(raw)
        }
    }
}

/// A decoded pattern glyph and its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrcsGlyph {
    pub depth: u8,
    pub width: u8,
    pub height: u8,
    pub pattern: Vec<u8>,
    /// Lowercase hex MD5 of `pattern`.
    pub hash: String,
}

impl DrcsGlyph {
    pub fn new(depth: u8, width: u8, height: u8, pattern: Vec<u8>) -> Self {
        let hash = pattern_hash(&pattern);

        Self {
            depth,
            width,
            height,
            pattern,
            hash,
        }
    }

    pub fn bits_per_pixel(&self) -> u32 {
        bits_per_pixel(self.depth)
    }

    /// Pixel value at `(x, y)`, unpacked MSB first.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        let bpp = self.bits_per_pixel() as usize;
        let bit = (y * self.width as usize + x) * bpp;

        let mut value = 0u8;
        for i in bit..bit + bpp {
            let Some(byte) = self.pattern.get(i >> 3) else {
                return 0;
            };
            value = (value << 1) | ((byte >> (7 - (i & 7))) & 1);
        }

        value
    }
}

/// `ceil(sqrt(depth + 2))`, computed on integers.
pub fn bits_per_pixel(depth: u8) -> u32 {
    let levels = depth as u32 + 2;
    let mut bits = 1;
    while bits * bits < levels {
        bits += 1;
    }

    bits
}

pub fn pattern_len(depth: u8, width: u8, height: u8) -> usize {
    width as usize * height as usize * bits_per_pixel(depth) as usize / 8
}

pub fn pattern_hash(pattern: &[u8]) -> String {
    Md5::digest(pattern)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Geometric font data, retained without interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometricData {
    pub region_x: u8,
    pub region_y: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrcsFontData {
    Pattern(DrcsGlyph),
    Geometric(GeometricData),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrcsFont {
    pub font_id: u8,
    pub mode: u8,
    pub data: DrcsFontData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrcsCode {
    pub character_code: DrcsCharCode,
    pub fonts: Vec<DrcsFont>,
}

/// Contents of a DRCS data unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrcsData {
    pub one_byte: bool,
    pub codes: Vec<DrcsCode>,
}

impl DrcsData {
    /// Reads glyph definitions up to bit offset `end`, registering every
    /// pattern glyph with the session.
    ///
    /// Definitions that would cross `end` stop the walk; the caller
    /// resynchronizes to the declared unit end.
    pub fn read(
        state: &mut ParserState,
        reader: &mut BsIoSliceReader,
        one_byte: bool,
        end: u64,
    ) -> Result<Self> {
        let mut drcs = DrcsData {
            one_byte,
            codes: Vec::new(),
        };

        if !Self::fits(reader, end, 1)? {
            return Ok(drcs);
        }

        let number_of_code: u8 = reader.get_n(8)?;
        trace!("DRCS: {number_of_code} codes, one_byte = {one_byte}");

        'codes: for _ in 0..number_of_code {
            if !Self::fits(reader, end, 3)? {
                break;
            }

            let raw_code: u16 = reader.get_n(16)?;
            let number_of_font: u8 = reader.get_n(8)?;

            let mut code = DrcsCode {
                character_code: DrcsCharCode::new(raw_code, one_byte),
                fonts: Vec::with_capacity(number_of_font as usize),
            };

            for _ in 0..number_of_font {
                if !Self::fits(reader, end, 1)? {
                    drcs.codes.push(code);
                    break 'codes;
                }

                let font_id: u8 = reader.get_n(4)?;
                let mode: u8 = reader.get_n(4)?;

                let data = if mode == MODE_PATTERN_2_TONE || mode == MODE_PATTERN_MULTI_TONE {
                    match Self::read_pattern(state, reader, end)? {
                        Some(glyph) => DrcsFontData::Pattern(glyph),
                        None => {
                            drcs.codes.push(code);
                            break 'codes;
                        }
                    }
                } else {
                    match Self::read_geometric(reader, end)? {
                        Some(geometric) => DrcsFontData::Geometric(geometric),
                        None => {
                            drcs.codes.push(code);
                            break 'codes;
                        }
                    }
                };

                code.fonts.push(DrcsFont {
                    font_id,
                    mode,
                    data,
                });
            }

            drcs.codes.push(code);
        }

        Ok(drcs)
    }

    fn fits(reader: &mut BsIoSliceReader, end: u64, bytes: u64) -> Result<bool> {
        Ok(reader.position()? + (bytes << 3) <= end)
    }

    fn read_pattern(
        state: &mut ParserState,
        reader: &mut BsIoSliceReader,
        end: u64,
    ) -> Result<Option<DrcsGlyph>> {
        if !Self::fits(reader, end, 3)? {
            return Ok(None);
        }

        let depth: u8 = reader.get_n(8)?;
        let width: u8 = reader.get_n(8)?;
        let height: u8 = reader.get_n(8)?;

        let len = pattern_len(depth, width, height);
        if !Self::fits(reader, end, len as u64)? {
            log_or_err!(
                state,
                Warn,
                anyhow!(DrcsError::PatternTruncated {
                    width,
                    height,
                    depth
                })
            );
            return Ok(None);
        }

        let glyph = DrcsGlyph::new(depth, width, height, reader.read_bytes(len)?);
        trace!(
            "DRCS pattern {}x{} depth {} ({} bytes): {}",
            width, height, depth, len, glyph.hash
        );

        state.register_glyph(&glyph)?;

        Ok(Some(glyph))
    }

    fn read_geometric(reader: &mut BsIoSliceReader, end: u64) -> Result<Option<GeometricData>> {
        if !Self::fits(reader, end, 4)? {
            return Ok(None);
        }

        let region_x: u8 = reader.get_n(8)?;
        let region_y: u8 = reader.get_n(8)?;
        let length: u16 = reader.get_n(16)?;

        if !Self::fits(reader, end, length as u64)? {
            return Ok(None);
        }

        Ok(Some(GeometricData {
            region_x,
            region_y,
            data: reader.read_bytes(length as usize)?,
        }))
    }

    /// Pattern glyphs in definition order.
    pub fn glyphs(&self) -> impl Iterator<Item = &DrcsGlyph> {
        self.codes
            .iter()
            .flat_map(|code| code.fonts.iter())
            .filter_map(|font| match &font.data {
                DrcsFontData::Pattern(glyph) => Some(glyph),
                DrcsFontData::Geometric(_) => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_per_pixel_from_depth() {
        assert_eq!(bits_per_pixel(0), 2);
        assert_eq!(bits_per_pixel(2), 2);
        assert_eq!(bits_per_pixel(3), 3);
        assert_eq!(bits_per_pixel(14), 4);
        assert_eq!(pattern_len(0, 2, 2), 1);
        assert_eq!(pattern_len(0, 16, 16), 64);
    }

    #[test]
    fn md5_hash_is_lowercase_hex() {
        assert_eq!(pattern_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(pattern_hash(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn unpack_pixels() {
        let glyph = DrcsGlyph::new(0, 2, 2, vec![0b01_00_11_10]);
        assert_eq!(glyph.pixel(0, 0), 1);
        assert_eq!(glyph.pixel(1, 0), 0);
        assert_eq!(glyph.pixel(0, 1), 3);
        assert_eq!(glyph.pixel(1, 1), 2);
    }

    #[test]
    fn read_pattern_and_geometric_fonts() -> Result<()> {
        let data = [
            0x02, // number_of_code
            0x41, 0x21, 0x01, // DRCS-1 0x21, one font
            0x00, 0x00, 0x02, 0x02, 0xA5, // pattern 2x2, depth 0
            0x42, 0x22, 0x01, // DRCS-2 0x22, one font
            0x12, 0x10, 0x20, 0x00, 0x02, 0xDE, 0xAD, // geometric
        ];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let drcs = DrcsData::read(&mut state, &mut reader, true, data.len() as u64 * 8)?;
        assert_eq!(reader.available()?, 0);
        assert_eq!(drcs.codes.len(), 2);
        assert_eq!(
            drcs.codes[0].character_code,
            DrcsCharCode::OneByte { set: 1, code: 0x21 }
        );

        let glyphs = drcs.glyphs().collect::<Vec<_>>();
        assert_eq!(glyphs.len(), 1);
        assert_eq!(glyphs[0].pattern, vec![0xA5]);
        assert_eq!(glyphs[0].hash, pattern_hash(&[0xA5]));

        let DrcsFontData::Geometric(geometric) = &drcs.codes[1].fonts[0].data else {
            panic!("expected geometric data");
        };
        assert_eq!(drcs.codes[1].fonts[0].font_id, 1);
        assert_eq!(geometric.region_x, 0x10);
        assert_eq!(geometric.data, vec![0xDE, 0xAD]);
        Ok(())
    }

    #[test]
    fn stop_at_unit_end() -> Result<()> {
        // pattern needs 64 bytes but the unit ends after 2
        let data = [0x01, 0x41, 0x21, 0x01, 0x00, 0x00, 0x10, 0x10, 0x00, 0x00];
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);

        let drcs = DrcsData::read(&mut state, &mut reader, true, data.len() as u64 * 8)?;
        assert_eq!(drcs.glyphs().count(), 0);
        assert_eq!(reader.position()?, 8 * 8);
        Ok(())
    }
}

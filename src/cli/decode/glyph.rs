use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use aribsub::structs::drcs::DrcsGlyph;

/// White background, black foreground.
const PALETTE: [u8; 6] = [0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00];

/// Writes `<dir>/<hash>.png` unless a file for that hash already exists.
///
/// Returns the path of the new file, or `None` when it was already there.
/// Nothing is written when the glyph cannot be encoded.
pub fn export_glyph(dir: &Path, glyph: &DrcsGlyph) -> Result<Option<PathBuf>> {
    let path = dir.join(format!("{}.png", glyph.hash));
    if path.exists() {
        return Ok(None);
    }

    let mut encoded = Vec::new();
    encode_png(&mut encoded, glyph)?;

    let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    file.write_all(&encoded)?;

    Ok(Some(path))
}

/// Encodes a glyph as a 1-bit indexed PNG with a transparent background.
/// Every non-zero pixel level becomes foreground.
pub fn encode_png<W: Write>(writer: W, glyph: &DrcsGlyph) -> Result<()> {
    let width = glyph.width as usize;
    let height = glyph.height as usize;

    let mut encoder = png::Encoder::new(writer, width as u32, height as u32);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::One);
    encoder.set_palette(PALETTE.to_vec());
    encoder.set_trns(vec![0u8]);

    let stride = width.div_ceil(8);
    let mut data = vec![0u8; stride * height];
    for y in 0..height {
        for x in 0..width {
            if glyph.pixel(x, y) != 0 {
                data[y * stride + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&data)?;
    png_writer.finish()?;

    Ok(())
}

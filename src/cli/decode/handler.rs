use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use indicatif::ProgressBar;
use log::Level;

use aribsub::log_or_err;
use aribsub::structs::drcs::DrcsGlyph;

use super::decoder_thread::DecodedFrame;
use super::glyph::export_glyph;
use super::output::EventWriter;
use crate::timestamp::time_str;

pub struct WriterState {
    pub fail_level: Level,
}

/// Output side of `decode`: writes events and exports unknown glyphs.
pub struct DecodeHandler<W: Write> {
    writer: EventWriter<W>,
    export_dir: Option<PathBuf>,
    state: WriterState,
    reported_glyphs: HashSet<String>,
    pub events_written: u64,
    pub glyphs_exported: u64,
    pub last_pts: Option<u64>,
}

impl<W: Write> DecodeHandler<W> {
    pub fn new(writer: EventWriter<W>, export_dir: Option<PathBuf>, state: WriterState) -> Result<Self> {
        if let Some(dir) = &export_dir {
            std::fs::create_dir_all(dir)?;
            log::info!("Exporting unknown DRCS glyphs to {}", dir.display());
        }

        Ok(Self {
            writer,
            export_dir,
            state,
            reported_glyphs: HashSet::new(),
            events_written: 0,
            glyphs_exported: 0,
            last_pts: None,
        })
    }

    pub fn handle_decoded_frame(&mut self, frame: DecodedFrame, pb: &Option<ProgressBar>) -> Result<()> {
        for glyph in &frame.glyphs {
            self.handle_glyph(glyph)?;
        }

        if frame.pts.is_some() {
            self.last_pts = frame.pts;
        }

        if let Some(event) = frame.event {
            log::debug!(
                "Frame {}: {} region(s) at {}",
                frame.index,
                event.regions.len(),
                time_str(event.start)
            );
            self.writer.write_event(&event)?;
            self.events_written += 1;
        }

        if let Some(pb) = pb {
            pb.set_message(format!(
                "events: {} | timestamp: {}",
                self.events_written,
                time_str(self.last_pts.unwrap_or(0))
            ));
        }

        Ok(())
    }

    fn handle_glyph(&mut self, glyph: &DrcsGlyph) -> Result<()> {
        if !self.reported_glyphs.insert(glyph.hash.clone()) {
            return Ok(());
        }

        let Some(dir) = &self.export_dir else {
            log::info!(
                "Unknown DRCS glyph {} ({}x{})",
                glyph.hash,
                glyph.width,
                glyph.height
            );
            return Ok(());
        };

        match export_glyph(dir, glyph) {
            Ok(Some(path)) => {
                log::info!("Exported DRCS glyph {}", path.display());
                self.glyphs_exported += 1;
            }
            Ok(None) => log::debug!("DRCS glyph {} already exported", glyph.hash),
            Err(e) => log_or_err!(
                self.state,
                Level::Warn,
                anyhow!("Failed to export DRCS glyph {}: {e}", glyph.hash)
            ),
        }

        Ok(())
    }

    pub fn finalize(self) -> Result<W> {
        log::info!(
            "{} events written, {} unknown DRCS glyphs ({} exported)",
            self.events_written,
            self.reported_glyphs.len(),
            self.glyphs_exported
        );
        self.writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::command::OutputFormat;
    use aribsub::process::EXAMPLE_DATA;
    use aribsub::process::decode::Decoder;
    use aribsub::process::extract::Frame;

    #[test]
    fn handle_example_frame() -> Result<()> {
        let mut decoder = Decoder::default();
        let event = decoder.decode(&Frame::new(Some(90_000), EXAMPLE_DATA))?;
        let frame = DecodedFrame {
            index: 1,
            pts: Some(90_000),
            event,
            glyphs: decoder.take_stored_glyphs(),
        };

        let writer = EventWriter::new(Vec::new(), OutputFormat::Srt);
        let mut handler = DecodeHandler::new(
            writer,
            None,
            WriterState {
                fail_level: Level::Error,
            },
        )?;
        handler.handle_decoded_frame(frame, &None)?;
        assert_eq!(handler.events_written, 1);
        assert_eq!(handler.reported_glyphs.len(), 1);

        let out = String::from_utf8(handler.finalize()?)?;
        assert_eq!(out, "1\n00:00:01,000 --> 00:00:04,000\n字幕です〓\n\n");
        Ok(())
    }
}

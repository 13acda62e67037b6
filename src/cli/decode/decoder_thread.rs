use anyhow::Result;
use indicatif::ProgressBar;
use std::sync::mpsc;
use std::thread;

use aribsub::process::decode::Decoder;
use aribsub::structs::drcs::DrcsGlyph;
use aribsub::structs::region::SubtitleEvent;

use super::processor::{ProcessFramesContext, process_frame};
use crate::cli::command::SourceArgs;
use crate::cli::source::{FrameSource, drain_frames};

/// What the decoder thread reports for one frame.
pub struct DecodedFrame {
    /// 1-based frame number.
    pub index: u64,
    pub pts: Option<u64>,
    pub event: Option<SubtitleEvent>,
    /// Glyphs new to this frame and missing from the conversion table.
    pub glyphs: Vec<DrcsGlyph>,
}

pub struct DecoderThreadConfig {
    pub source: SourceArgs,
    pub strict_mode: bool,
    pub tx: mpsc::Sender<Result<DecodedFrame>>,
    pub pb_clone: Option<ProgressBar>,
    pub decoder: Decoder,
}

pub fn spawn_decoder_thread(config: DecoderThreadConfig) -> thread::JoinHandle<Result<()>> {
    thread::spawn(move || -> Result<()> {
        let DecoderThreadConfig {
            source,
            strict_mode,
            tx,
            pb_clone,
            mut decoder,
        } = config;

        let mut frame_count: u64 = 0;
        let mut event_count: u64 = 0;

        let (mut input_reader, mut frames) = FrameSource::open(&source)?;

        let mut run = |frames: &mut FrameSource| -> Result<bool> {
            let mut ctx = ProcessFramesContext {
                decoder: &mut decoder,
                frame_count: &mut frame_count,
                event_count: &mut event_count,
                strict_mode,
                tx: &tx,
                pb_clone: &pb_clone,
            };

            drain_frames(frames, |frame| process_frame(&mut ctx, frame))
        };

        let mut stopped = false;
        input_reader.process_chunks(64 * 1024, |chunk| {
            frames.push_bytes(chunk);
            let keep_going = run(&mut frames)?;
            stopped = !keep_going;
            Ok(keep_going)
        })?;

        if !stopped {
            frames.finish();
            run(&mut frames)?;
        }

        log::info!("Processing complete: {frame_count} frames, {event_count} events");
        Ok(())
    })
}

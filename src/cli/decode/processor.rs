use anyhow::Result;
use indicatif::ProgressBar;
use std::sync::mpsc;

use aribsub::process::decode::Decoder;
use aribsub::process::extract::Frame;

use super::decoder_thread::DecodedFrame;

pub struct ProcessFramesContext<'a> {
    pub decoder: &'a mut Decoder,
    pub frame_count: &'a mut u64,
    pub event_count: &'a mut u64,
    pub strict_mode: bool,
    pub tx: &'a mpsc::Sender<Result<DecodedFrame>>,
    pub pb_clone: &'a Option<ProgressBar>,
}

/// Decodes one frame and sends the result to the output side. Returns
/// `Ok(false)` when processing has to stop.
pub fn process_frame(ctx: &mut ProcessFramesContext, frame: Frame) -> Result<bool> {
    *ctx.frame_count += 1;
    if let Some(pb) = ctx.pb_clone {
        pb.set_position(*ctx.frame_count);
    }

    match ctx.decoder.decode(&frame) {
        Ok(event) => {
            if event.is_some() {
                *ctx.event_count += 1;
            }

            let decoded = DecodedFrame {
                index: *ctx.frame_count,
                pts: frame.pts,
                event,
                glyphs: ctx.decoder.take_stored_glyphs(),
            };
            if ctx.tx.send(Ok(decoded)).is_err() {
                return Ok(false);
            }
        }
        Err(e) => {
            log::error!("Decode error at frame {}: {e}", *ctx.frame_count);
            if ctx.strict_mode {
                let _ = ctx.tx.send(Err(e));
                return Ok(false);
            }
            if let Some(pb) = ctx.pb_clone {
                pb.set_message("processing (some decode errors)");
            }
        }
    }

    Ok(true)
}

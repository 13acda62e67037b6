use anyhow::{Result, bail};

use aribsub::process::demux::{TS_PACKET_SIZE, TS_SYNC_BYTE, TsDemuxer};
use aribsub::process::extract::{Extractor, Frame};
use aribsub::utils::errors::ExtractError;

use super::command::{InputFormat, SourceArgs};
use crate::input::InputReader;

/// PES frames from either container.
pub enum FrameSource {
    Pes(Extractor),
    Ts(TsDemuxer),
}

impl FrameSource {
    /// Opens the input and picks the container, sniffing the first two
    /// packets in `auto` mode.
    pub fn open(args: &SourceArgs) -> Result<(InputReader, Self)> {
        let mut input = InputReader::new(&args.input)?;

        let is_ts = match args.input_format {
            InputFormat::Pes => false,
            InputFormat::Ts => true,
            InputFormat::Auto => looks_like_ts(input.peek(TS_PACKET_SIZE + 1)?),
        };

        let source = if is_ts {
            let Some(pid) = args.pid else {
                bail!("MPEG-TS input requires --pid");
            };
            log::info!("Reading MPEG-TS, caption PID {pid:#06X}");
            FrameSource::Ts(TsDemuxer::new(pid))
        } else {
            if args.pid.is_some() {
                log::warn!("--pid is ignored for PES input");
            }
            log::info!("Reading PES");
            FrameSource::Pes(Extractor::default())
        };

        Ok((input, source))
    }

    pub fn push_bytes(&mut self, data: &[u8]) {
        match self {
            FrameSource::Pes(extractor) => extractor.push_bytes(data),
            FrameSource::Ts(demuxer) => demuxer.push_bytes(data),
        }
    }

    /// Flushes buffered data at the end of input.
    pub fn finish(&mut self) {
        match self {
            FrameSource::Pes(extractor) => extractor.finish(),
            FrameSource::Ts(demuxer) => demuxer.finish(),
        }
    }
}

impl Iterator for FrameSource {
    type Item = Result<Frame, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FrameSource::Pes(extractor) => extractor.next(),
            FrameSource::Ts(demuxer) => demuxer.next(),
        }
    }
}

pub fn looks_like_ts(prefix: &[u8]) -> bool {
    prefix.len() > TS_PACKET_SIZE
        && prefix[0] == TS_SYNC_BYTE
        && prefix[TS_PACKET_SIZE] == TS_SYNC_BYTE
}

/// Drains every complete frame from `source`, stopping at the first
/// "need more data" result.
pub fn drain_frames(
    source: &mut FrameSource,
    mut on_frame: impl FnMut(Frame) -> Result<bool>,
) -> Result<bool> {
    loop {
        match source.next() {
            Some(Ok(frame)) => {
                if !on_frame(frame)? {
                    return Ok(false);
                }
            }
            Some(Err(ExtractError::InsufficientData)) | None => return Ok(true),
            Some(Err(e)) => log::warn!("Extraction error: {e}"),
        }
    }
}

#[test]
fn detect_transport_stream() {
    let mut ts = vec![0u8; TS_PACKET_SIZE * 2];
    ts[0] = TS_SYNC_BYTE;
    ts[TS_PACKET_SIZE] = TS_SYNC_BYTE;
    assert!(looks_like_ts(&ts));
    assert!(!looks_like_ts(&ts[..TS_PACKET_SIZE]));
    assert!(!looks_like_ts(aribsub::process::EXAMPLE_DATA));
}

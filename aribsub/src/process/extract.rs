use crate::utils::buffer_pool::BufferPool;
use crate::utils::errors::ExtractError;
use log::debug;
use std::collections::VecDeque;
use std::sync::Arc;

/// PES stream id of private_stream_1.
pub const PRIVATE_STREAM_1: u8 = 0xBD;
/// PES stream id of private_stream_2.
pub const PRIVATE_STREAM_2: u8 = 0xBF;

const START_CODE_PREFIX: [u8; 3] = [0x00, 0x00, 0x01];

/// Extracts caption frames from a PES byte stream.
///
/// PES packets are located by their `00 00 01` start code prefix. Packets
/// on `private_stream_1` and `private_stream_2` become [`Frame`]s holding
/// the PES payload and, when present, the 33-bit PTS. Other streams are
/// skipped.
///
/// # Example
///
/// ```rust,no_run
/// use aribsub::process::extract::Extractor;
///
/// let mut extractor = Extractor::default();
///
/// let data = std::fs::read("captions.pes")?;
/// extractor.push_bytes(&data);
///
/// for frame in &mut extractor {
///     let Ok(frame) = frame else { break };
///     println!("{:?}: {} bytes", frame.pts, frame.as_ref().len());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Extractor {
    buffer: VecDeque<u8>,
    locked: bool,
    finished: bool,
    io_counter: usize,
    buffer_pool: BufferPool,
    error_count: usize,
    frames_processed: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            buffer: VecDeque::with_capacity(64 * 1024),
            locked: false,
            finished: false,
            io_counter: 0,
            buffer_pool: BufferPool::default(),
            error_count: 0,
            frames_processed: 0,
        }
    }
}

impl Extractor {
    /// Adds raw PES data to the internal buffer.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend(data);
        self.io_counter += 1;
    }

    /// Marks the end of input. A trailing packet with an unbounded length
    /// then ends at the end of the buffer.
    pub fn finish(&mut self) {
        self.finished = true;
        self.io_counter += 1;
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Drops bytes until the buffer starts with a start code prefix.
    fn resync(&mut self) -> Result<(), ExtractError> {
        self.locked = false;

        match self.find_start_code(0) {
            Some(offset) => {
                if offset > 0 {
                    debug!("Skipped {offset} bytes before PES start code");
                    self.consume_front(offset);
                }
                self.locked = true;
                Ok(())
            }
            None => {
                // keep a possible partial prefix at the end
                let keep = self.buffer.len().min(START_CODE_PREFIX.len() - 1);
                self.consume_front(self.buffer.len() - keep);
                self.insufficient()
            }
        }
    }

    fn find_start_code(&self, from: usize) -> Option<usize> {
        let len = self.buffer.len();
        (from..len.saturating_sub(2)).find(|&i| {
            self.buffer[i] == START_CODE_PREFIX[0]
                && self.buffer[i + 1] == START_CODE_PREFIX[1]
                && self.buffer[i + 2] == START_CODE_PREFIX[2]
        })
    }

    fn at_start_code(&self) -> bool {
        self.buffer.len() >= 3 && self.buffer.range(..3).eq(START_CODE_PREFIX.iter())
    }

    fn consume_front(&mut self, cnt: usize) {
        self.buffer.drain(..cnt);
    }

    fn insufficient(&mut self) -> Result<(), ExtractError> {
        self.io_counter = self.io_counter.saturating_sub(1);
        Err(ExtractError::InsufficientData)
    }

    fn iter_insufficient(&mut self) -> Option<Result<Frame, ExtractError>> {
        self.io_counter = self.io_counter.saturating_sub(1);
        Some(Err(ExtractError::InsufficientData))
    }

    /// Total packet length, or `None` when more data is needed. Packets
    /// with an unbounded length end at the next start code, or at the end
    /// of input after [`finish`](Extractor::finish).
    fn packet_len(&self) -> Option<usize> {
        let packet_length = u16::from_be_bytes([*self.buffer.get(4)?, *self.buffer.get(5)?]);

        if packet_length == 0 {
            self.find_start_code(6)
                .or_else(|| self.finished.then_some(self.buffer.len()))
        } else {
            Some(6 + packet_length as usize)
        }
    }
}

impl Iterator for Extractor {
    type Item = Result<Frame, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.io_counter == 0 {
            return None;
        }

        loop {
            if (!self.locked || !self.at_start_code()) && self.resync().is_err() {
                return self.iter_insufficient();
            }

            if self.buffer.len() < 6 {
                return self.iter_insufficient();
            }

            let Some(packet_len) = self.packet_len() else {
                return self.iter_insufficient();
            };

            if self.buffer.len() < packet_len {
                return self.iter_insufficient();
            }

            let stream_id = self.buffer[3];
            let mut packet = self.buffer_pool.acquire();
            packet.extend(self.buffer.drain(..packet_len));

            let frame = match stream_id {
                PRIVATE_STREAM_1 => Frame::from_pes_packet(&packet),
                PRIVATE_STREAM_2 => Ok(Frame {
                    pts: None,
                    data: packet[6..].into(),
                }),
                _ => Err(ExtractError::UnsupportedStreamId(stream_id)),
            };

            self.buffer_pool.release(packet);

            match frame {
                Ok(frame) => {
                    self.frames_processed += 1;
                    return Some(Ok(frame));
                }
                Err(ExtractError::UnsupportedStreamId(id)) => {
                    debug!("Skipping PES packet on stream {id:#04X}");
                }
                Err(error) => {
                    self.error_count += 1;
                    return Some(Err(error));
                }
            }
        }
    }
}

/// The payload of one caption PES packet.
///
/// Frame data can be accessed through the [`AsRef<[u8]>`] implementation
/// and starts at the PES data packet's data identifier.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Presentation timestamp in 90 kHz ticks.
    pub pts: Option<u64>,
    pub data: Arc<[u8]>,
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Frame {
    pub fn new(pts: Option<u64>, data: &[u8]) -> Self {
        Self {
            pts,
            data: data.into(),
        }
    }

    /// Builds a frame from a complete PES packet with an optional header.
    pub fn from_pes_packet(packet: &[u8]) -> Result<Self, ExtractError> {
        if packet.len() < 9 {
            return Err(ExtractError::InvalidHeaderLength {
                header: 0,
                packet: packet.len(),
            });
        }

        let pts_dts_flags = packet[7] >> 6;
        let header_len = packet[8] as usize;
        let payload_start = 9 + header_len;

        if payload_start > packet.len() {
            return Err(ExtractError::InvalidHeaderLength {
                header: header_len,
                packet: packet.len(),
            });
        }

        let pts = if pts_dts_flags & 0b10 != 0 && header_len >= 5 {
            Some(decode_pts(&packet[9..14]))
        } else {
            None
        };

        Ok(Self {
            pts,
            data: packet[payload_start..].into(),
        })
    }
}

/// Decodes the 5-byte PTS field layout `xxxx PPP1 PPPPPPPP PPPPPPP1
/// PPPPPPPP PPPPPPP1`.
pub fn decode_pts(bytes: &[u8]) -> u64 {
    (((bytes[0] >> 1) & 0x07) as u64) << 30
        | (bytes[1] as u64) << 22
        | ((bytes[2] >> 1) as u64) << 15
        | (bytes[3] as u64) << 7
        | (bytes[4] >> 1) as u64
}

#[cfg(test)]
pub(crate) fn pes_packet(pts: Option<u64>, payload: &[u8]) -> Vec<u8> {
    let mut header = Vec::new();
    if let Some(pts) = pts {
        header.extend_from_slice(&[
            0x21 | ((pts >> 29) & 0x0E) as u8,
            (pts >> 22) as u8,
            0x01 | ((pts >> 14) & 0xFE) as u8,
            (pts >> 7) as u8,
            0x01 | ((pts << 1) & 0xFE) as u8,
        ]);
    }

    let length = (3 + header.len() + payload.len()) as u16;
    let mut packet = vec![0x00, 0x00, 0x01, PRIVATE_STREAM_1];
    packet.extend_from_slice(&length.to_be_bytes());
    packet.extend_from_slice(&[
        0x81,
        if pts.is_some() { 0x80 } else { 0x00 },
        header.len() as u8,
    ]);
    packet.extend_from_slice(&header);
    packet.extend_from_slice(payload);
    packet
}

#[test]
fn recover_pts() -> anyhow::Result<()> {
    use crate::process::EXAMPLE_DATA;

    let pts = 0x1_2345_6789;
    let mut extractor = Extractor::default();
    extractor.push_bytes(&pes_packet(Some(pts), EXAMPLE_DATA));

    let frame = extractor.next().unwrap()?;
    assert_eq!(frame.pts, Some(pts));
    assert_eq!(frame.as_ref(), EXAMPLE_DATA);
    assert!(matches!(
        extractor.next(),
        Some(Err(ExtractError::InsufficientData))
    ));
    assert!(extractor.next().is_none());
    Ok(())
}

#[test]
fn split_input_and_garbage() -> anyhow::Result<()> {
    use crate::process::EXAMPLE_DATA;

    let mut data = vec![0xFF, 0x47, 0x00];
    // video packet in between is skipped
    data.extend_from_slice(&[0x00, 0x00, 0x01, 0xE0, 0x00, 0x03, 0x80, 0x00, 0x00]);
    data.extend_from_slice(&pes_packet(Some(90_000), EXAMPLE_DATA));
    data.extend_from_slice(&pes_packet(None, &EXAMPLE_DATA[..10]));

    let mut extractor = Extractor::default();
    extractor.push_bytes(&data[..20]);
    assert!(matches!(
        extractor.next(),
        Some(Err(ExtractError::InsufficientData))
    ));

    extractor.push_bytes(&data[20..]);
    let frames = (&mut extractor).filter_map(Result::ok).collect::<Vec<_>>();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].pts, Some(90_000));
    assert_eq!(frames[1].pts, None);
    assert_eq!(frames[1].as_ref(), &EXAMPLE_DATA[..10]);
    assert_eq!(extractor.frames_processed(), 2);
    Ok(())
}

#[test]
fn private_stream_2_has_no_header() -> anyhow::Result<()> {
    let mut extractor = Extractor::default();
    extractor.push_bytes(&[0x00, 0x00, 0x01, 0xBF, 0x00, 0x02, 0x80, 0xFF]);

    let frame = extractor.next().unwrap()?;
    assert_eq!(frame.pts, None);
    assert_eq!(frame.as_ref(), &[0x80, 0xFF]);
    Ok(())
}

#[test]
fn finish_flushes_unbounded_packet() -> anyhow::Result<()> {
    use crate::process::EXAMPLE_DATA;

    let mut packet = pes_packet(Some(90_000), EXAMPLE_DATA);
    packet[4] = 0;
    packet[5] = 0;

    let mut extractor = Extractor::default();
    extractor.push_bytes(&packet);
    assert!(matches!(
        extractor.next(),
        Some(Err(ExtractError::InsufficientData))
    ));

    extractor.finish();
    let frame = extractor.next().unwrap()?;
    assert_eq!(frame.pts, Some(90_000));
    assert_eq!(frame.as_ref(), EXAMPLE_DATA);
    assert!(matches!(
        extractor.next(),
        Some(Err(ExtractError::InsufficientData))
    ));
    Ok(())
}

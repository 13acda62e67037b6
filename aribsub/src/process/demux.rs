use crate::process::extract::{Extractor, Frame};
use crate::utils::errors::ExtractError;
use log::{debug, warn};

pub const TS_PACKET_SIZE: usize = 188;
pub const TS_SYNC_BYTE: u8 = 0x47;

/// Reassembles the PES packets of one MPEG-TS PID.
///
/// Transport packets are matched on their PID; payloads are concatenated
/// from one `payload_unit_start_indicator` to the next and handed to an
/// [`Extractor`], whose frames this demuxer yields. A continuity counter
/// jump discards the PES packet being assembled.
///
/// ```rust,no_run
/// use aribsub::process::demux::TsDemuxer;
///
/// let mut demuxer = TsDemuxer::new(0x0130);
/// demuxer.push_bytes(&std::fs::read("recording.ts")?);
/// demuxer.finish();
///
/// for frame in demuxer.filter_map(Result::ok) {
///     println!("{:?}", frame.pts);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct TsDemuxer {
    pid: u16,
    pending: Vec<u8>,
    pes: Vec<u8>,
    assembling: bool,
    continuity: Option<u8>,
    packet_index: usize,
    extractor: Extractor,
}

impl TsDemuxer {
    pub fn new(pid: u16) -> Self {
        Self {
            pid,
            pending: Vec::with_capacity(TS_PACKET_SIZE * 2),
            pes: Vec::new(),
            assembling: false,
            continuity: None,
            packet_index: 0,
            extractor: Extractor::default(),
        }
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    /// Adds transport stream bytes; complete packets are demultiplexed
    /// immediately and the rest is kept for the next call.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);

        let mut offset = 0;
        while self.pending.len() - offset >= TS_PACKET_SIZE {
            if self.pending[offset] != TS_SYNC_BYTE {
                warn!("{}", ExtractError::TsSyncLost(self.packet_index));
                match self.pending[offset + 1..]
                    .iter()
                    .position(|&byte| byte == TS_SYNC_BYTE)
                {
                    Some(skip) => {
                        offset += skip + 1;
                        continue;
                    }
                    None => {
                        offset = self.pending.len();
                        break;
                    }
                }
            }

            let packet: [u8; TS_PACKET_SIZE] = {
                let mut packet = [0; TS_PACKET_SIZE];
                packet.copy_from_slice(&self.pending[offset..offset + TS_PACKET_SIZE]);
                packet
            };
            self.demux_packet(&packet);

            offset += TS_PACKET_SIZE;
            self.packet_index += 1;
        }

        self.pending.drain(..offset);
    }

    /// Flushes the PES packet being assembled, for the end of input.
    pub fn finish(&mut self) {
        self.flush();
        self.extractor.finish();
    }

    fn demux_packet(&mut self, packet: &[u8; TS_PACKET_SIZE]) {
        let transport_error = packet[1] & 0x80 != 0;
        let payload_unit_start = packet[1] & 0x40 != 0;
        let pid = u16::from_be_bytes([packet[1] & 0x1F, packet[2]]);
        let adaptation_field_control = (packet[3] >> 4) & 0x3;
        let continuity_counter = packet[3] & 0xF;

        if pid != self.pid {
            return;
        }

        if transport_error {
            debug!("Transport error indicator set on packet {}", self.packet_index);
            self.discard();
            return;
        }

        let has_payload = adaptation_field_control & 0b01 != 0;
        if !has_payload {
            return;
        }

        if let Some(previous) = self.continuity {
            let expected = (previous + 1) & 0xF;
            if continuity_counter == previous {
                debug!("Duplicate TS packet {}", self.packet_index);
                return;
            }
            if continuity_counter != expected {
                warn!(
                    "{}",
                    ExtractError::ContinuityError {
                        pid,
                        expected,
                        found: continuity_counter,
                    }
                );
                self.discard();
            }
        }
        self.continuity = Some(continuity_counter);

        let mut start = 4;
        if adaptation_field_control & 0b10 != 0 {
            start += 1 + packet[4] as usize;
        }
        if start >= TS_PACKET_SIZE {
            return;
        }

        if payload_unit_start {
            self.flush();
            self.assembling = true;
        }

        if self.assembling {
            self.pes.extend_from_slice(&packet[start..]);

            if self.pes_complete() {
                self.flush();
            }
        }
    }

    fn pes_complete(&self) -> bool {
        if self.pes.len() < 6 {
            return false;
        }

        let length = u16::from_be_bytes([self.pes[4], self.pes[5]]) as usize;
        length != 0 && self.pes.len() >= 6 + length
    }

    fn flush(&mut self) {
        if !self.pes.is_empty() {
            // stuffing after a bounded packet is dropped by the extractor
            self.extractor.push_bytes(&self.pes);
            self.pes.clear();
        }
        self.assembling = false;
    }

    fn discard(&mut self) {
        self.pes.clear();
        self.assembling = false;
    }
}

impl Iterator for TsDemuxer {
    type Item = Result<Frame, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.extractor.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::EXAMPLE_DATA;
    use crate::process::extract::pes_packet;

    fn ts_packets(pid: u16, counter: &mut u8, pes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut first = true;

        for chunk in pes.chunks(TS_PACKET_SIZE - 4) {
            let mut packet = vec![
                TS_SYNC_BYTE,
                (if first { 0x40 } else { 0x00 }) | (pid >> 8) as u8,
                pid as u8,
            ];

            if chunk.len() < TS_PACKET_SIZE - 4 {
                // pad with an adaptation field
                let stuffing = TS_PACKET_SIZE - 4 - chunk.len();
                packet.push(0x30 | *counter);
                packet.push((stuffing - 1) as u8);
                if stuffing > 1 {
                    packet.push(0x00);
                    packet.resize(4 + stuffing, 0xFF);
                }
            } else {
                packet.push(0x10 | *counter);
            }
            packet.extend_from_slice(chunk);

            *counter = (*counter + 1) & 0xF;
            first = false;
            out.extend_from_slice(&packet);
        }

        out
    }

    #[test]
    fn reassemble_pes_across_packets() -> anyhow::Result<()> {
        let mut payload = EXAMPLE_DATA.to_vec();
        payload.extend(std::iter::repeat_n(0xAB, 300));
        let pes = pes_packet(Some(123_456), &payload);

        let mut counter = 0;
        let mut stream = ts_packets(0x0130, &mut counter, &pes);
        let mut other = 0;
        stream.extend(ts_packets(0x0100, &mut other, &pes));
        stream.extend(ts_packets(0x0130, &mut counter, &pes_packet(None, EXAMPLE_DATA)));
        assert_eq!(stream.len() % TS_PACKET_SIZE, 0);

        let mut demuxer = TsDemuxer::new(0x0130);
        demuxer.push_bytes(&stream[..100]);
        demuxer.push_bytes(&stream[100..]);
        demuxer.finish();

        let frames = demuxer.filter_map(Result::ok).collect::<Vec<_>>();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].pts, Some(123_456));
        assert_eq!(frames[0].as_ref(), &payload[..]);
        assert_eq!(frames[1].as_ref(), EXAMPLE_DATA);
        Ok(())
    }

    #[test]
    fn continuity_jump_drops_packet() -> anyhow::Result<()> {
        let mut payload = EXAMPLE_DATA.to_vec();
        payload.extend(std::iter::repeat_n(0xAB, 300));

        let mut counter = 0;
        let mut stream = ts_packets(0x0130, &mut counter, &pes_packet(None, &payload));
        // lose the second packet
        stream.drain(TS_PACKET_SIZE..TS_PACKET_SIZE * 2);
        stream.extend(ts_packets(0x0130, &mut counter, &pes_packet(Some(9), EXAMPLE_DATA)));

        let mut demuxer = TsDemuxer::new(0x0130);
        demuxer.push_bytes(&stream);
        demuxer.finish();

        let frames = demuxer.filter_map(Result::ok).collect::<Vec<_>>();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pts, Some(9));
        Ok(())
    }
}

/// PES extraction from raw PES byte streams.
///
/// Provides the [`Extractor`](extract::Extractor) for locating PES packets
/// and producing [`Frame`](extract::Frame) objects with their PTS.
pub mod extract;

/// MPEG-TS demultiplexing of a single caption PID.
pub mod demux;

/// Frame parsing into structured caption packets.
///
/// Provides the [`Parser`](parse::Parser) for converting raw frames into
/// [`CaptionFrame`](parse::CaptionFrame) objects, and the session state
/// that carries DRCS registrations.
pub mod parse;

/// DRCS conversion and slot tables.
pub mod drcs;

/// Text assembly from statement bytes into timed regions.
pub mod assemble;

/// Frame decoding to subtitle events.
///
/// Provides the [`Decoder`](decode::Decoder) driving parsing, text
/// decoding and assembly for one frame at a time.
pub mod decode;

/// A caption statement PES payload: one 2x2 DRCS glyph and the statement
/// `字幕です` followed by a reference to that glyph, shown for 3 seconds.
pub const EXAMPLE_DATA: &[u8] = &[
    0x80, 0xFF, 0xF0, 0x04, 0x00, 0x00, 0x00, 0x2B, 0x00, 0x00, 0x00, 0x27, 0x1F, 0x30, 0x00, 0x00,
    0x09, 0x01, 0x41, 0x21, 0x01, 0x00, 0x00, 0x02, 0x02, 0x5A, 0x1F, 0x20, 0x00, 0x00, 0x14, 0x0C,
    0x1C, 0x48, 0x45, 0x3B, 0x7A, 0x4B, 0x6B, 0xC7, 0xB9, 0x1B, 0x29, 0x20, 0x41, 0x0E, 0x21, 0x0F,
    0x9D, 0x20, 0x5E, 0xAA, 0xAD,
];

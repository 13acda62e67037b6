//! Parser and decoder for ARIB STD-B24 closed caption bitstreams.
//!
//! ## Technical Overview
//!
//! Japanese digital TV captions travel in PES packets. Each PES data packet
//! wraps one data group, which holds either caption management data or a
//! caption statement. Both carry a loop of data units: statement bodies in
//! the eight-unit code, DRCS glyph definitions and other units that are
//! skipped.
//!
//! ### DRCS
//!
//! Custom glyphs are identified by the MD5 hash of their packed pixels. A
//! conversion table maps known hashes to Unicode code points; unknown glyphs
//! are handed back to the caller so they can be exported and named.
//!
//! ## Quick Start
//!
//! 1. Extract frames from a PES stream using [`process::extract::Extractor`]
//!    or from an MPEG-TS stream using [`process::demux::TsDemuxer`]
//! 2. Decode frames to subtitle events using [`process::decode::Decoder`]
//!
//! ```rust,no_run
//! use aribsub::process::{decode::Decoder, extract::Extractor};
//!
//! let mut extractor = Extractor::default();
//! let mut decoder = Decoder::default();
//!
//! extractor.push_bytes(&std::fs::read("captions.pes")?);
//!
//! for frame_result in extractor {
//!     match frame_result {
//!         Ok(frame) => {
//!             if let Some(event) = decoder.decode(&frame)? {
//!                 for region in &event.regions {
//!                     println!("{} @ ({}, {})", region.text, region.left, region.bottom);
//!                 }
//!             }
//!         }
//!         Err(extract_error) => {
//!             // the extractor resynchronizes on the next start code
//!             eprintln!("Frame extraction error: {}", extract_error);
//!         }
//!     }
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Processing of caption streams.
///
/// 1. **Extraction** ([`process::extract`], [`process::demux`]): PES
///    packets from PES or transport streams.
///
/// 2. **Parsing** ([`process::parse`]): PES data packets into structured
///    data groups with DRCS registration.
///
/// 3. **Decoding** ([`process::decode`], [`process::assemble`]): statement
///    text into timed regions.
pub mod process;

/// Data structures of the caption format.
///
/// - **PES data packets** ([`structs::pes`])
/// - **Data groups** ([`structs::data_group`])
/// - **Caption management and statements** ([`structs::caption`])
/// - **Data units** ([`structs::data_unit`])
/// - **DRCS definitions** ([`structs::drcs`])
/// - **Regions and events** ([`structs::region`])
pub mod structs;

/// Statement body text decoding.
pub mod text;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **CRC Validation** ([`utils::crc`]): Data group CRC-16
/// - **Error Handling** ([`utils::errors`]): Error types
/// - **Timing** ([`utils::timing`]): 90 kHz clock conversions
/// - **Buffer Management** ([`utils::buffer_pool`]): Memory allocation
pub mod utils;

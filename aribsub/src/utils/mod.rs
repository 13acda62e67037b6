//! Utility functions and supporting infrastructure.
//!
//! Provides bitstream I/O, CRC validation, error handling, buffer
//! management and clock conversions for caption processing.

pub mod bitstream_io;
pub mod buffer_pool;
pub mod crc;
pub mod errors;
pub mod timing;

//! Data structures representing caption bitstream components.
//!
//! Contains structured representations of the PES data packet, data
//! groups, caption management and statement blocks, data units, DRCS
//! definitions and the text regions produced from them.

pub mod caption;
pub mod data_group;
pub mod data_unit;
pub mod drcs;
pub mod pes;
pub mod region;
pub mod timestamp;

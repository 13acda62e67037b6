#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum BitReaderError {
    #[error("Out of range: {bits} bits requested at bit {position}, {available} available")]
    OutOfRange {
        bits: u64,
        position: u64,
        available: u64,
    },

    #[error("Read width {0} exceeds 32 bits")]
    WidthTooLarge(u32),

    #[error("Seek target {0} is outside the buffer")]
    InvalidSeek(i64),

    #[error("Range starting at bit {0} is not byte aligned")]
    Unaligned(u64),

    #[error("Failed to allocate {0} bytes")]
    Allocation(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Insufficient buffer data for frame extraction")]
    InsufficientData,

    #[error("Unsupported PES stream id: {0:#04X}")]
    UnsupportedStreamId(u8),

    #[error("PES header length {header} exceeds packet length {packet}")]
    InvalidHeaderLength { header: usize, packet: usize },

    #[error("Lost TS sync byte at packet {0}")]
    TsSyncLost(usize),

    #[error("TS continuity counter jump on PID {pid:#06X}: expected {expected}, found {found}")]
    ContinuityError { pid: u16, expected: u8, found: u8 },
}

#[derive(thiserror::Error, Debug)]
pub enum PesError {
    #[error("Invalid data identifier: {0:#04X}")]
    InvalidDataIdentifier(u8),

    #[error("Invalid private stream id: {0:#04X}")]
    InvalidStreamId(u8),
}

#[derive(thiserror::Error, Debug)]
pub enum DataGroupError {
    #[error("Data group size {declared} exceeds remaining input {available}")]
    SizeExceedsInput { declared: usize, available: usize },

    #[error("Data group CRC mismatch: residue {0:#06X}")]
    CrcMismatch(u16),
}

#[derive(thiserror::Error, Debug)]
pub enum CaptionError {
    #[error("Truncated stream: data unit loop length {declared} exceeds remaining input {available}")]
    TruncatedStream { declared: usize, available: usize },

    #[error("Failed to allocate statement buffer of {0} bytes")]
    Allocation(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum DataUnitError {
    #[error("Malformed unit: separator {0:#04X} != 0x1F")]
    MalformedUnit(u8),

    #[error("Truncated stream: data unit size {declared} exceeds remaining input {available}")]
    TruncatedStream { declared: usize, available: usize },

    #[error("Data unit size mismatch: declared {declared}, consumed {consumed}")]
    SizeMismatch { declared: usize, consumed: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum DrcsError {
    #[error("DRCS slot table full, dropping glyph {0}")]
    SlotTableFull(String),

    #[error("Glyph {width}x{height} with depth {depth} needs more pattern bytes than remain")]
    PatternTruncated { width: u8, height: u8, depth: u8 },

    #[error("Cannot read DRCS conversion table {path}: {source}")]
    ConversionTableUnreadable {
        path: String,
        source: std::io::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum TimestampError {
    #[error("Invalid BCD digit in {0:#X}")]
    InvalidBcdDigit(u16),
}

#[derive(thiserror::Error, Debug)]
pub enum TextError {
    #[error("Control sequence {0:#04X} is truncated")]
    TruncatedControl(u8),

    #[error("Unsupported control sequence {0:#04X}")]
    UnsupportedControl(u8),
}

use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\naribsub ",
    env!("ARIBSUB_VERSION"),
    "\nbuilt ",
    env!("BUILD_TIMESTAMP"),
);

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for inspecting and decoding ARIB STD-B24 caption streams",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode captions into subtitle events.
    Decode(DecodeArgs),

    /// Print the structure of every caption frame.
    Info(InfoArgs),
}

/// Options shared by every command that reads a caption stream.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Input PES or MPEG-TS stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Caption PID, required for MPEG-TS input.
    #[arg(long, value_name = "PID", value_parser = parse_pid)]
    pub pid: Option<u16>,

    /// Container of the input stream.
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub input_format: InputFormat,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output file for subtitle events (stdout when omitted).
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Subtitle event format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// DRCS conversion table mapping glyph hashes to code points.
    #[arg(long, value_name = "PATH")]
    pub drcs_table: Option<PathBuf>,

    /// Directory receiving a PNG for every unknown DRCS glyph.
    #[arg(long, value_name = "DIR")]
    pub export_drcs: Option<PathBuf>,

    /// Drop ruby (small size) text.
    #[arg(long)]
    pub ignore_ruby: bool,

    /// Apply the half-interval adjustment to region positions.
    #[arg(long)]
    pub position_adjustment: bool,

    /// Font family recorded for every region.
    #[arg(long, value_name = "FAMILY", default_value = "sans-serif")]
    pub font_family: String,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum InputFormat {
    /// MPEG-TS when the stream starts with two 188-byte packets, PES otherwise.
    Auto,
    /// Concatenated PES packets.
    Pes,
    /// MPEG transport stream.
    Ts,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// One YAML document listing every event with its regions.
    Yaml,
    /// SubRip text.
    Srt,
}

/// Accepts decimal or `0x`-prefixed hexadecimal PIDs.
fn parse_pid(value: &str) -> Result<u16, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };

    match parsed {
        Ok(pid) if pid <= 0x1FFF => Ok(pid),
        Ok(pid) => Err(format!("PID {pid:#06X} is above 0x1FFF")),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pids() {
        assert_eq!(parse_pid("0x0130"), Ok(0x130));
        assert_eq!(parse_pid("304"), Ok(304));
        assert!(parse_pid("0x2000").is_err());
        assert!(parse_pid("abc").is_err());
    }

    #[test]
    fn decode_arguments() {
        let cli = Cli::try_parse_from([
            "aribsubd",
            "--strict",
            "decode",
            "in.ts",
            "--pid",
            "0x130",
            "--format",
            "srt",
            "--ignore-ruby",
        ])
        .expect("valid arguments");

        assert!(cli.strict);
        let Commands::Decode(args) = cli.command else {
            panic!("expected decode");
        };
        assert_eq!(args.source.pid, Some(0x130));
        assert_eq!(args.format, OutputFormat::Srt);
        assert!(args.ignore_ruby);
        assert!(!args.position_adjustment);
        assert_eq!(args.font_family, "sans-serif");
    }
}

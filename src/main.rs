use std::io::{IsTerminal, Write};

use anyhow::Result;
use clap::Parser as ClapParser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

use cli::command::{Cli, Commands, LogFormat};
use cli::decode::cmd_decode;
use cli::info::cmd_info;

mod cli;
mod input;
pub(crate) mod timestamp;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let logger = build_logger(&cli);
    let max_level = logger.filter();

    // bars are drawn on stderr and only make sense on a terminal
    let show_progress = cli.progress && std::io::stderr().is_terminal();

    let multi = MultiProgress::new();
    let pb = if show_progress {
        LogWrapper::new(multi.clone(), logger).try_init()?;
        Some(&multi)
    } else {
        log::set_boxed_logger(Box::new(logger))?;
        None
    };
    log::set_max_level(max_level);

    if cli.progress && !show_progress {
        log::debug!("stderr is not a terminal, progress bars disabled");
    }

    match cli.command {
        Commands::Decode(ref args) => cmd_decode(args, &cli, pb)?,
        Commands::Info(ref args) => cmd_info(args, &cli, pb)?,
    }

    Ok(())
}

/// `--loglevel` sets the base level; `RUST_LOG` can refine single modules,
/// e.g. `RUST_LOG=aribsub::text=trace`.
fn build_logger(cli: &Cli) -> env_logger::Logger {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(cli.loglevel.to_level_filter());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    match cli.log_format {
        LogFormat::Plain => {
            builder.format_timestamp_millis();
        }
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":\"{}\",\"lvl\":\"{}\",\"target\":\"{}\",\"msg\":{:?}}}",
                    buf.timestamp_millis(),
                    record.level(),
                    record.target(),
                    record.args().to_string()
                )
            });
        }
    }

    builder.build()
}

#[test]
fn loglevel_sets_logger_filter() {
    let cli = Cli::try_parse_from(["aribsubd", "--loglevel", "warn", "info", "in.pes"])
        .expect("valid arguments");
    let logger = build_logger(&cli);

    if std::env::var_os("RUST_LOG").is_none() {
        assert_eq!(logger.filter(), log::LevelFilter::Warn);
        let trace = log::Record::builder().level(log::Level::Trace).build();
        assert!(!logger.matches(&trace));
    }
}

use super::decoder_thread::{DecoderThreadConfig, spawn_decoder_thread};
use super::handler::{DecodeHandler, WriterState};
use super::output::EventWriter;
use super::progress::{create_progress_bar, estimate_total_frames};
use crate::cli::command::{Cli, DecodeArgs};
use anyhow::Result;
use indicatif::{MultiProgress, ProgressStyle};
use log::Level;
use std::sync::mpsc;

use aribsub::process::decode::{Decoder, DecoderConfig};
use aribsub::process::drcs::DrcsConversionTable;

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Decoding caption stream: {} (strict mode: {}, format: {:?})",
        args.source.input.display(),
        cli.strict,
        args.format
    );

    let is_pipe = args.source.input.to_string_lossy() == "-";

    // Estimate total frames if needed
    let total_frames = if !is_pipe && multi.is_some() {
        Some(estimate_total_frames(&args.source)?)
    } else {
        if is_pipe {
            log::debug!("Skipping progress estimation for pipe input");
        }
        None
    };

    // Create progress bar
    let pb = if let Some(multi) = multi {
        Some(create_progress_bar(multi, total_frames)?)
    } else {
        None
    };

    // Configure fail level based on strict mode
    let fail_level = if cli.strict {
        Level::Warn
    } else {
        Level::Error
    };

    let mut decoder = Decoder::new(DecoderConfig {
        ignore_ruby_text: args.ignore_ruby,
        ignore_position_adjustment: !args.position_adjustment,
        default_font_family: args.font_family.clone(),
    });
    decoder.set_fail_level(fail_level);

    if let Some(path) = &args.drcs_table {
        let table = DrcsConversionTable::load_or_empty(path);
        log::info!(
            "Loaded {} DRCS conversions from {}",
            table.len(),
            path.display()
        );
        decoder.set_conversion_table(table);
    }

    // Spawn decoder thread
    let (tx, rx) = mpsc::channel();
    let decode_thread = spawn_decoder_thread(DecoderThreadConfig {
        source: args.source.clone(),
        strict_mode: cli.strict,
        tx,
        pb_clone: pb.clone(),
        decoder,
    });

    // Handle decoded frames
    let writer = EventWriter::create(args.output.as_deref(), args.format)?;
    let mut handler = DecodeHandler::new(writer, args.export_drcs.clone(), WriterState { fail_level })?;

    while let Ok(result) = rx.recv() {
        let handled = result.and_then(|frame| handler.handle_decoded_frame(frame, &pb));
        if let Err(e) = handled {
            if let Some(pb) = pb {
                pb.finish_with_message("decode failed");
            }
            return Err(e);
        }
    }

    let events_written = handler.events_written;
    handler.finalize()?;

    // Wait for decode thread and finalize progress
    match decode_thread.join() {
        Ok(Ok(())) => {
            finalize_progress_bar(&pb, total_frames, events_written);
            log::info!("Decoding completed successfully");
        }
        Ok(Err(e)) => {
            if let Some(pb) = pb {
                pb.finish_with_message("decode failed");
            }
            return Err(e);
        }
        Err(_) => {
            if let Some(pb) = pb {
                pb.finish_with_message("decode thread panicked");
            }
            return Err(anyhow::anyhow!("Decode thread panicked"));
        }
    }

    Ok(())
}

fn finalize_progress_bar(
    pb: &Option<indicatif::ProgressBar>,
    total_frames: Option<u64>,
    events_written: u64,
) {
    if let Some(pb) = pb {
        if total_frames.is_some() {
            pb.set_style(
                ProgressStyle::with_template(
                    "{bar:40.cyan/blue} {pos}/{len} frames ({percent}%)\n{msg} | elapsed: {elapsed_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
        } else {
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {pos} frames\n{msg} | elapsed: {elapsed_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
        }

        pb.finish_with_message(format!("events: {events_written}"));
    }
}

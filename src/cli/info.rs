use std::collections::HashSet;

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;

use super::command::{Cli, InfoArgs};
use super::source::{FrameSource, drain_frames};
use crate::timestamp::time_str;
use aribsub::process::extract::Frame;
use aribsub::process::parse::{CaptionFrame, Parser};
use aribsub::structs::caption::CaptionBlock;
use aribsub::structs::data_unit::DataUnitPayload;

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing caption stream: {}", args.source.input.display());

    let (mut input_reader, mut frames) = FrameSource::open(&args.source)?;
    let mut parser = Parser::default();

    // Configure fail level based on strict mode
    let fail_level = if cli.strict {
        Level::Warn
    } else {
        Level::Error
    };
    parser.set_fail_level(fail_level);

    let mut context = AnalysisContext::default();

    // Create progress bar for frame counting if enabled
    if let Some(multi) = multi {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message("Analyzing frames...");
        context.pb = Some(pb);
    }

    input_reader.process_chunks(64 * 1024, |chunk| {
        context.total_bytes += chunk.len();
        frames.push_bytes(chunk);
        drain_frames(&mut frames, |frame| {
            context.process_frame(&frame, &mut parser, cli)?;
            Ok(true)
        })
    })?;

    frames.finish();
    drain_frames(&mut frames, |frame| {
        context.process_frame(&frame, &mut parser, cli)?;
        Ok(true)
    })?;

    if let Some(pb) = &context.pb {
        pb.finish_and_clear();
    }
    context.display_summary();

    Ok(())
}

#[derive(Default)]
struct AnalysisContext {
    frame_count: usize,
    management_groups: usize,
    statement_groups: usize,
    parse_errors: usize,
    crc_errors: usize,
    statement_bytes: usize,
    glyphs: HashSet<String>,
    first_pts: Option<u64>,
    last_pts: Option<u64>,
    pb: Option<ProgressBar>,
    total_bytes: usize,
}

impl AnalysisContext {
    fn process_frame(&mut self, frame: &Frame, parser: &mut Parser, cli: &Cli) -> Result<()> {
        self.frame_count += 1;

        if let Some(pts) = frame.pts {
            self.first_pts.get_or_insert(pts);
            self.last_pts = Some(pts);
        }

        match parser.parse(frame) {
            Ok(caption) => {
                let report = self.frame_report(&caption);
                self.print(&report);
            }
            Err(e) => {
                if cli.strict {
                    return Err(e);
                }
                self.parse_errors += 1;
                log::warn!("Parse error at frame {}: {e}", self.frame_count);
            }
        }

        if self.frame_count.is_multiple_of(100) {
            if let Some(ref pb) = self.pb {
                pb.set_message(format!("Analyzing frames...       {}", self.frame_count));
                pb.tick();
            }
        }

        Ok(())
    }

    fn frame_report(&mut self, caption: &CaptionFrame) -> String {
        let packet = &caption.packet;
        let group = &packet.data_group;
        let mut lines = Vec::new();

        lines.push(format!(
            "Frame {:<6} PTS {}",
            self.frame_count,
            caption.pts.map_or_else(|| "-".to_string(), time_str)
        ));
        lines.push(format!(
            "  Data identifier           {:#04X} ({})",
            packet.data_identifier,
            if packet.is_synchronized() {
                "synchronized"
            } else {
                "asynchronous"
            }
        ));

        let crc = match group.crc_valid {
            Some(true) => "ok",
            Some(false) => {
                self.crc_errors += 1;
                "mismatch"
            }
            None => "absent",
        };
        lines.push(format!(
            "  Data group                id {:#04X}, version {}, size {}, CRC {crc}",
            group.data_group_id, group.data_group_version, group.data_group_size
        ));

        match &group.block {
            CaptionBlock::Management(management) => {
                self.management_groups += 1;
                lines.push(format!(
                    "  Caption management        {:?}, {} language(s)",
                    management.time_control_mode,
                    management.languages.len()
                ));
                for language in &management.languages {
                    lines.push(format!("    {language}"));
                }
            }
            CaptionBlock::Statement(statement) => {
                self.statement_groups += 1;
                let language = group
                    .language_index()
                    .map_or_else(|| "-".to_string(), |index| index.to_string());
                lines.push(format!(
                    "  Caption statement         language {language}, {:?}{}",
                    statement.time_control_mode,
                    statement
                        .start_time
                        .as_ref()
                        .map(|time| format!(", start {time}"))
                        .unwrap_or_default()
                ));
            }
        }

        let units = group.block.data_units();
        lines.push(format!(
            "  Data units                {} ({} of {} bytes{})",
            units.units.len(),
            units.consumed,
            units.loop_length,
            if units.complete { "" } else { ", incomplete" }
        ));
        for unit in &units.units {
            let detail = match &unit.payload {
                DataUnitPayload::StatementBody { len, .. } => format!("statement body, {len} bytes"),
                DataUnitPayload::Drcs(drcs) => format!("DRCS, {} pattern glyph(s)", drcs.glyphs().count()),
                DataUnitPayload::Skipped => format!("skipped, {} bytes", unit.size),
            };
            lines.push(format!("    {:#04X}  {detail}", unit.parameter));
        }

        for (index, slot) in caption.slots.iter().enumerate() {
            let new = caption
                .stored_glyphs
                .iter()
                .any(|glyph| glyph.hash == slot.hash);
            lines.push(format!(
                "    DRCS {index}: {}{}",
                slot.hash,
                if new { " (new)" } else { "" }
            ));
            self.glyphs.insert(slot.hash.clone());
        }
        if caption.slots.dropped > 0 {
            lines.push(format!("    {} DRCS glyph(s) dropped", caption.slots.dropped));
        }

        if let Some(statement) = caption.statement() {
            self.statement_bytes += statement.len();
        }

        lines.join("\n")
    }

    fn print(&self, report: &str) {
        if let Some(ref pb) = self.pb {
            pb.suspend(|| println!("{report}\n"));
        } else {
            println!("{report}\n");
        }
    }

    fn display_summary(&self) {
        println!("Caption Stream Summary");
        println!("======================");
        println!();
        println!("Frames                      {}", self.frame_count);
        println!("Caption management groups   {}", self.management_groups);
        println!("Caption statement groups    {}", self.statement_groups);
        println!("Statement bytes             {}", self.statement_bytes);
        println!("Distinct DRCS glyphs        {}", self.glyphs.len());
        println!("Parse errors                {}", self.parse_errors);
        println!("CRC mismatches              {}", self.crc_errors);
        if let (Some(first), Some(last)) = (self.first_pts, self.last_pts) {
            println!(
                "PTS range                   {} - {}",
                time_str(first),
                time_str(last)
            );
        }
        println!("Bytes read                  {}", self.total_bytes);
    }
}

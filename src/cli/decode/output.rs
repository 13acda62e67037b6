use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use aribsub::structs::region::{SubtitleEvent, TextRegion};
use aribsub::utils::timing::CLOCK_RATE;

use super::super::command::OutputFormat;
use crate::timestamp::{srt_time, time_str};

/// Display time given to an untimed event that is never replaced.
pub const EPHEMERAL_TAIL: u64 = 5 * CLOCK_RATE;

#[derive(Debug, Serialize)]
pub struct EventRecord {
    pub start: String,
    pub stop: String,
    pub start_ticks: u64,
    pub stop_ticks: u64,
    pub ephemeral: bool,
    pub regions: Vec<RegionRecord>,
}

#[derive(Debug, Serialize)]
pub struct RegionRecord {
    pub text: String,
    pub font_family: String,
    pub font_color: String,
    pub plane_width: u32,
    pub plane_height: u32,
    pub font_width: u32,
    pub font_height: u32,
    pub horizontal_interval: u32,
    pub vertical_interval: u32,
    pub left: i32,
    pub bottom: i32,
    pub placement: PlacementRecord,
}

#[derive(Debug, Serialize)]
pub struct PlacementRecord {
    pub x: i32,
    pub y: i32,
    pub font_size: u32,
    pub spacing: u32,
    pub halfwidth: bool,
}

impl From<&SubtitleEvent> for EventRecord {
    fn from(event: &SubtitleEvent) -> Self {
        Self {
            start: time_str(event.start),
            stop: time_str(event.stop),
            start_ticks: event.start,
            stop_ticks: event.stop,
            ephemeral: event.ephemeral,
            regions: event.regions.iter().map(RegionRecord::from).collect(),
        }
    }
}

impl From<&TextRegion> for RegionRecord {
    fn from(region: &TextRegion) -> Self {
        let placement = region.placement();

        Self {
            text: region.text.clone(),
            font_family: region.font_family.clone(),
            font_color: format!("#{:06X}", region.font_color),
            plane_width: region.plane_width,
            plane_height: region.plane_height,
            font_width: region.font_width,
            font_height: region.font_height,
            horizontal_interval: region.horizontal_interval,
            vertical_interval: region.vertical_interval,
            left: region.left,
            bottom: region.bottom,
            placement: PlacementRecord {
                x: placement.x,
                y: placement.y,
                font_size: placement.font_size,
                spacing: placement.spacing,
                halfwidth: placement.halfwidth,
            },
        }
    }
}

pub enum EventWriter<W: Write> {
    /// Events are collected and written as one sequence on finish.
    Yaml { out: W, events: Vec<EventRecord> },
    /// An untimed event is held back until the next event tells when it
    /// disappears.
    Srt {
        out: W,
        index: usize,
        pending: Option<SubtitleEvent>,
    },
}

impl EventWriter<Box<dyn Write>> {
    /// Writes to `path`, or to stdout when no path is given.
    pub fn create(path: Option<&Path>, format: OutputFormat) -> Result<Self> {
        let out: Box<dyn Write> = match path {
            Some(path) => {
                log::info!("Creating subtitle file: {}", path.display());
                Box::new(BufWriter::new(File::create(path)?))
            }
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };

        Ok(Self::new(out, format))
    }
}

impl<W: Write> EventWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => EventWriter::Yaml {
                out,
                events: Vec::new(),
            },
            OutputFormat::Srt => EventWriter::Srt {
                out,
                index: 0,
                pending: None,
            },
        }
    }

    pub fn write_event(&mut self, event: &SubtitleEvent) -> Result<()> {
        match self {
            EventWriter::Yaml { events, .. } => {
                if !event.is_empty() {
                    events.push(EventRecord::from(event));
                }
            }
            EventWriter::Srt {
                out,
                index,
                pending,
            } => {
                if let Some(previous) = pending.take() {
                    write_srt_entry(out, index, &previous, event.start)?;
                }

                if event.is_empty() {
                    return Ok(());
                }
                if event.ephemeral {
                    *pending = Some(event.clone());
                } else {
                    write_srt_entry(out, index, event, event.stop)?;
                }
            }
        }

        Ok(())
    }

    /// Flushes held events and returns the underlying writer.
    pub fn finish(self) -> Result<W> {
        match self {
            EventWriter::Yaml { mut out, events } => {
                serde_yaml_ng::to_writer(&mut out, &events)?;
                out.flush()?;
                Ok(out)
            }
            EventWriter::Srt {
                mut out,
                mut index,
                pending,
            } => {
                if let Some(previous) = pending {
                    let stop = previous.start + EPHEMERAL_TAIL;
                    write_srt_entry(&mut out, &mut index, &previous, stop)?;
                }
                out.flush()?;
                Ok(out)
            }
        }
    }
}

fn write_srt_entry<W: Write>(
    out: &mut W,
    index: &mut usize,
    event: &SubtitleEvent,
    stop: u64,
) -> Result<()> {
    if stop <= event.start {
        log::debug!("Skipping zero length event at {}", time_str(event.start));
        return Ok(());
    }

    *index += 1;
    writeln!(out, "{index}")?;
    writeln!(out, "{} --> {}", srt_time(event.start), srt_time(stop))?;
    writeln!(out, "{}", srt_text(event))?;
    writeln!(out)?;
    Ok(())
}

/// Regions sharing a baseline are joined into one line.
fn srt_text(event: &SubtitleEvent) -> String {
    let mut text = String::new();
    let mut bottom = None;

    for region in &event.regions {
        if bottom.is_some_and(|b| b != region.bottom) {
            text.push('\n');
        }
        text.push_str(region.text.trim_end_matches('\n'));
        bottom = Some(region.bottom);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start: u64, stop: u64, lines: &[(&str, i32)]) -> SubtitleEvent {
        SubtitleEvent {
            start,
            stop,
            ephemeral: start == stop,
            regions: lines
                .iter()
                .map(|&(text, bottom)| TextRegion {
                    text: text.to_string(),
                    font_family: "sans-serif".to_string(),
                    font_color: 0xFFFF00,
                    plane_width: 960,
                    plane_height: 540,
                    font_width: 36,
                    font_height: 36,
                    vertical_interval: 24,
                    horizontal_interval: 4,
                    left: 240,
                    bottom,
                    start,
                    stop,
                })
                .collect(),
        }
    }

    #[test]
    fn srt_holds_untimed_events() -> Result<()> {
        let mut writer = EventWriter::new(Vec::new(), OutputFormat::Srt);
        writer.write_event(&event(90_000, 90_000, &[("一行目", 480), ("続き", 480), ("二行目", 540)]))?;
        writer.write_event(&event(270_000, 270_000, &[]))?;
        writer.write_event(&event(450_000, 540_000, &[("時間付き", 540)]))?;
        writer.write_event(&event(900_000, 900_000, &[("最後", 540)]))?;

        let out = String::from_utf8(writer.finish()?)?;
        assert_eq!(
            out,
            "1\n00:00:01,000 --> 00:00:03,000\n一行目続き\n二行目\n\n\
             2\n00:00:05,000 --> 00:00:06,000\n時間付き\n\n\
             3\n00:00:10,000 --> 00:00:15,000\n最後\n\n"
        );
        Ok(())
    }

    #[test]
    fn yaml_lists_regions() -> Result<()> {
        let mut writer = EventWriter::new(Vec::new(), OutputFormat::Yaml);
        writer.write_event(&event(90_000, 360_000, &[("字幕", 540)]))?;
        writer.write_event(&event(400_000, 400_000, &[]))?;

        let out = String::from_utf8(writer.finish()?)?;
        let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(&out)?;
        let events = value.as_sequence().expect("sequence");
        assert_eq!(events.len(), 1);

        let region = &events[0]["regions"][0];
        assert_eq!(events[0]["start_ticks"].as_u64(), Some(90_000));
        assert_eq!(events[0]["stop"].as_str(), Some("00:00:04.000"));
        assert_eq!(region["text"].as_str(), Some("字幕"));
        assert_eq!(region["font_color"].as_str(), Some("#FFFF00"));
        assert_eq!(region["placement"]["font_size"].as_u64(), Some(40));
        Ok(())
    }
}

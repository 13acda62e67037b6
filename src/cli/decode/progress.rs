use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::cli::command::SourceArgs;
use crate::cli::source::{FrameSource, drain_frames};

/// Counts the frames of the input with a separate pass.
pub fn estimate_total_frames(source: &SourceArgs) -> Result<u64> {
    log::info!("Counting frames for progress estimation");
    let count_start = std::time::Instant::now();

    let (mut input_reader, mut frames) = FrameSource::open(source)?;
    let mut successful_frames = 0u64;
    let mut bytes_read = 0u64;

    let mut count = |frames: &mut FrameSource| {
        drain_frames(frames, |_| {
            successful_frames += 1;
            Ok(true)
        })
    };

    input_reader.process_chunks(64 * 1024, |chunk| {
        bytes_read += chunk.len() as u64;
        frames.push_bytes(chunk);
        count(&mut frames)
    })?;

    frames.finish();
    count(&mut frames)?;

    let count_elapsed = count_start.elapsed();
    let read_speed_mbps = if count_elapsed.as_secs_f64() > 0.0 {
        (bytes_read as f64) / 1_000_000.0 / count_elapsed.as_secs_f64()
    } else {
        0.0
    };

    log::info!(
        "Found {successful_frames} caption frames in {:.3}s ({:.1} MB/s, {} bytes)",
        count_elapsed.as_secs_f64(),
        read_speed_mbps,
        bytes_read
    );

    Ok(successful_frames)
}

pub fn create_progress_bar(
    multi: &MultiProgress,
    total_frames: Option<u64>,
) -> Result<ProgressBar> {
    let pb = if let Some(total) = total_frames {
        let pb = multi.add(ProgressBar::new(total));
        pb.set_style(ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos}/{len} frames ({percent}%)\n{msg} | elapsed: {elapsed_precise} | ETA: {eta_precise}",
        )?);

        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    } else {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} {pos} frames\n{msg} | elapsed: {elapsed_precise}",
        )?);

        pb
    };
    pb.set_message("initializing decoder");
    Ok(pb)
}

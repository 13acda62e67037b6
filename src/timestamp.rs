use aribsub::utils::timing::CLOCK_RATE;

/// `HH:MM:SS.mmm` for a 90 kHz tick count.
pub fn time_str(ticks: u64) -> String {
    clock(ticks, '.')
}

/// SubRip timestamp, `HH:MM:SS,mmm`.
pub fn srt_time(ticks: u64) -> String {
    clock(ticks, ',')
}

fn clock(ticks: u64, separator: char) -> String {
    let ms = ticks * 1000 / CLOCK_RATE;
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let milliseconds = ms % 1000;

    format!(
        "{hours:0width$}:{minutes:02}:{seconds:02}{separator}{milliseconds:03}",
        width = if hours >= 100 { 0 } else { 2 }
    )
}

#[test]
fn format_ticks() {
    assert_eq!(time_str(0), "00:00:00.000");
    assert_eq!(time_str(90_000 * 3661 + 45), "01:01:01.000");
    assert_eq!(srt_time(135_000), "00:00:01,500");
}

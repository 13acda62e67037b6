//! Conversions between the 90 kHz presentation clock and wall time.

use std::time::Duration;

/// MPEG system clock rate used by PES presentation timestamps.
pub const CLOCK_RATE: u64 = 90_000;

/// PTS values wrap at 33 bits.
pub const PTS_MODULO: u64 = 1 << 33;

/// Converts a duration into 90 kHz ticks, rounding down.
pub fn duration_to_ticks(duration: Duration) -> u64 {
    (duration.as_micros() as u64).saturating_mul(9) / 100
}

pub fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::from_micros(ticks.saturating_mul(100) / 9)
}

/// Seconds represented by `ticks`, for display.
pub fn ticks_to_secs(ticks: u64) -> f64 {
    ticks as f64 / CLOCK_RATE as f64
}

#[test]
fn convert_ticks() {
    assert_eq!(duration_to_ticks(Duration::from_secs(1)), CLOCK_RATE);
    assert_eq!(duration_to_ticks(Duration::from_millis(2500)), 225_000);
    assert_eq!(ticks_to_duration(45_000), Duration::from_millis(500));
    assert!((ticks_to_secs(135_000) - 1.5).abs() < f64::EPSILON);
}

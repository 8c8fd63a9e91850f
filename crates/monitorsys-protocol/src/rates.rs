//! Delta-rate helpers shared by the collector and its tests.

/// Interval substituted when the clock did not advance (or went backwards).
pub const FALLBACK_ELAPSED_SECS: f64 = 1.0;

/// Seconds between two sample times. Zero or negative intervals (sampling
/// faster than clock resolution, or a clock step) become one second.
pub fn elapsed_secs(prev: f64, now: f64) -> f64 {
    let elapsed = now - prev;
    if elapsed > 0.0 && elapsed.is_finite() {
        elapsed
    } else {
        FALLBACK_ELAPSED_SECS
    }
}

/// Bytes/sec between two cumulative counters, floored at 0 so a counter
/// reset or wraparound never yields a negative rate.
pub fn rate(current: u64, previous: u64, elapsed: f64) -> f64 {
    current.saturating_sub(previous) as f64 / elapsed
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

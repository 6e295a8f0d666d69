//! Numeric conversion helpers centralizing lossy casts for derived statistics.

use num_traits::cast::cast;

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Convert a count to u32, saturating at `u32::MAX`.
#[must_use]
pub fn usize_to_u32(value: usize) -> u32 {
    cast::<usize, u32>(value).unwrap_or(u32::MAX)
}

/// `part / whole * 100`, or 0 when `whole` is zero.
#[must_use]
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    u64_to_f64(part) / u64_to_f64(whole) * 100.0
}

/// Average of `total_millis` over `count` items, in seconds. 0 when `count` is zero.
#[must_use]
pub fn average_seconds(total_millis: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    u64_to_f64(total_millis) / u64_to_f64(count) / 1000.0
}

/// Milliseconds as fractional seconds.
#[must_use]
pub fn millis_to_seconds(millis: u64) -> f64 {
    u64_to_f64(millis) / 1000.0
}

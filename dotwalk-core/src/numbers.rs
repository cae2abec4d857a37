//! Numeric conversion helpers centralizing safe numeric casts and angle math.

use num_traits::cast::cast;
use std::f64::consts::TAU;

/// Ceil a f64 and clamp it to the u64 range, returning 0 for non-finite or negative values.
#[must_use]
pub fn ceil_f64_to_u64(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    cast::<f64, u64>(value.min(max).ceil()).unwrap_or(u64::MAX)
}

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Convert a signed millisecond value into a pause length, rejecting negatives.
#[must_use]
pub fn i64_to_pause_ms(value: i64) -> Option<u64> {
    cast::<i64, u64>(value)
}

/// Wrap an angle in radians into `[0, 2π)`. Non-finite input maps to 0.
#[must_use]
pub fn normalize_radians(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Heading in degrees within `[0, 360)`.
#[must_use]
pub fn radians_to_degrees(angle: f64) -> f64 {
    normalize_radians(angle).to_degrees()
}

//! Scale / offset / clamp / EWMA normalization of raw sensor values

use crate::catalog::Transform;

/// Apply `transform` to `raw`.
///
/// Steps run in a fixed order: scale, offset, lower clamp, upper clamp,
/// smoothing. Returns the published value and the smoothing state to carry
/// into the next sample. Without smoothing the previous state is returned
/// untouched. The first smoothed sample seeds the average with itself.
pub fn apply(raw: f64, transform: Option<&Transform>, previous_smoothed: Option<f64>) -> (f64, Option<f64>) {
    let Some(transform) = transform else {
        return (raw, previous_smoothed);
    };

    let mut value = raw;
    if let Some(scale) = transform.scale {
        value *= scale;
    }
    if let Some(offset) = transform.offset {
        value += offset;
    }
    if let Some(min) = transform.clamp_min {
        value = value.max(min);
    }
    if let Some(max) = transform.clamp_max {
        value = value.min(max);
    }

    match transform.smoothing {
        Some(alpha) => {
            let previous = previous_smoothed.unwrap_or(value);
            let smoothed = alpha * value + (1.0 - alpha) * previous;
            (smoothed, Some(smoothed))
        },
        None => (value, previous_smoothed),
    }
}

//! Equal-power gain curve for fade-in and fade-out ramps.

use std::f64::consts::PI;

/// Gain for a normalised fade ratio `x`.
///
/// `g = sqrt(0.5 - 0.5 * cos(pi * x))`: 0 at `x = 0`, 1 at `x = 1`, with a
/// flat slope at both ends. Ratios outside `[0, 1]` are clamped and a NaN
/// ratio yields silence.
pub fn fade_factor(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    let x = x.clamp(0.0, 1.0);
    (0.5 - 0.5 * (PI * x).cos()).max(0.0).sqrt()
}

/// Ratio for a fade-in: how far into the leading window playback is.
pub fn fade_in_ratio(position: f64, window: f64) -> f64 {
    position / window
}

/// Ratio for a fade-out: how much of the trailing window is left.
pub fn fade_out_ratio(gap: f64, window: f64) -> f64 {
    gap / window
}

/// Volume actually sent to the engine while a fade is active.
pub fn scaled_volume(volume: f64, gain: f64) -> f64 {
    volume * gain
}

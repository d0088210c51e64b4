// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Hysteresis Reduction
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! Saturation amplitude of a measured hysteresis loop, used to normalize
//! transient MOKE traces.

use moke_types::constants::SATURATION_FRACTION;

/// Swing between the mean signal in positive and negative saturation.
///
/// Points with `field > fraction × amplitude` count as positive saturation,
/// `field < −fraction × amplitude` as negative. Returns `None` if either
/// branch has no points.
pub fn saturation_amplitude(points: &[(f64, f64)], amplitude: f64, fraction: f64) -> Option<f64> {
    let threshold = amplitude * fraction;
    let (mut pos_sum, mut pos_n) = (0.0, 0usize);
    let (mut neg_sum, mut neg_n) = (0.0, 0usize);
    for &(field, signal) in points {
        if field > threshold {
            pos_sum += signal;
            pos_n += 1;
        } else if field < -threshold {
            neg_sum += signal;
            neg_n += 1;
        }
    }
    if pos_n == 0 || neg_n == 0 {
        return None;
    }
    Some((pos_sum / pos_n as f64 - neg_sum / neg_n as f64).abs())
}

/// [`saturation_amplitude`] with the default 80 % saturation window.
pub fn moke_amplitude(points: &[(f64, f64)], amplitude: f64) -> Option<f64> {
    saturation_amplitude(points, amplitude, SATURATION_FRACTION)
}

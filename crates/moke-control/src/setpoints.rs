// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Setpoint Vectors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Ordered position and field sequences.
//!
//! Linear delay axes (optionally piecewise) and the triangular field sweep
//! of a hysteresis measurement. All builders fail fast on degenerate input
//! so that no scan starts moving hardware with a malformed vector.

use moke_types::config::{DelaySegment, HysteresisConfig};
use moke_types::constants::{
    FIELD_OVERSHOOT_LIMIT_V, HYSTERESIS_STEP_FRACTION, MAX_FIELD_AMPLITUDE_V, MAX_SETPOINTS,
};
use moke_types::error::{MokeError, MokeResult};

/// Evenly spaced points from `start` to `end` inclusive.
///
/// The point count is `round((end − start) / step)`, so the realised spacing
/// is `(end − start) / (count − 1)` and can differ slightly from `step`.
pub fn linear_vector(start: f64, end: f64, step: f64) -> MokeResult<Vec<f64>> {
    if !start.is_finite() || !end.is_finite() || !step.is_finite() || step == 0.0 {
        return Err(MokeError::ConfigError(format!(
            "linear scan needs finite start/end and a non-zero step (start={start}, end={end}, step={step})"
        )));
    }
    let count = ((end - start) / step).round();
    if !count.is_finite() || count < 1.0 {
        return Err(MokeError::ConfigError(format!(
            "linear scan {start}..{end} with step {step} has no points"
        )));
    }
    if count > MAX_SETPOINTS as f64 {
        return Err(MokeError::ConfigError(format!(
            "linear scan {start}..{end} with step {step} exceeds {MAX_SETPOINTS} points"
        )));
    }
    let count = count as usize;
    if count == 1 {
        return Ok(vec![start]);
    }
    let spacing = (end - start) / (count - 1) as f64;
    Ok((0..count)
        .map(|i| {
            if i == count - 1 {
                end
            } else {
                start + spacing * i as f64
            }
        })
        .collect())
}

/// Concatenation of linear segments, in the given order.
pub fn segmented_vector(segments: &[DelaySegment]) -> MokeResult<Vec<f64>> {
    if segments.is_empty() {
        return Err(MokeError::ConfigError("no delay segments".to_string()));
    }
    let mut out = Vec::new();
    for seg in segments {
        out.extend(linear_vector(seg.start, seg.end, seg.step)?);
    }
    Ok(out)
}

/// Delays given relative to time zero, made absolute.
pub fn absolute_delays(time_zero_ps: f64, relative: &[f64]) -> Vec<f64> {
    relative.iter().map(|d| time_zero_ps + d).collect()
}

/// Field limits applied to a hysteresis sweep.
#[derive(Debug, Clone, Copy)]
pub struct FieldLimits {
    /// Amplitudes above this are rejected.
    pub max_amplitude: f64,
    /// If `amplitude + step` exceeds this, the sweep peaks at the amplitude
    /// itself instead of one step beyond it.
    pub overshoot_limit: f64,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            max_amplitude: MAX_FIELD_AMPLITUDE_V,
            overshoot_limit: FIELD_OVERSHOOT_LIMIT_V,
        }
    }
}

/// Triangular hysteresis sweep with default limits.
/// `step = None` uses amplitude / 100.
pub fn hysteresis_vector(amplitude: f64, step: Option<f64>, loop_count: usize) -> MokeResult<Vec<f64>> {
    hysteresis_vector_limited(amplitude, step, loop_count, FieldLimits::default())
}

/// Triangular hysteresis sweep.
///
/// Points lie on the lattice `k × step`. With peak index `n`
/// (`round(amplitude / step) + 1`, or without the `+ 1` above the overshoot
/// limit) the sequence is
///
/// ```text
/// 0, 1, …, n                       ramp up
/// n−1, …, −n,  −n+1, …, n          once per loop
/// n−1, …, 0                        ramp down
/// ```
///
/// times `step`, i.e. `2n + 1 + 4n·loop_count` points.
pub fn hysteresis_vector_limited(
    amplitude: f64,
    step: Option<f64>,
    loop_count: usize,
    limits: FieldLimits,
) -> MokeResult<Vec<f64>> {
    if !amplitude.is_finite() || amplitude <= 0.0 {
        return Err(MokeError::ConfigError(format!(
            "hysteresis amplitude must be finite and > 0, got {amplitude}"
        )));
    }
    let step = step.unwrap_or(amplitude * HYSTERESIS_STEP_FRACTION);
    if !step.is_finite() || step <= 0.0 {
        return Err(MokeError::ConfigError(format!(
            "hysteresis step must be finite and > 0, got {step}"
        )));
    }
    if amplitude > limits.max_amplitude {
        return Err(MokeError::ConfigError(format!(
            "hysteresis amplitude {amplitude} exceeds the field limit {}",
            limits.max_amplitude
        )));
    }

    let base = (amplitude / step).round();
    if !base.is_finite() || base > MAX_SETPOINTS as f64 {
        return Err(MokeError::ConfigError(format!(
            "hysteresis step {step} is too fine for the amplitude {amplitude}"
        )));
    }
    let base = base as i64;
    let n = if amplitude + step > limits.overshoot_limit {
        Some(base)
    } else {
        base.checked_add(1)
    }
    .filter(|&n| n >= 1)
    .ok_or_else(|| {
        MokeError::ConfigError(format!(
            "hysteresis step {step} is larger than the amplitude {amplitude}"
        ))
    })?;

    let len = (n as usize)
        .checked_mul(4)
        .and_then(|q| q.checked_mul(loop_count))
        .and_then(|l| l.checked_add(2 * n as usize + 1))
        .filter(|&l| l <= MAX_SETPOINTS)
        .ok_or_else(|| {
            MokeError::ConfigError(format!(
                "hysteresis sweep with peak index {n} and {loop_count} loops exceeds {MAX_SETPOINTS} points"
            ))
        })?;
    let at = |k: i64| k as f64 * step;
    let mut out = Vec::with_capacity(len);
    out.extend((0..=n).map(at));
    for _ in 0..loop_count {
        out.extend((-n..n).rev().map(at));
        out.extend((-n + 1..=n).map(at));
    }
    out.extend((0..n).rev().map(at));
    debug_assert_eq!(out.len(), len);
    Ok(out)
}

/// Hysteresis sweep for a configuration section.
pub fn hysteresis_from_config(cfg: &HysteresisConfig) -> MokeResult<Vec<f64>> {
    hysteresis_vector_limited(
        cfg.amplitude,
        cfg.step,
        cfg.loop_count,
        FieldLimits {
            max_amplitude: cfg.max_amplitude,
            overshoot_limit: cfg.overshoot_limit,
        },
    )
}

/// Expected length of [`hysteresis_vector_limited`] for peak index `n`.
pub fn hysteresis_len(n: usize, loop_count: usize) -> usize {
    2 * n + 1 + 4 * n * loop_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_linear_vector_inclusive() {
        let v = linear_vector(0.0, 10.0, 2.0).unwrap();
        assert_eq!(v.len(), 5);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[4], 10.0);
        assert!(close(v[1], 2.5), "linspace spacing is 10/4: {}", v[1]);
    }

    #[test]
    fn test_linear_vector_descending() {
        let v = linear_vector(10.0, 0.0, -5.0).unwrap();
        assert_eq!(v, vec![10.0, 0.0]);
    }

    #[test]
    fn test_linear_vector_degenerate() {
        assert!(linear_vector(0.0, 10.0, 0.0).is_err());
        assert!(linear_vector(0.0, 10.0, -1.0).is_err());
        assert!(linear_vector(5.0, 5.0, 1.0).is_err());
        assert!(linear_vector(0.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_segmented_vector() {
        let v = segmented_vector(&[
            DelaySegment { start: -10.0, end: 0.0, step: 5.0 },
            DelaySegment { start: 1.0, end: 100.0, step: 33.0 },
        ])
        .unwrap();
        assert_eq!(v.len(), 2 + 3);
        assert_eq!(v[0], -10.0);
        assert_eq!(v[4], 100.0);
        assert!(segmented_vector(&[]).is_err());
    }

    #[test]
    fn test_absolute_delays() {
        assert_eq!(absolute_delays(100.0, &[-20.0, 0.0, 5.0]), vec![80.0, 100.0, 105.0]);
    }

    #[test]
    fn test_hysteresis_worked_example() {
        let v = hysteresis_vector(2.0, Some(0.02), 1).unwrap();
        let n = 101;
        assert_eq!(v.len(), hysteresis_len(n, 1));
        assert_eq!(v[0], 0.0);
        assert!(close(v[1], 0.02));
        assert!(close(v[2], 0.04));
        assert!(close(v[n], 2.02), "ramp peak: {}", v[n]);
        // down to −2.02
        assert!(close(v[3 * n], -2.02), "negative peak: {}", v[3 * n]);
        // up to 2.02
        assert!(close(v[5 * n], 2.02), "positive peak: {}", v[5 * n]);
        assert!(close(*v.last().unwrap(), 0.0));
        let max = v.iter().cloned().fold(f64::MIN, f64::max);
        let min = v.iter().cloned().fold(f64::MAX, f64::min);
        assert!(close(max, 2.02) && close(min, -2.02));
    }

    #[test]
    fn test_hysteresis_default_step() {
        let v = hysteresis_vector(1.0, None, 2).unwrap();
        assert_eq!(v.len(), hysteresis_len(101, 2));
        assert!(close(v[1], 0.01));
    }

    #[test]
    fn test_hysteresis_adjacent_steps_are_one_step() {
        let v = hysteresis_vector(0.5, Some(0.1), 3).unwrap();
        for w in v.windows(2) {
            assert!(close((w[1] - w[0]).abs(), 0.1), "jump {} -> {}", w[0], w[1]);
        }
    }

    #[test]
    fn test_hysteresis_overshoot_clamp() {
        let v = hysteresis_vector(5.2, Some(0.1), 1).unwrap();
        let max = v.iter().cloned().fold(f64::MIN, f64::max);
        assert!(close(max, 5.2), "no overshoot above the soft limit: {max}");
    }

    #[test]
    fn test_hysteresis_rejects_degenerate() {
        assert!(hysteresis_vector(0.0, None, 1).is_err());
        assert!(hysteresis_vector(-1.0, None, 1).is_err());
        assert!(hysteresis_vector(1.0, Some(0.0), 1).is_err());
        assert!(hysteresis_vector(1.0, Some(-0.1), 1).is_err());
        assert!(hysteresis_vector(6.0, None, 1).is_err(), "above hard limit");
    }

    #[test]
    fn test_tiny_steps_are_config_errors() {
        assert!(matches!(
            hysteresis_vector(1.0, Some(1e-300), 1),
            Err(MokeError::ConfigError(_))
        ));
        assert!(matches!(
            hysteresis_vector(1.0, Some(1e-6), 1),
            Err(MokeError::ConfigError(_))
        ));
        assert!(matches!(
            hysteresis_vector(1.0, Some(0.01), usize::MAX),
            Err(MokeError::ConfigError(_))
        ));
        assert!(matches!(
            linear_vector(0.0, 1.0, 1e-300),
            Err(MokeError::ConfigError(_))
        ));
        assert!(matches!(
            linear_vector(0.0, 1.0, 1e-7),
            Err(MokeError::ConfigError(_))
        ));
        assert_eq!(linear_vector(0.0, 1.0, 1e-6).unwrap().len(), MAX_SETPOINTS);
    }
}

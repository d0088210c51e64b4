// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{
    CHOPPER_THRESHOLD_V, DEFAULT_REPEATS, FIELD_OVERSHOOT_LIMIT_V, LIGHT_MM_PER_PS,
    MAX_FIELD_AMPLITUDE_V, ROUND_TRIP_FACTOR, STAGE_OFFSET_MM,
};
use crate::error::{MokeError, MokeResult};
use serde::{Deserialize, Serialize};

/// Top-level measurement configuration.
/// Every section except `acquisition` and `delay_line` is optional; a scan
/// needs at least one of `transient` / `hysteresis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transient: Option<TransientConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hysteresis: Option<HysteresisConfig>,
    /// Fluences (mJ/cm²) to set in order. Empty: measure once at the
    /// current fluence.
    #[serde(default)]
    pub fluences: Vec<f64>,
    #[serde(default)]
    pub delay_line: DelayLineConfig,
}

/// How a chopper split is judged acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    /// Both chopper states present.
    #[default]
    NonEmpty,
    /// Both present and equally many.
    EqualCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Samples per channel per AcquireAndSort.
    #[serde(default = "default_repeats")]
    pub repeats: usize,
    #[serde(default = "default_chopper_threshold")]
    pub chopper_threshold: f64,
    #[serde(default)]
    pub balance_policy: BalancePolicy,
    /// Give up on a leaf after this many malformed reads. `None` retries
    /// forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts_per_leaf: Option<u64>,
}

fn default_repeats() -> usize {
    DEFAULT_REPEATS
}
fn default_chopper_threshold() -> f64 {
    CHOPPER_THRESHOLD_V
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        AcquisitionConfig {
            repeats: default_repeats(),
            chopper_threshold: default_chopper_threshold(),
            balance_policy: BalancePolicy::default(),
            max_attempts_per_leaf: None,
        }
    }
}

/// One linear piece of a delay axis (ps).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelaySegment {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

/// Time-resolved MOKE traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransientConfig {
    /// Delay range (ps), ignored when `delay_segments` is given.
    #[serde(default)]
    pub delay_start: f64,
    #[serde(default)]
    pub delay_end: f64,
    #[serde(default)]
    pub delay_step: f64,
    /// Concatenated piecewise-linear delay axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_segments: Option<Vec<DelaySegment>>,
    /// Repeat count of the whole ±field delay sweep.
    pub loops: usize,
    /// Field supply amplitudes (V); one trace per entry.
    pub field_amplitudes: Vec<f64>,
}

/// Hysteresis sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HysteresisConfig {
    /// Half range of the field sweep (V).
    pub amplitude: f64,
    /// Resolution (V). Defaults to amplitude / 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Full down-up cycles.
    pub loop_count: usize,
    /// Delays relative to time zero (ps), one sweep each.
    #[serde(default)]
    pub delays_relative: Vec<f64>,
    /// Measure a sweep with the pump blocked first.
    #[serde(default)]
    pub static_loop: bool,
    #[serde(default = "default_max_amplitude")]
    pub max_amplitude: f64,
    #[serde(default = "default_overshoot_limit")]
    pub overshoot_limit: f64,
}

fn default_max_amplitude() -> f64 {
    MAX_FIELD_AMPLITUDE_V
}
fn default_overshoot_limit() -> f64 {
    FIELD_OVERSHOOT_LIMIT_V
}

/// Stage geometry: `t[ps] = x[mm] / c × round_trip + offset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayLineConfig {
    #[serde(default = "default_offset_mm")]
    pub offset_mm: f64,
    #[serde(default = "default_round_trip")]
    pub round_trip: f64,
    #[serde(default = "default_mm_per_ps")]
    pub mm_per_ps: f64,
    /// Pump-probe overlap (ps); hysteresis delays are relative to it.
    #[serde(default)]
    pub time_zero_ps: f64,
}

fn default_offset_mm() -> f64 {
    STAGE_OFFSET_MM
}
fn default_round_trip() -> f64 {
    ROUND_TRIP_FACTOR
}
fn default_mm_per_ps() -> f64 {
    LIGHT_MM_PER_PS
}

impl Default for DelayLineConfig {
    fn default() -> Self {
        DelayLineConfig {
            offset_mm: default_offset_mm(),
            round_trip: default_round_trip(),
            mm_per_ps: default_mm_per_ps(),
            time_zero_ps: 0.0,
        }
    }
}

fn finite(name: &str, v: f64) -> MokeResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(MokeError::ConfigError(format!("{name} must be finite, got {v}")))
    }
}

fn positive(name: &str, v: f64) -> MokeResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(MokeError::ConfigError(format!("{name} must be finite and > 0, got {v}")))
    }
}

impl ScanConfig {
    /// Load from JSON file.
    pub fn from_file(path: &str) -> MokeResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject degenerate parameters. Called before any hardware is touched.
    /// Vector-level checks (e.g. a delay range with zero points) happen when
    /// the setpoint vectors are built.
    pub fn validate(&self) -> MokeResult<()> {
        let acq = &self.acquisition;
        if acq.repeats == 0 {
            return Err(MokeError::ConfigError("repeats must be >= 1".to_string()));
        }
        finite("chopper_threshold", acq.chopper_threshold)?;
        if acq.max_attempts_per_leaf == Some(0) {
            return Err(MokeError::ConfigError(
                "max_attempts_per_leaf must be >= 1 when set".to_string(),
            ));
        }

        if self.transient.is_none() && self.hysteresis.is_none() {
            return Err(MokeError::ConfigError(
                "nothing to measure: neither transient nor hysteresis configured".to_string(),
            ));
        }

        if let Some(tr) = &self.transient {
            if tr.loops == 0 {
                return Err(MokeError::ConfigError("loops must be >= 1".to_string()));
            }
            if tr.field_amplitudes.is_empty() {
                return Err(MokeError::ConfigError(
                    "transient scan needs at least one field amplitude".to_string(),
                ));
            }
            for &a in &tr.field_amplitudes {
                finite("field_amplitude", a)?;
            }
            match &tr.delay_segments {
                Some(segs) if segs.is_empty() => {
                    return Err(MokeError::ConfigError("delay_segments is empty".to_string()));
                }
                Some(segs) => {
                    for s in segs {
                        finite("segment start", s.start)?;
                        finite("segment end", s.end)?;
                        finite("segment step", s.step)?;
                    }
                }
                None => {
                    finite("delay_start", tr.delay_start)?;
                    finite("delay_end", tr.delay_end)?;
                    finite("delay_step", tr.delay_step)?;
                }
            }
        }

        if let Some(h) = &self.hysteresis {
            positive("amplitude", h.amplitude)?;
            if let Some(step) = h.step {
                positive("step", step)?;
            }
            positive("max_amplitude", h.max_amplitude)?;
            positive("overshoot_limit", h.overshoot_limit)?;
            if h.amplitude > h.max_amplitude {
                return Err(MokeError::ConfigError(format!(
                    "hysteresis amplitude {} exceeds the field limit {}",
                    h.amplitude, h.max_amplitude
                )));
            }
            if h.delays_relative.is_empty() && !h.static_loop {
                return Err(MokeError::ConfigError(
                    "hysteresis needs a delay or static_loop = true".to_string(),
                ));
            }
            for &d in &h.delays_relative {
                finite("hysteresis delay", d)?;
            }
        }

        for &f in &self.fluences {
            positive("fluence", f)?;
        }

        let dl = &self.delay_line;
        finite("offset_mm", dl.offset_mm)?;
        positive("round_trip", dl.round_trip)?;
        positive("mm_per_ps", dl.mm_per_ps)?;
        finite("time_zero_ps", dl.time_zero_ps)?;
        Ok(())
    }
}

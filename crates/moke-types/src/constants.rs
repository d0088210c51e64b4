// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Chopper trigger mid-level (V). The trigger output swings between ~0 V and ~4 V.
pub const CHOPPER_THRESHOLD_V: f64 = 2.0;

/// Samples read per acquisition call.
pub const DEFAULT_REPEATS: usize = 200;

/// Speed of light in the delay-line convention of the instrument (mm/ps).
/// NOTE: the rounded 0.3 is what the stage calibration was done with; do not
/// replace it with 0.299792458 without re-measuring time zero.
pub const LIGHT_MM_PER_PS: f64 = 0.3;

/// Double pass through the retro-reflector.
pub const ROUND_TRIP_FACTOR: f64 = 2.0;

/// Stage zero offset (mm).
pub const STAGE_OFFSET_MM: f64 = 75.0;

/// Hard limit on the hysteresis amplitude (field supply volts).
pub const MAX_FIELD_AMPLITUDE_V: f64 = 5.5;

/// Above this peak the hysteresis ramp drops its overshoot step.
pub const FIELD_OVERSHOOT_LIMIT_V: f64 = 5.2;

/// Default hysteresis resolution as a fraction of the amplitude.
pub const HYSTERESIS_STEP_FRACTION: f64 = 0.01;

/// Fraction of the amplitude beyond which points count as saturated
/// for the hysteresis normalization.
pub const SATURATION_FRACTION: f64 = 0.8;

/// Decimal places used by the "light source off" check.
pub const SOURCE_OFF_DECIMALS: i32 = 4;

/// Upper bound on the length of any generated setpoint vector.
pub const MAX_SETPOINTS: usize = 1_000_000;

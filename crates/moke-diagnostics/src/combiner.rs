// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Differential Combiner
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! ±field combination of chopper-sorted averages.
//!
//! With `C` the chopper-low and `U` the chopper-high average:
//!
//! - `MOKE  = (C+ − U+) − (C− − U−)` (field-odd)
//! - `Total = (C+ − U+) + (C− − U−)` (field-even)
//!
//! Auxiliary diodes carry no magneto-optic information and are averaged
//! across polarities instead of differenced.

use moke_types::state::{ChopperSplit, CombinedSignal, PolaritySplits};

/// `(MOKE, Total)` from the four primary-channel averages.
pub fn moke_and_total(c_plus: f64, u_plus: f64, c_minus: f64, u_minus: f64) -> (f64, f64) {
    let plus = c_plus - u_plus;
    let minus = c_minus - u_minus;
    (plus - minus, plus + minus)
}

/// Polarity-averaged pump-probe difference of an auxiliary diode.
pub fn auxiliary(plus: &ChopperSplit, minus: &ChopperSplit) -> f64 {
    (plus.difference() + minus.difference()) / 2.0
}

/// Combine one polarity pair into the coordinate's scalars.
/// Inputs are expected to be valid splits.
pub fn combine(plus: &PolaritySplits, minus: &PolaritySplits) -> CombinedSignal {
    let (moke, total) = moke_and_total(
        plus.signal.low_avg,
        plus.signal.high_avg,
        minus.signal.low_avg,
        minus.signal.high_avg,
    );
    CombinedSignal {
        moke,
        total,
        reference: auxiliary(&plus.reference, &minus.reference),
        plus_diode: auxiliary(&plus.plus_diode, &minus.plus_diode),
        minus_diode: auxiliary(&plus.minus_diode, &minus.minus_diode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(low: f64, high: f64) -> ChopperSplit {
        ChopperSplit {
            low_avg: low,
            high_avg: high,
            low_count: 1,
            high_count: 1,
            valid: true,
        }
    }

    #[test]
    fn test_worked_example() {
        let (moke, total) = moke_and_total(5.0, 3.0, 4.0, 6.0);
        assert!((moke - 4.0).abs() < 1e-12, "MOKE = (5-3)-(4-6) = 4: {moke}");
        assert!(total.abs() < 1e-12, "Total = (5-3)+(4-6) = 0: {total}");
    }

    #[test]
    fn test_field_flip_negates_moke() {
        let (m1, t1) = moke_and_total(1.2, 0.7, 0.9, 0.1);
        let (m2, t2) = moke_and_total(0.9, 0.1, 1.2, 0.7);
        assert!((m1 + m2).abs() < 1e-12);
        assert!((t1 - t2).abs() < 1e-12);
    }

    #[test]
    fn test_auxiliary_is_averaged_not_differenced() {
        let plus = PolaritySplits {
            signal: split(5.0, 3.0),
            reference: split(2.0, 1.0),
            plus_diode: split(4.0, 0.0),
            minus_diode: split(1.0, 1.0),
        };
        let minus = PolaritySplits {
            signal: split(4.0, 6.0),
            reference: split(3.0, 0.0),
            plus_diode: split(0.0, 0.0),
            minus_diode: split(2.0, 0.0),
        };
        let out = combine(&plus, &minus);
        assert!((out.moke - 4.0).abs() < 1e-12);
        assert!(out.total.abs() < 1e-12);
        assert!((out.reference - 2.0).abs() < 1e-12, "(1 + 3) / 2: {}", out.reference);
        assert!((out.plus_diode - 2.0).abs() < 1e-12);
        assert!((out.minus_diode - 1.0).abs() < 1e-12);
    }
}

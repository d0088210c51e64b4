// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Property-Based Tests (proptest) for moke-diagnostics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for moke-diagnostics using proptest.
//!
//! Covers: chopper demultiplexing validity and exact subset means,
//! the MOKE/Total identity, loop-averager recursion.

use moke_diagnostics::averager::{smooth, LoopAverager};
use moke_diagnostics::combiner::moke_and_total;
use moke_diagnostics::demux::split_slices;
use moke_types::state::CombinedSignal;
use proptest::prelude::*;

const THRESHOLD: f64 = 2.0;

fn samples_and_chopper() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1usize..200).prop_flat_map(|n| {
        (
            prop::collection::vec(-10.0f64..10.0, n),
            prop::collection::vec(prop_oneof![0.0f64..1.99, 2.01f64..5.0, Just(2.0)], n),
        )
    })
}

// ── Chopper Demultiplexer ────────────────────────────────────────────

proptest! {
    /// With both states present the split is valid and the averages are
    /// the plain means of the two subsets.
    #[test]
    fn split_means_are_exact((s, c) in samples_and_chopper()) {
        let low: Vec<f64> = s.iter().zip(&c).filter(|(_, k)| **k < THRESHOLD).map(|(&s, _)| s).collect();
        let high: Vec<f64> = s.iter().zip(&c).filter(|(_, k)| **k > THRESHOLD).map(|(&s, _)| s).collect();
        let split = split_slices(&s, &c, THRESHOLD);

        prop_assert_eq!(split.low_count, low.len());
        prop_assert_eq!(split.high_count, high.len());
        prop_assert_eq!(split.valid, !low.is_empty() && !high.is_empty());
        if split.valid {
            let low_mean = low.iter().sum::<f64>() / low.len() as f64;
            let high_mean = high.iter().sum::<f64>() / high.len() as f64;
            prop_assert!((split.low_avg - low_mean).abs() < 1e-9);
            prop_assert!((split.high_avg - high_mean).abs() < 1e-9);
        } else {
            prop_assert_eq!(split.low_avg, 0.0);
            prop_assert_eq!(split.high_avg, 0.0);
        }
    }

    /// A chopper trace confined to one side is never valid.
    #[test]
    fn one_sided_chopper_is_invalid(
        s in prop::collection::vec(-10.0f64..10.0, 0..100),
        above in any::<bool>(),
    ) {
        let level = if above { 4.5 } else { 0.3 };
        let c = vec![level; s.len()];
        prop_assert!(!split_slices(&s, &c, THRESHOLD).valid);
    }
}

// ── Differential Combiner ────────────────────────────────────────────

proptest! {
    /// MOKE + Total = 2 (C+ − U+).
    #[test]
    fn moke_plus_total_is_twice_plus_difference(
        cp in -10.0f64..10.0,
        up in -10.0f64..10.0,
        cm in -10.0f64..10.0,
        um in -10.0f64..10.0,
    ) {
        let (moke, total) = moke_and_total(cp, up, cm, um);
        prop_assert!((moke + total - 2.0 * (cp - up)).abs() < 1e-9);
    }
}

// ── Loop Averager ────────────────────────────────────────────────────

fn signal(v: f64) -> CombinedSignal {
    CombinedSignal {
        moke: v,
        total: 2.0 * v,
        reference: -v,
        plus_diode: v + 1.0,
        minus_diode: v - 1.0,
    }
}

proptest! {
    /// Feeding the stored value again leaves it unchanged.
    #[test]
    fn averager_constant_is_fixed_point(v in -100.0f64..100.0, passes in 1usize..40) {
        let mut avg = LoopAverager::new(1);
        for _ in 0..passes {
            avg.accumulate(0, signal(v)).unwrap();
        }
        let got = avg.get(0).unwrap();
        prop_assert!((got.moke - v).abs() < 1e-12);
        prop_assert!((got.total - 2.0 * v).abs() < 1e-12);
        prop_assert_eq!(avg.passes(0), passes);
    }

    /// Alternating inputs follow the literal recursion.
    #[test]
    fn averager_matches_recursion(
        a in -50.0f64..50.0,
        b in -50.0f64..50.0,
        n in 1usize..=50,
    ) {
        let mut avg = LoopAverager::new(3);
        let mut expected = a;
        for k in 0..n {
            let v = if k % 2 == 0 { a } else { b };
            if k > 0 {
                expected = smooth(expected, v);
            }
            avg.accumulate(1, signal(v)).unwrap();
        }
        let got = avg.get(1).unwrap();
        prop_assert!((got.moke - expected).abs() < 1e-9);
        prop_assert!((got.minus_diode - (expected - 1.0)).abs() < 1e-9);
        prop_assert!(avg.get(0).is_none());
    }
}

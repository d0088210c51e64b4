// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Property-Based Tests (proptest) for moke-control
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for moke-control using proptest.
//!
//! Covers: triangular hysteresis vectors, linear delay vectors, progress
//! monotonicity, delay-line inversion, and scan order under random
//! malformed reads.

use moke_control::instrument::DelayLine;
use moke_control::progress::{progress, ScanExtents};
use moke_control::scan::{ScanOrchestrator, ScanStatus, StepOutcome};
use moke_control::setpoints::{hysteresis_len, hysteresis_vector, linear_vector};
use moke_control::sim::{Fault, SimulatedRig};
use moke_types::config::{AcquisitionConfig, DelayLineConfig, ScanConfig, TransientConfig};
use moke_types::constants::FIELD_OVERSHOOT_LIMIT_V;
use proptest::prelude::*;

// ── Hysteresis Vector ────────────────────────────────────────────────

proptest! {
    /// First element 0, length formula, and the lattice is symmetric about zero.
    #[test]
    fn hysteresis_shape(
        amplitude in 0.1f64..4.0,
        divisions in 2usize..60,
        loops in 0usize..4,
    ) {
        let step = amplitude / divisions as f64;
        let v = hysteresis_vector(amplitude, Some(step), loops).unwrap();
        let n = if amplitude + step > FIELD_OVERSHOOT_LIMIT_V {
            divisions
        } else {
            divisions + 1
        };
        prop_assert_eq!(v.len(), hysteresis_len(n, loops));
        prop_assert!((v[n] - n as f64 * step).abs() < 1e-9, "ramp peak at index {}", n);
        prop_assert_eq!(v[0], 0.0);
        prop_assert!(v.last().unwrap().abs() < 1e-12);

        let max = v.iter().cloned().fold(f64::MIN, f64::max);
        let min = v.iter().cloned().fold(f64::MAX, f64::min);
        if loops > 0 {
            prop_assert!((max + min).abs() < 1e-9, "asymmetric: {} / {}", max, min);
        }
        prop_assert!(max >= amplitude - 1e-9);
        for w in v.windows(2) {
            prop_assert!(((w[1] - w[0]).abs() - step).abs() < 1e-9);
        }
    }

    /// Degenerate amplitude or step never yields a vector.
    #[test]
    fn hysteresis_rejects_nonpositive(amplitude in -5.0f64..=0.0, step in -1.0f64..=0.0) {
        prop_assert!(hysteresis_vector(amplitude, None, 1).is_err());
        prop_assert!(hysteresis_vector(1.0, Some(step), 1).is_err());
    }
}

// ── Linear Vector ────────────────────────────────────────────────────

proptest! {
    /// Endpoints included, spacing uniform, count as rounded.
    #[test]
    fn linear_vector_endpoints(start in -500.0f64..500.0, span in 1.0f64..1000.0, count in 2usize..200) {
        let step = span / count as f64;
        let v = linear_vector(start, start + span, step).unwrap();
        prop_assert_eq!(v.len(), count);
        prop_assert_eq!(v[0], start);
        prop_assert_eq!(*v.last().unwrap(), start + span);
        let spacing = span / (count - 1) as f64;
        for w in v.windows(2) {
            prop_assert!((w[1] - w[0] - spacing).abs() < 1e-6);
        }
    }
}

// ── Progress ─────────────────────────────────────────────────────────

proptest! {
    /// Overall progress never decreases and reaches 100 only at the end.
    #[test]
    fn progress_monotonic(
        fluences in 1usize..4,
        sweeps in 0usize..3,
        points in 1usize..20,
        fields in 0usize..3,
        delays in 1usize..10,
        loops in 1usize..4,
    ) {
        let e = ScanExtents {
            fluences,
            hysteresis_sweeps: sweeps,
            hysteresis_points: points,
            field_points: fields,
            polarities: 2,
            delays,
            loops,
        };
        let total = e.total_leaves();
        let mut prev = 0.0;
        for c in 0..=total {
            let p = progress(&e, c);
            prop_assert!(p.overall >= prev);
            prop_assert!(p.sub_scan > 0.0 || c == 0);
            prop_assert!(p.sub_scan <= 100.0);
            if c < total {
                prop_assert!(p.overall < 100.0);
            }
            prev = p.overall;
        }
        prop_assert_eq!(progress(&e, total).overall, 100.0);
    }
}

// ── Delay Line ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn delay_line_inverts(
        ps in -1e4f64..1e4,
        offset in -200.0f64..200.0,
        round_trip in 1.0f64..8.0,
    ) {
        let dl = DelayLine { offset_mm: offset, round_trip, mm_per_ps: 0.3 };
        prop_assert!((dl.to_delay_ps(dl.to_stage_mm(ps)) - ps).abs() < 1e-6);
    }
}

// ── Scan Order Under Malformed Reads ─────────────────────────────────

fn small_transient() -> ScanConfig {
    ScanConfig {
        acquisition: AcquisitionConfig {
            repeats: 8,
            ..AcquisitionConfig::default()
        },
        transient: Some(TransientConfig {
            delay_start: 480.0,
            delay_end: 560.0,
            delay_step: 20.0,
            delay_segments: None,
            loops: 2,
            field_amplitudes: vec![1.0],
        }),
        hysteresis: None,
        fluences: vec![],
        delay_line: DelayLineConfig::default(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Retries never change which coordinates are visited, or in what order.
    #[test]
    fn retries_do_not_change_visit_order(
        bad in prop::collection::btree_set(1usize..60, 0..20),
        seed in any::<u64>(),
    ) {
        let clean_rig = SimulatedRig::new(seed).unwrap();
        let mut clean = ScanOrchestrator::new(&small_transient(), clean_rig.collaborators()).unwrap();
        let mut expected = Vec::new();
        loop {
            match clean.step().unwrap() {
                StepOutcome::LeafCompleted { coordinate, .. } => expected.push((coordinate.field_value, coordinate.delay_index)),
                StepOutcome::Finished(s) => { prop_assert_eq!(s, ScanStatus::Completed); break; }
                _ => {}
            }
        }

        let rig = SimulatedRig::new(seed).unwrap();
        for &n in &bad {
            rig.inject_at(n, Fault::ChopperStuck);
        }
        let mut scan = ScanOrchestrator::new(&small_transient(), rig.collaborators()).unwrap();
        let mut visited = Vec::new();
        let mut retries = 0u64;
        loop {
            match scan.step().unwrap() {
                StepOutcome::LeafCompleted { coordinate, .. } => visited.push((coordinate.field_value, coordinate.delay_index)),
                StepOutcome::Retried { .. } => retries += 1,
                StepOutcome::Finished(s) => { prop_assert_eq!(s, ScanStatus::Completed); break; }
                _ => {}
            }
        }
        prop_assert_eq!(visited, expected);
        prop_assert_eq!(retries, scan.context().total_retries);
        prop_assert_eq!(rig.state().records.len(), 4 * 2, "4 delays × 2 loops");
    }
}

// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Loop Averager
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! Per-coordinate accumulation across loop passes.
//!
//! Pass 1 stores the raw value; every later pass replaces it with
//! `(stored + new) / 2`. This is a recursive smoothing, not a running
//! mean: the weight of early passes decays geometrically. Downstream
//! analysis expects exactly this rule.

use moke_types::error::{MokeError, MokeResult};
use moke_types::state::CombinedSignal;

/// One step of the recursive smoothing rule.
#[inline]
pub fn smooth(stored: f64, new: f64) -> f64 {
    (stored + new) / 2.0
}

fn smooth_signal(stored: &CombinedSignal, new: &CombinedSignal) -> CombinedSignal {
    CombinedSignal {
        moke: smooth(stored.moke, new.moke),
        total: smooth(stored.total, new.total),
        reference: smooth(stored.reference, new.reference),
        plus_diode: smooth(stored.plus_diode, new.plus_diode),
        minus_diode: smooth(stored.minus_diode, new.minus_diode),
    }
}

/// Accumulated signal for every delay index of one transient trace.
#[derive(Debug, Clone, Default)]
pub struct LoopAverager {
    slots: Vec<Option<CombinedSignal>>,
    passes: Vec<usize>,
}

impl LoopAverager {
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
            passes: vec![0; len],
        }
    }

    /// Fold one loop pass into the slot and return the updated accumulator.
    pub fn accumulate(&mut self, index: usize, value: CombinedSignal) -> MokeResult<CombinedSignal> {
        let len = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            MokeError::ConfigError(format!("delay index {index} out of range for {len} points"))
        })?;
        let updated = match slot {
            None => value,
            Some(stored) => smooth_signal(stored, &value),
        };
        *slot = Some(updated);
        self.passes[index] += 1;
        Ok(updated)
    }

    pub fn get(&self, index: usize) -> Option<&CombinedSignal> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn passes(&self, index: usize) -> usize {
        self.passes.get(index).copied().unwrap_or(0)
    }

    /// Loops that finished for every slot.
    pub fn complete_passes(&self) -> usize {
        self.passes.iter().copied().min().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn trace(&self) -> &[Option<CombinedSignal>] {
        &self.slots
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.passes.iter_mut().for_each(|p| *p = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moke(v: f64) -> CombinedSignal {
        CombinedSignal {
            moke: v,
            total: -v,
            ..CombinedSignal::default()
        }
    }

    #[test]
    fn test_first_pass_stores_raw() {
        let mut avg = LoopAverager::new(3);
        let out = avg.accumulate(1, moke(4.0)).unwrap();
        assert_eq!(out.moke, 4.0);
        assert_eq!(avg.passes(1), 1);
        assert!(avg.get(0).is_none());
    }

    #[test]
    fn test_recursive_rule_not_true_mean() {
        let mut avg = LoopAverager::new(1);
        avg.accumulate(0, moke(0.0)).unwrap();
        avg.accumulate(0, moke(0.0)).unwrap();
        let out = avg.accumulate(0, moke(3.0)).unwrap();
        // true mean would be 1.0
        assert!((out.moke - 1.5).abs() < 1e-12, "((0+0)/2+3)/2 = 1.5: {}", out.moke);
        assert!((out.total + 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_index() {
        let mut avg = LoopAverager::new(2);
        assert!(avg.accumulate(2, moke(1.0)).is_err());
    }

    #[test]
    fn test_complete_passes_and_clear() {
        let mut avg = LoopAverager::new(2);
        avg.accumulate(0, moke(1.0)).unwrap();
        assert_eq!(avg.complete_passes(), 0);
        avg.accumulate(1, moke(1.0)).unwrap();
        avg.accumulate(0, moke(1.0)).unwrap();
        assert_eq!(avg.complete_passes(), 1);
        avg.clear();
        assert!(avg.trace().iter().all(Option::is_none));
        assert_eq!(avg.complete_passes(), 0);
    }
}

// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Progress Tracker
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! Completed-leaf count → sub-scan and overall percentages.
//!
//! Per fluence the scan runs `hysteresis_sweeps` sweeps of
//! `hysteresis_points` leaves each, then `field_points` transient traces of
//! `polarities × delays × loops` leaves each.

/// Axis extents of a planned scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanExtents {
    pub fluences: usize,
    pub hysteresis_sweeps: usize,
    pub hysteresis_points: usize,
    pub field_points: usize,
    pub polarities: usize,
    pub delays: usize,
    pub loops: usize,
}

impl ScanExtents {
    pub fn transient_leaves(&self) -> usize {
        self.polarities * self.delays * self.loops
    }

    pub fn sub_scans_per_fluence(&self) -> usize {
        self.hysteresis_sweeps + self.field_points
    }

    pub fn leaves_per_fluence(&self) -> usize {
        self.hysteresis_sweeps * self.hysteresis_points + self.field_points * self.transient_leaves()
    }

    pub fn total_leaves(&self) -> usize {
        self.fluences * self.leaves_per_fluence()
    }

    pub fn total_sub_scans(&self) -> usize {
        self.fluences * self.sub_scans_per_fluence()
    }

    /// Leaf count of the `k`-th sub-scan within a fluence.
    fn sub_scan_len(&self, k: usize) -> usize {
        if k < self.hysteresis_sweeps {
            self.hysteresis_points
        } else {
            self.transient_leaves()
        }
    }
}

/// Completion of a running scan, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub sub_scan: f64,
    pub overall: f64,
    /// Global index of the sub-scan the last completed leaf belongs to.
    pub sub_scan_index: usize,
    pub sub_scan_count: usize,
}

/// Progress after `completed` leaves.
///
/// The last completed leaf determines the current sub-scan, so a sub-scan
/// reads 100 % on its final leaf. `completed` beyond the total is clamped.
pub fn progress(extents: &ScanExtents, completed: usize) -> Progress {
    let total = extents.total_leaves();
    let sub_scan_count = extents.total_sub_scans();
    if total == 0 {
        return Progress {
            sub_scan: 100.0,
            overall: 100.0,
            sub_scan_index: 0,
            sub_scan_count,
        };
    }
    let completed = completed.min(total);
    let overall = 100.0 * completed as f64 / total as f64;
    if completed == 0 {
        return Progress {
            sub_scan: 0.0,
            overall,
            sub_scan_index: 0,
            sub_scan_count,
        };
    }

    let per_fluence = extents.leaves_per_fluence();
    let last = completed - 1;
    let fluence = last / per_fluence;
    let mut offset = last % per_fluence;
    let mut k = 0;
    // Empty sub-scans (zero-length) never hold a leaf.
    while k < extents.sub_scans_per_fluence() {
        let len = extents.sub_scan_len(k);
        if offset < len {
            break;
        }
        offset -= len;
        k += 1;
    }
    let len = extents.sub_scan_len(k).max(1);
    Progress {
        sub_scan: 100.0 * (offset + 1) as f64 / len as f64,
        overall,
        sub_scan_index: fluence * extents.sub_scans_per_fluence() + k,
        sub_scan_count,
    }
}

// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Scan Orchestrator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Step-driven state machine for fluence × field × delay scans.
//!
//! Nesting, outermost first:
//!
//! ```text
//! fluence
//!   sub-scan  (static hysteresis, hysteresis per delay, transient per field amplitude)
//!     transient: loop → polarity (+, −) → delay → acquire-and-sort
//!     hysteresis: field point → acquire-and-sort
//! ```
//!
//! Each call to [`ScanOrchestrator::step`] performs at most one blocking
//! hardware interaction group and returns what happened. A malformed read
//! (chopper split rejected by the balance policy) retries the same leaf on
//! the next step without re-issuing motion or field writes.
//!
//! Delay traversal alternates with the polarity pass: + passes run forward,
//! − passes reversed, so the stage never jumps back across the whole range.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use moke_diagnostics::averager::LoopAverager;
use moke_diagnostics::combiner::combine;
use moke_diagnostics::demux::{accepts, accepts_all, channel_mean, demultiplex_reduced, source_appears_off};
use moke_diagnostics::hysteresis::moke_amplitude;
use moke_types::config::{AcquisitionConfig, ScanConfig};
use moke_types::error::{MokeError, MokeResult};
use moke_types::state::{
    Channel, ChopperSplit, HysteresisRecord, Polarity, PolaritySplits, ScanCoordinate, ScanRecord,
    SubScanKind, SubScanSummary, TransientRecord,
};

use crate::instrument::{Axis, Collaborators, DelayLine};
use crate::progress::{progress, Progress, ScanExtents};
use crate::setpoints::{absolute_delays, hysteresis_from_config, linear_vector, segmented_vector};

/// Setpoint vectors and sub-scan order, fixed at construction.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    /// `None`: a single pass at whatever fluence is set.
    pub fluences: Vec<Option<f64>>,
    /// Sub-scans run for every fluence, in this order.
    pub sub_scans: Vec<SubScanKind>,
    pub hysteresis_fields: Vec<f64>,
    pub hysteresis_amplitude: f64,
    pub delays_ps: Vec<f64>,
    pub loops: usize,
}

impl ScanPlan {
    /// Validate the configuration and build every setpoint vector.
    pub fn from_config(config: &ScanConfig) -> MokeResult<Self> {
        config.validate()?;

        let fluences = if config.fluences.is_empty() {
            vec![None]
        } else {
            config.fluences.iter().copied().map(Some).collect()
        };

        let mut sub_scans = Vec::new();
        let mut hysteresis_fields = Vec::new();
        let mut hysteresis_amplitude = 0.0;
        if let Some(h) = &config.hysteresis {
            hysteresis_fields = hysteresis_from_config(h)?;
            hysteresis_amplitude = h.amplitude;
            if h.static_loop {
                sub_scans.push(SubScanKind::StaticHysteresis);
            }
            for delay_ps in absolute_delays(config.delay_line.time_zero_ps, &h.delays_relative) {
                sub_scans.push(SubScanKind::Hysteresis { delay_ps });
            }
        }

        let mut delays_ps = Vec::new();
        let mut loops = 0;
        if let Some(t) = &config.transient {
            delays_ps = match &t.delay_segments {
                Some(segments) => segmented_vector(segments)?,
                None => linear_vector(t.delay_start, t.delay_end, t.delay_step)?,
            };
            loops = t.loops;
            for &field_amplitude in &t.field_amplitudes {
                sub_scans.push(SubScanKind::Transient { field_amplitude });
            }
        }

        Ok(Self {
            fluences,
            sub_scans,
            hysteresis_fields,
            hysteresis_amplitude,
            delays_ps,
            loops,
        })
    }

    pub fn hysteresis_sweeps(&self) -> usize {
        self.sub_scans
            .iter()
            .filter(|k| !matches!(k, SubScanKind::Transient { .. }))
            .count()
    }

    /// Leaves (successful acquisitions) in one sub-scan of this kind.
    pub fn leaves_in(&self, kind: &SubScanKind) -> usize {
        match kind {
            SubScanKind::Transient { .. } => 2 * self.delays_ps.len() * self.loops,
            _ => self.hysteresis_fields.len(),
        }
    }

    pub fn extents(&self) -> ScanExtents {
        let hysteresis_sweeps = self.hysteresis_sweeps();
        ScanExtents {
            fluences: self.fluences.len(),
            hysteresis_sweeps,
            hysteresis_points: self.hysteresis_fields.len(),
            field_points: self.sub_scans.len() - hysteresis_sweeps,
            polarities: 2,
            delays: self.delays_ps.len(),
            loops: self.loops,
        }
    }
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Completed,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    EnterFluence,
    EnterSubScan,
    Leaf,
    Terminal(ScanStatus),
}

/// Result of one [`ScanOrchestrator::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    FluenceApplied {
        fluence_index: usize,
        fluence: Option<f64>,
    },
    SubScanStarted {
        index: usize,
        kind: SubScanKind,
    },
    /// Field written for a new polarity pass of a transient sub-scan.
    PolarityApplied {
        loop_index: usize,
        polarity: Polarity,
        field: f64,
    },
    /// Read rejected; the same leaf is attempted again on the next step.
    Retried {
        attempt: u64,
        low: usize,
        high: usize,
    },
    LeafCompleted {
        coordinate: ScanCoordinate,
        /// Persisted record, if this leaf produced one. + leaves of a
        /// transient only stage their splits.
        record: Option<ScanRecord>,
        progress: Progress,
    },
    SubScanCompleted {
        summary: SubScanSummary,
        progress: Progress,
    },
    Finished(ScanStatus),
}

/// Cooperative cancellation flag. Clone it into whatever may request a stop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mutable bookkeeping of the running scan.
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    pub fluence_index: usize,
    /// Index into [`ScanPlan::sub_scans`].
    pub sub_scan_index: usize,
    /// Next leaf of the current sub-scan.
    pub leaf_index: usize,
    /// Malformed reads of the current leaf.
    pub attempts: u64,
    pub total_retries: u64,
    pub completed_leaves: usize,
    pub averager: LoopAverager,
    /// + splits and field-monitor mean, per delay index, awaiting the − pass.
    pub plus_splits: Vec<Option<(PolaritySplits, Option<f64>)>>,
    /// (field setpoint, chopper-low signal) of the current hysteresis sweep.
    pub hysteresis_points: Vec<(f64, f64)>,
    /// Hysteresis delay index and readback delay of the current sweep.
    pub sweep_delay: Option<(usize, f64)>,
    /// Setpoints already issued for the current leaf.
    prepared: Option<ScanCoordinate>,
    /// Polarity pass whose field is currently applied.
    field_pass: Option<usize>,
    sub_scan_active: bool,
    shutter_blocked: bool,
    source_alerted: bool,
}

/// Drives one scan over the instrument collaborators.
pub struct ScanOrchestrator {
    plan: ScanPlan,
    acquisition: AcquisitionConfig,
    delay_line: DelayLine,
    devices: Collaborators,
    extents: ScanExtents,
    ctx: ScanContext,
    phase: Phase,
    stop: StopHandle,
}

impl ScanOrchestrator {
    /// Build the plan. Any configuration error is returned here, before any
    /// collaborator is touched.
    pub fn new(config: &ScanConfig, devices: Collaborators) -> MokeResult<Self> {
        let plan = ScanPlan::from_config(config)?;
        let extents = plan.extents();
        info!(
            "scan planned: {} fluence(s), {} sub-scan(s) each, {} leaves",
            extents.fluences,
            extents.sub_scans_per_fluence(),
            extents.total_leaves()
        );
        Ok(Self {
            plan,
            acquisition: config.acquisition.clone(),
            delay_line: DelayLine::from(&config.delay_line),
            devices,
            extents,
            ctx: ScanContext::default(),
            phase: Phase::EnterFluence,
            stop: StopHandle::default(),
        })
    }

    pub fn plan(&self) -> &ScanPlan {
        &self.plan
    }

    pub fn extents(&self) -> ScanExtents {
        self.extents
    }

    pub fn context(&self) -> &ScanContext {
        &self.ctx
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn progress(&self) -> Progress {
        progress(&self.extents, self.ctx.completed_leaves)
    }

    /// `Some` once the scan has reached a terminal state.
    pub fn status(&self) -> Option<ScanStatus> {
        match self.phase {
            Phase::Terminal(status) => Some(status),
            _ => None,
        }
    }

    /// Advance the scan by one unit of work.
    ///
    /// A collaborator error aborts the scan: the partial sub-scan is flushed,
    /// the field zeroed and every device closed before the error is returned.
    pub fn step(&mut self) -> MokeResult<StepOutcome> {
        if let Phase::Terminal(_) = self.phase {
            return Err(MokeError::ScanFinished);
        }
        if self.stop.is_stopped() {
            return self.unwind();
        }
        match self.advance() {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.abort(&err);
                Err(err)
            }
        }
    }

    /// Step until a terminal state.
    pub fn run_to_completion(&mut self) -> MokeResult<ScanStatus> {
        loop {
            if let StepOutcome::Finished(status) = self.step()? {
                return Ok(status);
            }
        }
    }

    fn advance(&mut self) -> MokeResult<StepOutcome> {
        match self.phase {
            Phase::EnterFluence => self.enter_fluence(),
            Phase::EnterSubScan => self.enter_sub_scan(),
            Phase::Leaf => self.leaf(),
            Phase::Terminal(_) => Err(MokeError::ScanFinished),
        }
    }

    fn enter_fluence(&mut self) -> MokeResult<StepOutcome> {
        let index = self.ctx.fluence_index;
        let Some(&fluence) = self.plan.fluences.get(index) else {
            self.shutdown()?;
            self.phase = Phase::Terminal(ScanStatus::Completed);
            info!(
                "scan completed: {} leaves, {} retries",
                self.ctx.completed_leaves, self.ctx.total_retries
            );
            return Ok(StepOutcome::Finished(ScanStatus::Completed));
        };

        if let Some(value) = fluence {
            // pump blocked while the attenuator moves
            self.devices.shutter.set_blocked(true)?;
            self.devices.fluence.set_fluence(value)?;
            self.devices.shutter.set_blocked(false)?;
            info!("fluence {}/{}: {value}", index + 1, self.plan.fluences.len());
        }
        self.ctx.sub_scan_index = 0;
        self.phase = Phase::EnterSubScan;
        Ok(StepOutcome::FluenceApplied {
            fluence_index: index,
            fluence,
        })
    }

    fn enter_sub_scan(&mut self) -> MokeResult<StepOutcome> {
        let Some(&kind) = self.plan.sub_scans.get(self.ctx.sub_scan_index) else {
            self.ctx.fluence_index += 1;
            self.phase = Phase::EnterFluence;
            return self.enter_fluence();
        };

        let mut sweep_delay = None;
        match kind {
            SubScanKind::StaticHysteresis => {
                self.devices.shutter.set_blocked(true)?;
                self.ctx.shutter_blocked = true;
            }
            SubScanKind::Hysteresis { delay_ps } => {
                let readback = self
                    .devices
                    .motion
                    .move_to(Axis::DelayStage, self.delay_line.to_stage_mm(delay_ps))?;
                let has_static = self.plan.sub_scans.first() == Some(&SubScanKind::StaticHysteresis);
                let index = self.ctx.sub_scan_index - usize::from(has_static);
                sweep_delay = Some((index, self.delay_line.to_delay_ps(readback)));
            }
            SubScanKind::Transient { .. } => {}
        }

        let delays = self.plan.delays_ps.len();
        let ctx = &mut self.ctx;
        ctx.leaf_index = 0;
        ctx.attempts = 0;
        ctx.prepared = None;
        ctx.field_pass = None;
        ctx.source_alerted = false;
        ctx.sweep_delay = sweep_delay;
        ctx.hysteresis_points.clear();
        match kind {
            SubScanKind::Transient { .. } => {
                ctx.averager = LoopAverager::new(delays);
                ctx.plus_splits = vec![None; delays];
            }
            _ => {
                ctx.averager = LoopAverager::new(0);
                ctx.plus_splits.clear();
            }
        }
        ctx.sub_scan_active = true;

        let index = self.global_sub_scan_index();
        info!(
            "sub-scan {}/{} started: {kind:?}",
            index + 1,
            self.extents.total_sub_scans()
        );
        self.phase = Phase::Leaf;
        Ok(StepOutcome::SubScanStarted { index, kind })
    }

    fn leaf(&mut self) -> MokeResult<StepOutcome> {
        let kind = self.current_kind()?;
        if self.ctx.leaf_index >= self.plan.leaves_in(&kind) {
            return self.finish_sub_scan(kind);
        }
        match kind {
            SubScanKind::Transient { field_amplitude } => self.transient_leaf(field_amplitude),
            _ => self.hysteresis_leaf(),
        }
    }

    fn transient_leaf(&mut self, amplitude: f64) -> MokeResult<StepOutcome> {
        let d = self.plan.delays_ps.len();
        let pass = self.ctx.leaf_index / d;
        let slot = self.ctx.leaf_index % d;
        let polarity = if pass % 2 == 0 { Polarity::Plus } else { Polarity::Minus };
        let loop_index = pass / 2 + 1;
        let field = polarity.sign() * amplitude;

        if self.ctx.field_pass != Some(pass) {
            self.devices.field.write(Axis::FieldCoil, field)?;
            self.ctx.field_pass = Some(pass);
            debug!("loop {loop_index}: field {field:+} ({polarity:?})");
            return Ok(StepOutcome::PolarityApplied {
                loop_index,
                polarity,
                field,
            });
        }

        let delay_index = match polarity {
            Polarity::Plus => slot,
            Polarity::Minus => d - 1 - slot,
        };
        let coordinate = match self.ctx.prepared {
            Some(c) => c,
            None => {
                let target = self.plan.delays_ps[delay_index];
                let readback = self
                    .devices
                    .motion
                    .move_to(Axis::DelayStage, self.delay_line.to_stage_mm(target))?;
                let c = ScanCoordinate {
                    fluence_index: self.ctx.fluence_index,
                    field_index: self.ctx.sub_scan_index - self.plan.hysteresis_sweeps(),
                    field_value: field,
                    delay_index,
                    delay_ps: Some(self.delay_line.to_delay_ps(readback)),
                };
                self.ctx.prepared = Some(c);
                c
            }
        };

        let (splits, measured_field) = match self.acquire_and_sort()? {
            Ok(read) => read,
            Err(rejected) => return self.retry(&rejected),
        };

        let record = match polarity {
            Polarity::Plus => {
                self.ctx.plus_splits[delay_index] = Some((splits, measured_field));
                None
            }
            Polarity::Minus => {
                let (plus, plus_field) = self.ctx.plus_splits[delay_index].take().ok_or_else(|| {
                    MokeError::ConfigError(format!("no + read staged for delay index {delay_index}"))
                })?;
                let raw = combine(&plus, &splits);
                let averaged = self.ctx.averager.accumulate(delay_index, raw)?;
                let record = ScanRecord::Transient(TransientRecord {
                    fluence: self.current_fluence(),
                    field_amplitude: amplitude,
                    delay_index,
                    delay_ps: coordinate.delay_ps.unwrap_or(self.plan.delays_ps[delay_index]),
                    loop_index,
                    moke_signal: raw.moke,
                    total_signal: raw.total,
                    reference_signal: raw.reference,
                    plus_diode_signal: raw.plus_diode,
                    minus_diode_signal: raw.minus_diode,
                    moke_average: averaged.moke,
                    total_average: averaged.total,
                    measured_field: plus_field,
                });
                self.devices.persistence.append(&record)?;
                Some(record)
            }
        };
        Ok(self.complete_leaf(coordinate, record))
    }

    fn hysteresis_leaf(&mut self) -> MokeResult<StepOutcome> {
        let point_index = self.ctx.leaf_index;
        let setpoint = self.plan.hysteresis_fields[point_index];
        let coordinate = match self.ctx.prepared {
            Some(c) => c,
            None => {
                self.devices.field.write(Axis::FieldCoil, setpoint)?;
                let (delay_index, delay_ps) = match self.ctx.sweep_delay {
                    Some((i, ps)) => (i, Some(ps)),
                    None => (0, None),
                };
                let c = ScanCoordinate {
                    fluence_index: self.ctx.fluence_index,
                    field_index: point_index,
                    field_value: setpoint,
                    delay_index,
                    delay_ps,
                };
                self.ctx.prepared = Some(c);
                c
            }
        };

        let (splits, measured_field) = match self.acquire_and_sort()? {
            Ok(read) => read,
            Err(rejected) => return self.retry(&rejected),
        };

        self.ctx.hysteresis_points.push((setpoint, splits.signal.low_avg));
        let record = ScanRecord::Hysteresis(HysteresisRecord {
            fluence: self.current_fluence(),
            delay_ps: coordinate.delay_ps,
            point_index,
            field_setpoint: setpoint,
            signal_low: splits.signal.low_avg,
            signal_high: splits.signal.high_avg,
            reference_low: splits.reference.low_avg,
            reference_high: splits.reference.high_avg,
            plus_diode_low: splits.plus_diode.low_avg,
            plus_diode_high: splits.plus_diode.high_avg,
            minus_diode_low: splits.minus_diode.low_avg,
            minus_diode_high: splits.minus_diode.high_avg,
            measured_field,
        });
        self.devices.persistence.append(&record)?;
        Ok(self.complete_leaf(coordinate, Some(record)))
    }

    /// Acquire one batch and demultiplex the reduced channels.
    ///
    /// Inner `Err` carries the first split the balance policy rejected.
    /// A zero chopper-high reference raises the light-source alert, at most
    /// once per sub-scan; the read itself is still accepted.
    fn acquire_and_sort(&mut self) -> MokeResult<Result<(PolaritySplits, Option<f64>), ChopperSplit>> {
        let batch = self
            .devices
            .acquisition
            .acquire(&Channel::ALL, self.acquisition.repeats)?;
        let splits = demultiplex_reduced(&batch, self.acquisition.chopper_threshold)?;
        let policy = self.acquisition.balance_policy;
        if !accepts_all(&splits, policy) {
            let rejected = [splits.signal, splits.reference, splits.plus_diode, splits.minus_diode]
                .into_iter()
                .find(|s| !accepts(s, policy))
                .unwrap_or(splits.signal);
            return Ok(Err(rejected));
        }
        if source_appears_off(&splits.reference) && !self.ctx.source_alerted {
            self.ctx.source_alerted = true;
            warn!("reference diode reads zero: light source appears off");
            self.devices
                .notifier
                .notify("Laser appears to be off: reference diode reads zero.");
        }
        Ok(Ok((splits, channel_mean(&batch, Channel::FieldMonitor))))
    }

    fn retry(&mut self, rejected: &ChopperSplit) -> MokeResult<StepOutcome> {
        self.ctx.attempts += 1;
        self.ctx.total_retries += 1;
        let attempt = self.ctx.attempts;
        let (low, high) = (rejected.low_count, rejected.high_count);
        if attempt == 1 {
            warn!(
                "leaf {} of sub-scan {}: chopper split rejected ({low} low / {high} high), retrying",
                self.ctx.leaf_index,
                self.global_sub_scan_index() + 1
            );
        } else {
            debug!("retry {attempt}: {low} low / {high} high");
        }
        if let Some(cap) = self.acquisition.max_attempts_per_leaf {
            if attempt >= cap {
                return Err(MokeError::SampleImbalance {
                    attempts: attempt,
                    low,
                    high,
                });
            }
        }
        Ok(StepOutcome::Retried { attempt, low, high })
    }

    fn complete_leaf(&mut self, coordinate: ScanCoordinate, record: Option<ScanRecord>) -> StepOutcome {
        let ctx = &mut self.ctx;
        if ctx.attempts > 0 {
            debug!("leaf {} recovered after {} retries", ctx.leaf_index, ctx.attempts);
        }
        ctx.leaf_index += 1;
        ctx.attempts = 0;
        ctx.prepared = None;
        ctx.completed_leaves += 1;
        let progress = progress(&self.extents, ctx.completed_leaves);
        debug!(
            "leaf done at {coordinate:?}: sub-scan {:.1}%, overall {:.1}%",
            progress.sub_scan, progress.overall
        );
        StepOutcome::LeafCompleted {
            coordinate,
            record,
            progress,
        }
    }

    fn finish_sub_scan(&mut self, kind: SubScanKind) -> MokeResult<StepOutcome> {
        self.devices.field.write(Axis::FieldCoil, 0.0)?;
        if self.ctx.shutter_blocked {
            self.devices.shutter.set_blocked(false)?;
            self.ctx.shutter_blocked = false;
        }
        let summary = self.summary(kind, true);
        self.devices.persistence.finish_sub_scan(&summary)?;
        self.ctx.sub_scan_active = false;
        info!(
            "sub-scan {}/{} finished: {kind:?}",
            self.global_sub_scan_index() + 1,
            self.extents.total_sub_scans()
        );
        self.ctx.sub_scan_index += 1;
        self.phase = Phase::EnterSubScan;
        Ok(StepOutcome::SubScanCompleted {
            summary,
            progress: self.progress(),
        })
    }

    fn summary(&self, kind: SubScanKind, complete: bool) -> SubScanSummary {
        let fluence = self.current_fluence();
        match kind {
            SubScanKind::Transient { .. } => SubScanSummary {
                fluence,
                kind,
                complete,
                delays_ps: self.plan.delays_ps.clone(),
                trace: self.ctx.averager.trace().to_vec(),
                loops_completed: self.ctx.averager.complete_passes(),
                points: 0,
                moke_amplitude: None,
            },
            _ => SubScanSummary {
                fluence,
                kind,
                complete,
                delays_ps: Vec::new(),
                trace: Vec::new(),
                loops_completed: 0,
                points: self.ctx.hysteresis_points.len(),
                moke_amplitude: moke_amplitude(&self.ctx.hysteresis_points, self.plan.hysteresis_amplitude),
            },
        }
    }

    /// Hand the partially completed sub-scan to persistence, if one is open.
    fn flush_partial(&mut self) {
        if !self.ctx.sub_scan_active {
            return;
        }
        self.ctx.sub_scan_active = false;
        let Ok(kind) = self.current_kind() else {
            return;
        };
        let summary = self.summary(kind, false);
        if let Err(e) = self.devices.persistence.finish_sub_scan(&summary) {
            error!("could not flush partial sub-scan: {e}");
        }
    }

    /// Field to zero, pump unblocked if we blocked it, every device closed.
    /// Attempts every action and returns the first failure.
    fn shutdown(&mut self) -> MokeResult<()> {
        let mut first_err = None;
        let mut keep = |r: MokeResult<()>| {
            if let Err(e) = r {
                warn!("shutdown: {e}");
                first_err.get_or_insert(e);
            }
        };
        let d = &mut self.devices;
        keep(d.field.write(Axis::FieldCoil, 0.0));
        if self.ctx.shutter_blocked {
            keep(d.shutter.set_blocked(false));
            self.ctx.shutter_blocked = false;
        }
        keep(d.acquisition.close());
        keep(d.motion.close());
        keep(d.field.close());
        keep(d.shutter.close());
        keep(d.fluence.close());
        keep(d.persistence.close());
        first_err.map_or(Ok(()), Err)
    }

    fn unwind(&mut self) -> MokeResult<StepOutcome> {
        info!(
            "stop requested after {} leaves; unwinding",
            self.ctx.completed_leaves
        );
        self.flush_partial();
        match self.shutdown() {
            Ok(()) => {
                self.phase = Phase::Terminal(ScanStatus::Stopped);
                Ok(StepOutcome::Finished(ScanStatus::Stopped))
            }
            Err(e) => {
                self.phase = Phase::Terminal(ScanStatus::Failed);
                Err(e)
            }
        }
    }

    fn abort(&mut self, err: &MokeError) {
        error!(
            "scan aborted at sub-scan {}, leaf {}: {err}",
            self.global_sub_scan_index() + 1,
            self.ctx.leaf_index
        );
        self.flush_partial();
        if let Err(e) = self.shutdown() {
            error!("shutdown after abort failed: {e}");
        }
        self.phase = Phase::Terminal(ScanStatus::Failed);
    }

    fn current_kind(&self) -> MokeResult<SubScanKind> {
        self.plan
            .sub_scans
            .get(self.ctx.sub_scan_index)
            .copied()
            .ok_or_else(|| MokeError::ConfigError("sub-scan index out of range".to_string()))
    }

    fn current_fluence(&self) -> Option<f64> {
        self.plan.fluences.get(self.ctx.fluence_index).copied().flatten()
    }

    fn global_sub_scan_index(&self) -> usize {
        self.ctx.fluence_index * self.plan.sub_scans.len() + self.ctx.sub_scan_index
    }
}

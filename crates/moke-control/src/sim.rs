// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Simulated Instrument
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! Software stand-in for the pump-probe MOKE setup.
//!
//! A single [`SimState`] is shared by every collaborator handle, so a test
//! can drive a scan and afterwards inspect what the hardware saw. The sample
//! is a square-ish hysteresis loop whose magnetization the pump quenches
//! after time zero with an exponential recovery.
//!
//! Faults are scripted by acquisition number (1-based) and fire exactly once.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::rc::Rc;

use moke_types::error::{MokeError, MokeResult};
use moke_types::state::{Channel, ChannelSampleBatch, ScanRecord, SubScanSummary};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::instrument::{
    Acquisition, Axis, Collaborators, DelayLine, FieldSetpoint, FluenceControl, Motion, Notifier,
    Persistence, PumpShutter,
};

const CHOPPER_LOW_V: f64 = 0.0;
const CHOPPER_HIGH_V: f64 = 5.0;
/// Field-monitor volts per field-supply volt.
const HALL_GAIN: f64 = 0.1;

/// Malformed or failed reads the rig can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Chopper stuck low: no chopper-high samples.
    ChopperStuck,
    /// One chopper-high sample lost: both states present, counts differ.
    Unequal,
    /// Reference diode dark.
    SourceOff,
    /// The acquisition card raises an error.
    DeviceError,
}

/// Sample model parameters.
#[derive(Debug, Clone, Copy)]
pub struct SampleModel {
    /// Balanced-diode signal at full magnetization (V).
    pub kerr_signal: f64,
    /// Field (supply V) where the loop switches.
    pub coercive_field: f64,
    /// Width of the switching edge (supply V).
    pub switching_width: f64,
    /// Fractional demagnetization per unit fluence, capped at 0.9.
    pub quench_per_fluence: f64,
    /// Recovery time constant (ps).
    pub recovery_ps: f64,
    /// Pump-probe overlap (ps).
    pub time_zero_ps: f64,
    pub noise_sigma: f64,
}

impl Default for SampleModel {
    fn default() -> Self {
        Self {
            kerr_signal: 0.02,
            coercive_field: 0.6,
            switching_width: 0.05,
            quench_per_fluence: 0.2,
            recovery_ps: 150.0,
            time_zero_ps: 500.0,
            noise_sigma: 1e-5,
        }
    }
}

/// Everything the simulated hardware knows and has seen.
pub struct SimState {
    rng: StdRng,
    noise: Normal<f64>,
    pub model: SampleModel,
    pub delay_line: DelayLine,
    pub stage_mm: f64,
    pub field: f64,
    /// Sweep direction of the last field change, for the loop branch.
    pub field_rising: bool,
    pub shutter_blocked: bool,
    pub fluence: f64,
    pub faults: BTreeMap<usize, Fault>,
    /// Fail the n-th stage move (1-based).
    pub fail_move_at: Option<usize>,
    pub acquisitions: usize,
    pub moves: Vec<f64>,
    pub field_writes: Vec<f64>,
    pub shutter_log: Vec<bool>,
    pub fluence_log: Vec<f64>,
    pub records: Vec<ScanRecord>,
    pub summaries: Vec<SubScanSummary>,
    pub notifications: Vec<String>,
    pub closed: usize,
}

impl SimState {
    fn delay_ps(&self) -> f64 {
        self.delay_line.to_delay_ps(self.stage_mm)
    }

    fn magnetization(&self) -> f64 {
        let m = &self.model;
        let shift = if self.field_rising {
            -m.coercive_field
        } else {
            m.coercive_field
        };
        ((self.field + shift) / m.switching_width).tanh()
    }

    /// Fraction of magnetization left in the pumped state.
    fn pumped_fraction(&self) -> f64 {
        if self.shutter_blocked {
            return 1.0;
        }
        let t = self.delay_ps() - self.model.time_zero_ps;
        if t < 0.0 {
            return 1.0;
        }
        let quench = (self.model.quench_per_fluence * self.fluence).min(0.9);
        1.0 - quench * (-t / self.model.recovery_ps).exp()
    }

    fn sample_noise(&mut self) -> f64 {
        self.noise.sample(&mut self.rng)
    }

    fn read(&mut self, channels: &[Channel], n: usize) -> MokeResult<ChannelSampleBatch> {
        self.acquisitions += 1;
        let fault = self.faults.remove(&self.acquisitions);
        if fault == Some(Fault::DeviceError) {
            return Err(MokeError::collaborator(
                "acquisition",
                format!("DAQ read {} timed out", self.acquisitions),
            ));
        }

        let m = self.magnetization();
        let pumped = self.pumped_fraction();
        let kerr = self.model.kerr_signal;
        let mut samples = Array2::zeros((channels.len(), n));
        for j in 0..n {
            let mut low = j % 2 == 0;
            match fault {
                Some(Fault::ChopperStuck) => low = true,
                Some(Fault::Unequal) if j == n - 1 => low = true,
                _ => {}
            }
            // chopper-low samples see the pump
            let m_eff = if low { m * pumped } else { m };
            for (row, ch) in channels.iter().enumerate() {
                let clean = match ch {
                    Channel::Signal => kerr * m_eff,
                    Channel::PlusDiode => 1.0 + 0.5 * kerr * m_eff,
                    Channel::MinusDiode => 1.0 - 0.5 * kerr * m_eff,
                    Channel::FieldMonitor => HALL_GAIN * self.field,
                    Channel::Chopper => {
                        samples[[row, j]] = if low { CHOPPER_LOW_V } else { CHOPPER_HIGH_V };
                        continue;
                    }
                    Channel::Reference => {
                        if fault == Some(Fault::SourceOff) {
                            samples[[row, j]] = 0.0;
                            continue;
                        }
                        0.8
                    }
                };
                samples[[row, j]] = clean + self.sample_noise();
            }
        }
        ChannelSampleBatch::new(channels.to_vec(), samples)
    }
}

/// Handle to the shared simulated instrument.
#[derive(Clone)]
pub struct SimulatedRig {
    state: Rc<RefCell<SimState>>,
}

impl SimulatedRig {
    pub fn new(seed: u64) -> MokeResult<Self> {
        Self::with_model(seed, SampleModel::default(), DelayLine::default())
    }

    pub fn with_model(seed: u64, model: SampleModel, delay_line: DelayLine) -> MokeResult<Self> {
        let noise = Normal::new(0.0, model.noise_sigma)
            .map_err(|e| MokeError::ConfigError(format!("noise_sigma: {e}")))?;
        let stage_mm = delay_line.to_stage_mm(0.0);
        Ok(Self {
            state: Rc::new(RefCell::new(SimState {
                rng: StdRng::seed_from_u64(seed),
                noise,
                model,
                delay_line,
                stage_mm,
                field: 0.0,
                field_rising: true,
                shutter_blocked: false,
                fluence: 1.0,
                faults: BTreeMap::new(),
                fail_move_at: None,
                acquisitions: 0,
                moves: Vec::new(),
                field_writes: Vec::new(),
                shutter_log: Vec::new(),
                fluence_log: Vec::new(),
                records: Vec::new(),
                summaries: Vec::new(),
                notifications: Vec::new(),
                closed: 0,
            })),
        })
    }

    /// Fault on acquisition number `n` (1-based, counted over the whole run).
    pub fn inject_at(&self, n: usize, fault: Fault) {
        self.state.borrow_mut().faults.insert(n, fault);
    }

    /// Faults on the next acquisitions, in order.
    pub fn inject_next(&self, faults: &[Fault]) {
        let mut st = self.state.borrow_mut();
        let base = st.acquisitions;
        for (i, &f) in faults.iter().enumerate() {
            st.faults.insert(base + i + 1, f);
        }
    }

    pub fn fail_move_at(&self, n: usize) {
        self.state.borrow_mut().fail_move_at = Some(n);
    }

    pub fn state(&self) -> Ref<'_, SimState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, SimState> {
        self.state.borrow_mut()
    }

    /// One boxed collaborator per role, all backed by this rig.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            acquisition: Box::new(SimDaq(self.state.clone())),
            motion: Box::new(SimStage(self.state.clone())),
            field: Box::new(SimFieldSupply(self.state.clone())),
            shutter: Box::new(SimShutter(self.state.clone())),
            fluence: Box::new(SimAttenuator(self.state.clone())),
            persistence: Box::new(SimRecorder(self.state.clone())),
            notifier: Box::new(SimNotifier(self.state.clone())),
        }
    }
}

struct SimDaq(Rc<RefCell<SimState>>);
struct SimStage(Rc<RefCell<SimState>>);
struct SimFieldSupply(Rc<RefCell<SimState>>);
struct SimShutter(Rc<RefCell<SimState>>);
struct SimAttenuator(Rc<RefCell<SimState>>);
struct SimRecorder(Rc<RefCell<SimState>>);
struct SimNotifier(Rc<RefCell<SimState>>);

impl Acquisition for SimDaq {
    fn acquire(&mut self, channels: &[Channel], sample_count: usize) -> MokeResult<ChannelSampleBatch> {
        self.0.borrow_mut().read(channels, sample_count)
    }

    fn close(&mut self) -> MokeResult<()> {
        self.0.borrow_mut().closed += 1;
        Ok(())
    }
}

impl Motion for SimStage {
    fn move_to(&mut self, axis: Axis, position_mm: f64) -> MokeResult<f64> {
        let mut st = self.0.borrow_mut();
        if axis != Axis::DelayStage {
            return Err(MokeError::collaborator("stage", format!("no motor on {axis:?}")));
        }
        st.moves.push(position_mm);
        if st.fail_move_at == Some(st.moves.len()) {
            return Err(MokeError::collaborator("stage", "controller did not acknowledge move"));
        }
        st.stage_mm = position_mm;
        Ok(st.stage_mm)
    }

    fn close(&mut self) -> MokeResult<()> {
        self.0.borrow_mut().closed += 1;
        Ok(())
    }
}

impl FieldSetpoint for SimFieldSupply {
    fn write(&mut self, axis: Axis, value: f64) -> MokeResult<()> {
        let mut st = self.0.borrow_mut();
        if axis != Axis::FieldCoil {
            return Err(MokeError::collaborator("field supply", format!("no output on {axis:?}")));
        }
        if value != st.field {
            st.field_rising = value > st.field;
        }
        st.field = value;
        st.field_writes.push(value);
        Ok(())
    }

    fn close(&mut self) -> MokeResult<()> {
        self.0.borrow_mut().closed += 1;
        Ok(())
    }
}

impl PumpShutter for SimShutter {
    fn set_blocked(&mut self, blocked: bool) -> MokeResult<()> {
        let mut st = self.0.borrow_mut();
        st.shutter_blocked = blocked;
        st.shutter_log.push(blocked);
        Ok(())
    }
}

impl FluenceControl for SimAttenuator {
    fn set_fluence(&mut self, fluence: f64) -> MokeResult<()> {
        let mut st = self.0.borrow_mut();
        st.fluence = fluence;
        st.fluence_log.push(fluence);
        Ok(())
    }
}

impl Persistence for SimRecorder {
    fn append(&mut self, record: &ScanRecord) -> MokeResult<()> {
        self.0.borrow_mut().records.push(record.clone());
        Ok(())
    }

    fn finish_sub_scan(&mut self, summary: &SubScanSummary) -> MokeResult<()> {
        self.0.borrow_mut().summaries.push(summary.clone());
        Ok(())
    }

    fn close(&mut self) -> MokeResult<()> {
        self.0.borrow_mut().closed += 1;
        Ok(())
    }
}

impl Notifier for SimNotifier {
    fn notify(&mut self, message: &str) {
        self.0.borrow_mut().notifications.push(message.to_string());
    }
}

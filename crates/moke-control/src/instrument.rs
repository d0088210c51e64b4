// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Instrument Interfaces
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Collaborator traits the scan drives, and the delay-line transform.
//!
//! Every call is synchronous and blocks the current scan step. Hardware
//! adapters report failures as
//! [`MokeError::Collaborator`](moke_types::error::MokeError::Collaborator).

use moke_types::config::DelayLineConfig;
use moke_types::constants::{LIGHT_MM_PER_PS, ROUND_TRIP_FACTOR, STAGE_OFFSET_MM};
use moke_types::error::MokeResult;
use moke_types::state::{Channel, ChannelSampleBatch, ScanRecord, SubScanSummary};

/// Physical axes a setpoint can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    DelayStage,
    FieldCoil,
}

pub trait Acquisition {
    /// One synchronized read of `sample_count` samples on every channel.
    fn acquire(&mut self, channels: &[Channel], sample_count: usize) -> MokeResult<ChannelSampleBatch>;

    fn close(&mut self) -> MokeResult<()> {
        Ok(())
    }
}

pub trait Motion {
    /// Move and block until settled. Returns the readback position (mm).
    fn move_to(&mut self, axis: Axis, position_mm: f64) -> MokeResult<f64>;

    fn close(&mut self) -> MokeResult<()> {
        Ok(())
    }
}

pub trait FieldSetpoint {
    fn write(&mut self, axis: Axis, value: f64) -> MokeResult<()>;

    fn close(&mut self) -> MokeResult<()> {
        Ok(())
    }
}

pub trait PumpShutter {
    fn set_blocked(&mut self, blocked: bool) -> MokeResult<()>;

    fn close(&mut self) -> MokeResult<()> {
        Ok(())
    }
}

pub trait FluenceControl {
    fn set_fluence(&mut self, fluence: f64) -> MokeResult<()>;

    fn close(&mut self) -> MokeResult<()> {
        Ok(())
    }
}

/// Append-only sink for scan results.
pub trait Persistence {
    fn append(&mut self, record: &ScanRecord) -> MokeResult<()>;

    fn finish_sub_scan(&mut self, summary: &SubScanSummary) -> MokeResult<()>;

    fn close(&mut self) -> MokeResult<()> {
        Ok(())
    }
}

/// Fire-and-forget operator alerts.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// The full set of devices a scan needs.
pub struct Collaborators {
    pub acquisition: Box<dyn Acquisition>,
    pub motion: Box<dyn Motion>,
    pub field: Box<dyn FieldSetpoint>,
    pub shutter: Box<dyn PumpShutter>,
    pub fluence: Box<dyn FluenceControl>,
    pub persistence: Box<dyn Persistence>,
    pub notifier: Box<dyn Notifier>,
}

/// Optical delay line: stage position (mm) ↔ pump-probe delay (ps).
///
/// `t = (x + offset) / c × round_trip`, with `c` the speed of light in
/// mm/ps and `round_trip` the number of passes over the stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayLine {
    pub offset_mm: f64,
    pub round_trip: f64,
    pub mm_per_ps: f64,
}

impl Default for DelayLine {
    fn default() -> Self {
        Self {
            offset_mm: STAGE_OFFSET_MM,
            round_trip: ROUND_TRIP_FACTOR,
            mm_per_ps: LIGHT_MM_PER_PS,
        }
    }
}

impl From<&DelayLineConfig> for DelayLine {
    fn from(cfg: &DelayLineConfig) -> Self {
        Self {
            offset_mm: cfg.offset_mm,
            round_trip: cfg.round_trip,
            mm_per_ps: cfg.mm_per_ps,
        }
    }
}

impl DelayLine {
    pub fn to_stage_mm(&self, delay_ps: f64) -> f64 {
        delay_ps * self.mm_per_ps / self.round_trip - self.offset_mm
    }

    pub fn to_delay_ps(&self, position_mm: f64) -> f64 {
        (position_mm + self.offset_mm) / self.mm_per_ps * self.round_trip
    }
}

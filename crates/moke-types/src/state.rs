// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{MokeError, MokeResult};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Analog input channels of the acquisition card.
/// `ALL` lists them in the row order the card delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Balanced (difference) diode: the magneto-optic signal.
    Signal,
    PlusDiode,
    /// Hall probe / field monitor voltage.
    FieldMonitor,
    /// Chopper trigger output.
    Chopper,
    MinusDiode,
    /// Reference diode in front of the shutter.
    Reference,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Signal,
        Channel::PlusDiode,
        Channel::FieldMonitor,
        Channel::Chopper,
        Channel::MinusDiode,
        Channel::Reference,
    ];

    /// Channels that must demultiplex cleanly for a leaf to count.
    pub const REDUCED: [Channel; 4] = [
        Channel::Signal,
        Channel::Reference,
        Channel::PlusDiode,
        Channel::MinusDiode,
    ];
}

/// One synchronized read of N channels × M samples.
/// Rows follow `channels`; every row has the same length.
#[derive(Debug, Clone)]
pub struct ChannelSampleBatch {
    channels: Vec<Channel>,
    samples: Array2<f64>,
}

impl ChannelSampleBatch {
    pub fn new(channels: Vec<Channel>, samples: Array2<f64>) -> MokeResult<Self> {
        if channels.len() != samples.nrows() {
            return Err(MokeError::ConfigError(format!(
                "batch has {} rows for {} channels",
                samples.nrows(),
                channels.len()
            )));
        }
        for (i, ch) in channels.iter().enumerate() {
            if channels[..i].contains(ch) {
                return Err(MokeError::ConfigError(format!(
                    "channel {ch:?} listed twice in batch"
                )));
            }
        }
        Ok(Self { channels, samples })
    }

    /// Build from per-channel rows. All rows must have equal length.
    pub fn from_rows(rows: Vec<(Channel, Vec<f64>)>) -> MokeResult<Self> {
        let n_samples = rows.first().map_or(0, |(_, r)| r.len());
        if let Some((ch, r)) = rows.iter().find(|(_, r)| r.len() != n_samples) {
            return Err(MokeError::ConfigError(format!(
                "channel {ch:?} has {} samples, expected {n_samples}",
                r.len()
            )));
        }
        let mut samples = Array2::zeros((rows.len(), n_samples));
        let mut channels = Vec::with_capacity(rows.len());
        for (i, (ch, row)) in rows.into_iter().enumerate() {
            for (j, v) in row.into_iter().enumerate() {
                samples[[i, j]] = v;
            }
            channels.push(ch);
        }
        Self::new(channels, samples)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn sample_count(&self) -> usize {
        self.samples.ncols()
    }

    pub fn channel(&self, channel: Channel) -> Option<ArrayView1<'_, f64>> {
        self.channels
            .iter()
            .position(|&c| c == channel)
            .map(|row| self.samples.row(row))
    }

    /// Like [`channel`](Self::channel) but a missing row is an error.
    pub fn require(&self, channel: Channel) -> MokeResult<ArrayView1<'_, f64>> {
        self.channel(channel)
            .ok_or(MokeError::ChannelMissing(channel))
    }
}

/// Chopper-sorted averages of one channel of one batch.
///
/// `low` collects samples taken while the chopper trigger was below the
/// threshold, `high` those above it. On the current wiring the low bucket is
/// the pumped one; the names follow the trigger level, not the pump state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChopperSplit {
    pub low_avg: f64,
    pub high_avg: f64,
    pub low_count: usize,
    pub high_count: usize,
    pub valid: bool,
}

impl ChopperSplit {
    pub fn invalid(low_count: usize, high_count: usize) -> Self {
        Self {
            low_avg: 0.0,
            high_avg: 0.0,
            low_count,
            high_count,
            valid: false,
        }
    }

    /// Pump-probe difference `low − high`.
    pub fn difference(&self) -> f64 {
        self.low_avg - self.high_avg
    }

    pub fn is_balanced(&self) -> bool {
        self.valid && self.low_count == self.high_count
    }
}

/// Sign of the applied magnetic field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Plus,
    Minus,
}

impl Polarity {
    pub fn sign(self) -> f64 {
        match self {
            Polarity::Plus => 1.0,
            Polarity::Minus => -1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Polarity::Plus => Polarity::Minus,
            Polarity::Minus => Polarity::Plus,
        }
    }
}

/// Split results of all reduced channels for one polarity at one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolaritySplits {
    pub signal: ChopperSplit,
    pub reference: ChopperSplit,
    pub plus_diode: ChopperSplit,
    pub minus_diode: ChopperSplit,
}

impl PolaritySplits {
    pub fn all_valid(&self) -> bool {
        self.signal.valid && self.reference.valid && self.plus_diode.valid && self.minus_diode.valid
    }
}

/// Reduced scalars for one scan coordinate.
/// Also used as the running accumulator across loop passes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombinedSignal {
    /// Field-odd component.
    pub moke: f64,
    /// Field-even component.
    pub total: f64,
    pub reference: f64,
    pub plus_diode: f64,
    pub minus_diode: f64,
}

/// One point of the fluence × field × delay grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanCoordinate {
    pub fluence_index: usize,
    pub field_index: usize,
    pub field_value: f64,
    pub delay_index: usize,
    /// Readback delay; `None` for the static hysteresis sweep.
    pub delay_ps: Option<f64>,
}

/// What a sub-scan measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubScanKind {
    /// Field sweep with the pump blocked.
    StaticHysteresis,
    /// Field sweep at a fixed pump-probe delay.
    Hysteresis { delay_ps: f64 },
    /// Delay trace at a fixed field amplitude, both polarities.
    Transient { field_amplitude: f64 },
}

/// Flat record handed to persistence once per coordinate and loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransientRecord {
    pub fluence: Option<f64>,
    pub field_amplitude: f64,
    pub delay_index: usize,
    pub delay_ps: f64,
    /// 1-based loop pass.
    pub loop_index: usize,
    pub moke_signal: f64,
    pub total_signal: f64,
    pub reference_signal: f64,
    pub plus_diode_signal: f64,
    pub minus_diode_signal: f64,
    /// Loop-averaged MOKE after this pass.
    pub moke_average: f64,
    pub total_average: f64,
    /// Field-monitor mean of the +field read, if the channel was recorded.
    pub measured_field: Option<f64>,
}

/// Flat record handed to persistence once per hysteresis field point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HysteresisRecord {
    pub fluence: Option<f64>,
    /// `None` for the static (pump blocked) sweep.
    pub delay_ps: Option<f64>,
    pub point_index: usize,
    pub field_setpoint: f64,
    pub signal_low: f64,
    pub signal_high: f64,
    pub reference_low: f64,
    pub reference_high: f64,
    pub plus_diode_low: f64,
    pub plus_diode_high: f64,
    pub minus_diode_low: f64,
    pub minus_diode_high: f64,
    pub measured_field: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum ScanRecord {
    Transient(TransientRecord),
    Hysteresis(HysteresisRecord),
}

/// End-of-sub-scan hand-off: the accumulated results.
/// `complete == false` when the sub-scan was cut short by stop or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScanSummary {
    pub fluence: Option<f64>,
    pub kind: SubScanKind,
    pub complete: bool,
    /// Delay axis (transient) or empty.
    pub delays_ps: Vec<f64>,
    /// Loop-averaged signal per delay index (transient); `None` where no
    /// loop pass finished.
    pub trace: Vec<Option<CombinedSignal>>,
    pub loops_completed: usize,
    /// Field-point count reached (hysteresis).
    pub points: usize,
    /// Saturation-to-saturation signal swing (hysteresis).
    pub moke_amplitude: Option<f64>,
}

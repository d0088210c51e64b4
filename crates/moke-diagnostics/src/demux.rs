// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Chopper Demultiplexer
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! Splits a channel into chopper-low / chopper-high samples and averages
//! each subset.
//!
//! The partition is driven entirely by the chopper trigger row of the same
//! batch: `low = {i : C[i] < threshold}`, `high = {i : C[i] > threshold}`.
//! Samples exactly at the threshold belong to neither set.

use log::trace;
use moke_types::config::BalancePolicy;
use moke_types::constants::SOURCE_OFF_DECIMALS;
use moke_types::error::MokeResult;
use moke_types::state::{Channel, ChannelSampleBatch, ChopperSplit, PolaritySplits};
use ndarray::ArrayView1;

/// Sort `samples` by the chopper level and average both buckets.
///
/// Never fails: an empty bucket yields zeros and `valid = false`. If the two
/// rows differ in length only the common prefix is used.
pub fn split_by_chopper(
    samples: ArrayView1<'_, f64>,
    chopper: ArrayView1<'_, f64>,
    threshold: f64,
) -> ChopperSplit {
    let mut low_sum = 0.0;
    let mut high_sum = 0.0;
    let mut low_count = 0usize;
    let mut high_count = 0usize;

    for (&s, &c) in samples.iter().zip(chopper.iter()) {
        if c < threshold {
            low_sum += s;
            low_count += 1;
        } else if c > threshold {
            high_sum += s;
            high_count += 1;
        }
    }

    if low_count == 0 || high_count == 0 {
        return ChopperSplit::invalid(low_count, high_count);
    }

    ChopperSplit {
        low_avg: low_sum / low_count as f64,
        high_avg: high_sum / high_count as f64,
        low_count,
        high_count,
        valid: true,
    }
}

/// Slice flavour of [`split_by_chopper`].
pub fn split_slices(samples: &[f64], chopper: &[f64], threshold: f64) -> ChopperSplit {
    split_by_chopper(
        ArrayView1::from(samples),
        ArrayView1::from(chopper),
        threshold,
    )
}

/// Demultiplex one channel of a batch against the batch's chopper row.
pub fn demultiplex(
    batch: &ChannelSampleBatch,
    channel: Channel,
    threshold: f64,
) -> MokeResult<ChopperSplit> {
    let chopper = batch.require(Channel::Chopper)?;
    let samples = batch.require(channel)?;
    let split = split_by_chopper(samples, chopper, threshold);
    if !split.valid {
        trace!(
            "{channel:?}: empty chopper state ({} low / {} high)",
            split.low_count,
            split.high_count
        );
    }
    Ok(split)
}

/// Demultiplex every reduced channel (signal + auxiliary diodes).
pub fn demultiplex_reduced(
    batch: &ChannelSampleBatch,
    threshold: f64,
) -> MokeResult<PolaritySplits> {
    Ok(PolaritySplits {
        signal: demultiplex(batch, Channel::Signal, threshold)?,
        reference: demultiplex(batch, Channel::Reference, threshold)?,
        plus_diode: demultiplex(batch, Channel::PlusDiode, threshold)?,
        minus_diode: demultiplex(batch, Channel::MinusDiode, threshold)?,
    })
}

/// Whether a split may advance the scan under `policy`.
pub fn accepts(split: &ChopperSplit, policy: BalancePolicy) -> bool {
    match policy {
        BalancePolicy::NonEmpty => split.valid,
        BalancePolicy::EqualCounts => split.is_balanced(),
    }
}

/// Every reduced channel passes `policy`.
pub fn accepts_all(splits: &PolaritySplits, policy: BalancePolicy) -> bool {
    [
        &splits.signal,
        &splits.reference,
        &splits.plus_diode,
        &splits.minus_diode,
    ]
    .into_iter()
    .all(|s| accepts(s, policy))
}

/// Plain mean of one channel, e.g. the field monitor. `None` when the
/// channel is absent or empty.
pub fn channel_mean(batch: &ChannelSampleBatch, channel: Channel) -> Option<f64> {
    batch.channel(channel).and_then(|row| row.mean())
}

/// Reference diode reads zero to four decimals: the laser is probably off.
pub fn source_appears_off(reference: &ChopperSplit) -> bool {
    let scale = 10f64.powi(SOURCE_OFF_DECIMALS);
    (reference.high_avg * scale).round() == 0.0
}

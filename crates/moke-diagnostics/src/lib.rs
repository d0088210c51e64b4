// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Diagnostics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Signal reduction for chopped pump-probe measurements.
//!
//! Demultiplexing by chopper state, the ±field differential algebra,
//! loop averaging, and hysteresis-loop normalization.

pub mod averager;
pub mod combiner;
pub mod demux;
pub mod hysteresis;

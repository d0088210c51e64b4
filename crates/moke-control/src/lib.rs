// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Scan Control
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Scan orchestration.
//!
//! Setpoint vectors, progress bookkeeping, the instrument collaborator
//! traits, the step-driven scan state machine and a simulated rig.

pub mod instrument;
pub mod progress;
pub mod scan;
pub mod setpoints;
pub mod sim;

// ─────────────────────────────────────────────────────────────────────
// TR-MOKE Core — Simulated Scan Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! Runs a full scan against the simulated instrument.
//!
//! Usage: `trmoke-sim [config.json] [summaries.json]`
//!
//! Without a config a short transient + hysteresis scan is used. Sub-scan
//! summaries are written as JSON to the second argument, or stdout.

use std::env;
use std::fs;

use log::info;
use moke_control::scan::{ScanOrchestrator, StepOutcome};
use moke_control::sim::{Fault, SimulatedRig};
use moke_types::config::{
    AcquisitionConfig, DelayLineConfig, HysteresisConfig, ScanConfig, TransientConfig,
};
use moke_types::constants::{FIELD_OVERSHOOT_LIMIT_V, MAX_FIELD_AMPLITUDE_V};

fn demo_config() -> ScanConfig {
    ScanConfig {
        acquisition: AcquisitionConfig {
            repeats: 100,
            ..AcquisitionConfig::default()
        },
        transient: Some(TransientConfig {
            delay_start: 480.0,
            delay_end: 900.0,
            delay_step: 20.0,
            delay_segments: None,
            loops: 3,
            field_amplitudes: vec![2.0],
        }),
        hysteresis: Some(HysteresisConfig {
            amplitude: 2.0,
            step: None,
            loop_count: 1,
            delays_relative: vec![10.0],
            static_loop: true,
            max_amplitude: MAX_FIELD_AMPLITUDE_V,
            overshoot_limit: FIELD_OVERSHOOT_LIMIT_V,
        }),
        fluences: vec![1.0, 2.5],
        delay_line: DelayLineConfig {
            time_zero_ps: 500.0,
            ..DelayLineConfig::default()
        },
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => ScanConfig::from_file(&path).map_err(|e| format!("{path}: {e}"))?,
        None => demo_config(),
    };

    let rig = SimulatedRig::new(0x5EED).map_err(|e| e.to_string())?;
    // a flaky trigger now and then
    for n in (17..2000).step_by(97) {
        rig.inject_at(n, Fault::ChopperStuck);
    }

    let mut scan = ScanOrchestrator::new(&config, rig.collaborators()).map_err(|e| e.to_string())?;
    let status = loop {
        match scan.step().map_err(|e| e.to_string())? {
            StepOutcome::SubScanCompleted { summary, progress } => {
                info!(
                    "{:?} done ({:.0}% overall), amplitude {:?}",
                    summary.kind, progress.overall, summary.moke_amplitude
                );
            }
            StepOutcome::Finished(status) => break status,
            _ => {}
        }
    };

    let st = rig.state();
    info!(
        "{status:?}: {} records, {} retries",
        st.records.len(),
        scan.context().total_retries
    );
    let json = serde_json::to_string_pretty(&st.summaries).map_err(|e| e.to_string())?;
    match env::args().nth(2) {
        Some(out) => fs::write(&out, json).map_err(|e| format!("Failed to write {out}: {e}"))?,
        None => println!("{json}"),
    }
    Ok(())
}

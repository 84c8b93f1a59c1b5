//! Shared test helpers for integration tests
//!
//! Synthetic captures with known characteristics, and writers that put them
//! on disk in the two-column format oscilloscopes export.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::PathBuf;

use assert_cmd::cargo;
use assert_cmd::Command;
use esdv::core::{Sample, Waveform};
use tempfile::TempDir;

/// Helper to get an esdv command
pub fn esdv() -> Command {
    Command::new(cargo::cargo_bin!("esdv"))
}

/// CDM pulse in 10 ps steps: 6 A peak at 1.3 ns, 0.24 ns rise,
/// half maximum from 1.15 ns to 1.65 ns, -1 A undershoot at 2.2 ns
pub fn cdm_pulse() -> Waveform {
    (0..=300)
        .map(|k: i32| {
            let y = match k {
                0..=100 => 0.0,
                101..=130 => (k - 100) as f64 * 6.0 / 30.0,
                131..=200 => (200 - k) as f64 * 6.0 / 70.0,
                201..=220 => -((k - 200) as f64) / 20.0,
                221..=260 => -((260 - k) as f64) / 40.0,
                _ => 0.0,
            };
            Sample::new(k as f64 * 1e-11, y)
        })
        .collect()
}

/// HBM 0 Ω discharge in 0.5 ns steps.
///
/// A linear edge from 10 ns to the `peak` at 16 ns, then a 150 ns
/// exponential decay with a damped 100 MHz ring of amplitude `ring`.
/// Samples before the edge alternate between `±pre_noise`.
pub fn hbm_discharge(peak: f64, last: usize, ring: f64, pre_noise: f64) -> Waveform {
    const TICK: f64 = 0.5e-9;
    (0..=last)
        .map(|k| {
            let y = if k < 20 {
                if k % 2 == 0 {
                    pre_noise
                } else {
                    -pre_noise
                }
            } else if k < 32 {
                peak * (k - 20) as f64 / 12.0
            } else {
                let dt = (k - 32) as f64 * TICK;
                peak * (-dt / 150e-9).exp()
                    - ring * (2.0 * std::f64::consts::PI * dt / 10e-9).sin() * (-dt / 10e-9).exp()
            };
            Sample::new(k as f64 * TICK, y)
        })
        .collect()
}

/// The standard 0 Ω capture: 0.34 A peak over 600 ns with a 20 mA ring
pub fn hbm_capture() -> Waveform {
    hbm_discharge(0.34, 1200, 0.02, 0.0)
}

/// HBM 500 Ω discharge: edge from 0 at 10 ns to `peak` at 30 ns, 200 ns decay
pub fn hbm_500_ohm_discharge(peak: f64) -> Waveform {
    (0..=1000)
        .map(|k: i32| {
            let y = match k {
                0..=20 => 0.0,
                21..=60 => peak * (k - 20) as f64 / 40.0,
                _ => peak * (-((k - 60) as f64) * 0.5e-9 / 200e-9).exp(),
            };
            Sample::new(k as f64 * 0.5e-9, y)
        })
        .collect()
}

/// Render a waveform as `time<sep>current` lines below a scope-style header
pub fn to_delimited(waveform: &Waveform, separator: char) -> String {
    let mut out = format!("Time{}Ch1\n", separator);
    for sample in waveform {
        let _ = writeln!(out, "{}{}{}", sample.time, separator, sample.amplitude);
    }
    out
}

/// Write a waveform as CSV into `dir`
pub fn write_capture(dir: &TempDir, name: &str, waveform: &Waveform) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, to_delimited(waveform, ',')).unwrap();
    path
}

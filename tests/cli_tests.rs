//! CLI and command tests

mod common;

use common::{cdm_pulse, esdv, hbm_500_ohm_discharge, hbm_capture, write_capture};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    esdv()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ESD waveform verifier"));
}

#[test]
fn test_version_displays() {
    esdv()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("esdv"));
}

#[test]
fn test_unknown_command_fails() {
    esdv()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ============================================================================
// CDM Command Tests
// ============================================================================

#[test]
fn test_cdm_text_report() {
    let tmp = TempDir::new().unwrap();
    let path = write_capture(&tmp, "cdm.csv", &cdm_pulse());

    esdv()
        .current_dir(tmp.path())
        .args(["cdm", path.to_str().unwrap(), "--voltage", "250"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 301 samples"))
        .stdout(predicate::str::contains("CDM JS-002"))
        .stdout(predicate::str::contains("Full width at half maximum"))
        .stdout(predicate::str::contains("Verdict: PASS"));
}

#[test]
fn test_cdm_json_report() {
    let tmp = TempDir::new().unwrap();
    let path = write_capture(&tmp, "cdm.csv", &cdm_pulse());

    let output = esdv()
        .current_dir(tmp.path())
        .args(["-o", "json", "cdm", path.to_str().unwrap(), "--voltage", "250"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["standard"], "cdm");
    assert_eq!(report["verdict"], "pass");
    assert_eq!(report["characteristics"].as_array().unwrap().len(), 4);
    assert_eq!(report["details"]["configuration"]["target"], "large");
}

#[test]
fn test_cdm_negative_voltage() {
    let tmp = TempDir::new().unwrap();
    let path = write_capture(&tmp, "neg.csv", &cdm_pulse().scale_vertically(-1.0));

    esdv()
        .current_dir(tmp.path())
        .args(["-o", "yaml", "cdm", path.to_str().unwrap(), "--voltage", "-250"])
        .assert()
        .success()
        .stdout(predicate::str::contains("polarity: negative"))
        .stdout(predicate::str::contains("verdict: pass"));
}

#[test]
fn test_cdm_failure_reported_without_strict() {
    let tmp = TempDir::new().unwrap();
    let path = write_capture(&tmp, "cdm.csv", &cdm_pulse());

    esdv()
        .current_dir(tmp.path())
        .args(["cdm", path.to_str().unwrap(), "--voltage", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn test_cdm_strict_failure_exits_nonzero() {
    let tmp = TempDir::new().unwrap();
    let path = write_capture(&tmp, "cdm.csv", &cdm_pulse());

    esdv()
        .current_dir(tmp.path())
        .args(["cdm", path.to_str().unwrap(), "--voltage", "500", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not compliant"));
}

#[test]
fn test_cdm_invalid_voltage_fails() {
    let tmp = TempDir::new().unwrap();
    let path = write_capture(&tmp, "cdm.csv", &cdm_pulse());

    esdv()
        .current_dir(tmp.path())
        .args(["cdm", path.to_str().unwrap(), "--voltage", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Test voltage"));
}

#[test]
fn test_missing_capture_fails() {
    let tmp = TempDir::new().unwrap();

    esdv()
        .current_dir(tmp.path())
        .args(["cdm", "absent.csv", "--voltage", "250"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read waveform file"));
}

#[test]
fn test_capture_without_samples_fails() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("header.csv");
    fs::write(&path, "Time,Ch1\nnot,numbers\n").unwrap();

    esdv()
        .current_dir(tmp.path())
        .args(["hbm", path.to_str().unwrap(), "--voltage", "500"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No samples found"));
}

// ============================================================================
// HBM Command Tests
// ============================================================================

#[test]
fn test_hbm_zero_ohm_text_report() {
    let tmp = TempDir::new().unwrap();
    let path = write_capture(&tmp, "hbm.csv", &hbm_capture());

    esdv()
        .current_dir(tmp.path())
        .args(["hbm", path.to_str().unwrap(), "--voltage", "500", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HBM JS-001 (0 Ω)"))
        .stdout(predicate::str::contains("Decay time"))
        .stdout(predicate::str::contains("Ringing"))
        .stdout(predicate::str::contains("Verdict: PASS"));
}

#[test]
fn test_hbm_filtered_noise_yaml() {
    let tmp = TempDir::new().unwrap();
    let path = write_capture(&tmp, "hbm.csv", &hbm_capture());

    esdv()
        .current_dir(tmp.path())
        .args([
            "-o",
            "yaml",
            "hbm",
            path.to_str().unwrap(),
            "--voltage",
            "500",
            "--noise",
            "filtered",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("noise: filtered"))
        .stdout(predicate::str::contains("verdict: pass"));
}

#[test]
fn test_hbm_pre_trigger_needs_cutoff() {
    let tmp = TempDir::new().unwrap();
    let path = write_capture(&tmp, "hbm.csv", &hbm_capture());

    esdv()
        .current_dir(tmp.path())
        .args([
            "hbm",
            path.to_str().unwrap(),
            "--voltage",
            "500",
            "--noise",
            "pre-trigger",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--noise-cutoff"));
}

#[test]
fn test_hbm_500_ohm_negative_discharge() {
    let tmp = TempDir::new().unwrap();
    let path = write_capture(
        &tmp,
        "hbm500.csv",
        &hbm_500_ohm_discharge(1.8).scale_vertically(-1.0),
    );

    let output = esdv()
        .current_dir(tmp.path())
        .args([
            "--output",
            "json",
            "hbm",
            path.to_str().unwrap(),
            "--voltage",
            "-4000",
            "--load",
            "500-ohm",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["standard"], "hbm-500-ohm");
    assert_eq!(report["verdict"], "pass");
    let peak = report["details"]["peak_current"]["value"].as_f64().unwrap();
    assert!((peak + 1.8).abs() < 1e-9);
}

// ============================================================================
// Table Command Tests
// ============================================================================

#[test]
fn test_table_lists_published_levels() {
    esdv()
        .args(["table", "hbm-zero-ohm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("JS-001 HBM 0 Ω"))
        .stdout(predicate::str::contains("8000 V"))
        .stdout(predicate::str::contains("Decay time"));
}

#[test]
fn test_table_resolves_voltage() {
    let output = esdv()
        .args(["-o", "json", "table", "cdm", "--target", "small", "--voltage", "375"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let resolved: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(resolved["resolution"]["kind"], "interpolated");
    assert_eq!(resolved["voltage"], 375.0);
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_show_merges_explicit_file() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("custom.yaml");
    fs::write(&config, "cdm:\n  target: small\n").unwrap();

    esdv()
        .current_dir(tmp.path())
        .args(["config", "show", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("target: small"));
}

#[test]
fn test_local_config_sets_output_format() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("esdv.yaml"), "output: json\n").unwrap();
    let path = write_capture(&tmp, "cdm.csv", &cdm_pulse());

    let output = esdv()
        .current_dir(tmp.path())
        .args(["cdm", path.to_str().unwrap(), "--voltage", "250"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["verdict"], "pass");
}

#[test]
fn test_invalid_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("bad.yaml");
    fs::write(&config, "cdm:\n  target: medium\n").unwrap();

    esdv()
        .current_dir(tmp.path())
        .env("ESDV_CONFIG", &config)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_config_path_lists_locations() {
    let tmp = TempDir::new().unwrap();

    esdv()
        .current_dir(tmp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("esdv.yaml"));
}

// ============================================================================
// Completions
// ============================================================================

#[test]
fn test_bash_completions() {
    esdv()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("esdv"));
}

//! ESDV: ESD waveform verifier
//!
//! Evaluates captured electrostatic-discharge current waveforms against the
//! JS-002 charged-device model and the JS-001 human-body model (0 Ω and
//! 500 Ω loads), reporting each measured characteristic with its tolerance
//! and a pass/fail verdict.

pub mod cli;
pub mod core;
pub mod import;
pub mod standards;

//! Errors raised by the numeric analysis primitives

use miette::Diagnostic;
use thiserror::Error;

/// Invalid input to an analysis primitive or evaluator parameter
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum AnalysisError {
    #[error("Waveform contains no samples")]
    #[diagnostic(code(esdv::analysis::empty_waveform))]
    EmptyWaveform,

    #[error("Threshold must be a finite number, got {0}")]
    #[diagnostic(code(esdv::analysis::threshold))]
    NonFiniteThreshold(f64),

    #[error("Cannot map a value out of a zero-width range ({low} to {high})")]
    #[diagnostic(code(esdv::analysis::zero_width_range))]
    ZeroWidthRange { low: f64, high: f64 },

    #[error("Polynomial coefficient a{index} must be finite, got {value}")]
    #[diagnostic(code(esdv::analysis::coefficient))]
    NonFiniteCoefficient { index: usize, value: f64 },

    #[error("Exponential fit requires positive amplitudes, found {amplitude} at t = {time} s")]
    #[diagnostic(
        code(esdv::analysis::exponential_fit),
        help("only fit the decaying tail of a pulse after polarity normalization")
    )]
    NonPositiveAmplitude { time: f64, amplitude: f64 },

    #[error("Fit requires at least {required} samples, got {actual}")]
    #[diagnostic(code(esdv::analysis::insufficient_samples))]
    InsufficientSamples { required: usize, actual: usize },

    #[error("{name} must be {expected}, got {value}")]
    #[diagnostic(code(esdv::analysis::parameter))]
    InvalidParameter {
        name: &'static str,
        expected: &'static str,
        value: f64,
    },

    #[error("Rise time start fraction ({start}) must be below the end fraction ({end})")]
    #[diagnostic(code(esdv::analysis::rise_fractions))]
    RiseFractionsOutOfOrder { start: f64, end: f64 },

    #[error("Test voltage must be finite, non-zero and within ±{limit} V, got {value}")]
    #[diagnostic(code(esdv::analysis::voltage))]
    InvalidVoltage { value: f64, limit: f64 },
}

/// Ensure `value` lies in the given range, naming the parameter on failure
pub(crate) fn check_parameter(
    name: &'static str,
    value: f64,
    accepts: impl Fn(f64) -> bool,
    expected: &'static str,
) -> Result<f64, AnalysisError> {
    if value.is_finite() && accepts(value) {
        Ok(value)
    } else {
        Err(AnalysisError::InvalidParameter {
            name,
            expected,
            value,
        })
    }
}

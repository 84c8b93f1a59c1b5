//! Compliance standards and their waveform evaluators
//!
//! Each evaluator takes a borrowed [`Waveform`] and a signed test voltage,
//! normalizes the waveform to positive polarity, runs the measurements the
//! standard prescribes in a fixed order and keeps the results as a frozen
//! snapshot. A measurement that cannot be completed (a threshold that is
//! never crossed, an empty segment, a failed fit) is left as `None` rather
//! than aborting the evaluation.

pub mod cdm;
pub mod hbm_500_ohm;
pub mod hbm_zero_ohm;

pub use cdm::{Bandwidth, CdmConfiguration, CdmJs002, TargetSize};
pub use hbm_500_ohm::HbmFiveHundredOhmJs001;
pub use hbm_zero_ohm::{
    DoublePeakDetection, HbmZeroOhmJs001, HbmZeroOhmOptions, NoiseCompensation,
};

use std::borrow::Cow;
use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::error::{check_parameter, AnalysisError};
use crate::core::threshold::{crossing, ScanDirection};
use crate::core::tolerance::{Band, ToleranceError};
use crate::core::waveform::{Sample, Waveform};

/// Largest test voltage magnitude accepted by the evaluators
pub const MAX_TEST_VOLTAGE: f64 = 100_000.0;

/// Fatal problems with evaluator inputs
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum EvaluationError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tolerance(#[from] ToleranceError),
}

/// Modeled compliance standards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Standard {
    /// Charged-device model, JS-002
    Cdm,
    /// Human-body model into a shorted (0 Ω) load, JS-001
    HbmZeroOhm,
    /// Human-body model into a 500 Ω load, JS-001
    #[serde(rename = "hbm-500-ohm")]
    Hbm500Ohm,
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Standard::Cdm => write!(f, "CDM JS-002"),
            Standard::HbmZeroOhm => write!(f, "HBM JS-001 (0 Ω)"),
            Standard::Hbm500Ohm => write!(f, "HBM JS-001 (500 Ω)"),
        }
    }
}

/// Load the human-body-model tester discharges into, keying the JS-001 tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HbmLoad {
    #[default]
    ZeroOhm,
    #[serde(rename = "500-ohm")]
    FiveHundredOhm,
}

impl fmt::Display for HbmLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HbmLoad::ZeroOhm => write!(f, "0 Ω"),
            HbmLoad::FiveHundredOhm => write!(f, "500 Ω"),
        }
    }
}

/// Sign of the test voltage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn of(voltage: f64) -> Self {
        if voltage < 0.0 {
            Polarity::Negative
        } else {
            Polarity::Positive
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            Polarity::Positive => 1.0,
            Polarity::Negative => -1.0,
        }
    }

    /// Convert an absolute-domain value into the signed domain (and back)
    pub fn apply(self, value: f64) -> f64 {
        value * self.sign()
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Positive => write!(f, "positive"),
            Polarity::Negative => write!(f, "negative"),
        }
    }
}

/// Reject voltages that are non-finite, zero or beyond [`MAX_TEST_VOLTAGE`]
pub fn validate_voltage(voltage: f64) -> Result<f64, AnalysisError> {
    if voltage.is_finite() && voltage != 0.0 && voltage.abs() <= MAX_TEST_VOLTAGE {
        Ok(voltage)
    } else {
        Err(AnalysisError::InvalidVoltage {
            value: voltage,
            limit: MAX_TEST_VOLTAGE,
        })
    }
}

/// Waveform and voltage shared by every evaluator
#[derive(Debug, Clone)]
pub(crate) struct StandardInput<'w> {
    pub waveform: &'w Waveform,
    pub voltage: f64,
    pub polarity: Polarity,
    absolute: Cow<'w, Waveform>,
}

impl<'w> StandardInput<'w> {
    pub fn new(waveform: &'w Waveform, voltage: f64) -> Result<Self, AnalysisError> {
        let voltage = validate_voltage(voltage)?;
        let polarity = Polarity::of(voltage);
        let absolute = match polarity {
            Polarity::Positive => Cow::Borrowed(waveform),
            Polarity::Negative => Cow::Owned(waveform.scale_vertically(-1.0)),
        };
        Ok(Self {
            waveform,
            voltage,
            polarity,
            absolute,
        })
    }

    /// Waveform normalized to positive polarity
    pub fn absolute(&self) -> &Waveform {
        &self.absolute
    }

    pub fn signed(&self, sample: Sample) -> Sample {
        Sample::new(sample.time, self.polarity.apply(sample.amplitude))
    }

    pub fn signed_value(&self, value: f64) -> f64 {
        self.polarity.apply(value)
    }

    pub fn signed_band(&self, band: Band) -> Band {
        band.scaled(self.polarity.sign())
    }
}

/// Thresholds, as fractions of peak, bounding the rise-time measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiseTimeFractions {
    pub start: f64,
    pub end: f64,
}

impl RiseTimeFractions {
    pub fn new(start: f64, end: f64) -> Result<Self, AnalysisError> {
        let start = check_parameter(
            "rise time start fraction",
            start,
            |v| (0.0..1.0).contains(&v),
            "in [0, 1)",
        )?;
        let end = check_parameter(
            "rise time end fraction",
            end,
            |v| v > 0.0 && v <= 1.0,
            "in (0, 1]",
        )?;
        if start >= end {
            return Err(AnalysisError::RiseFractionsOutOfOrder { start, end });
        }
        Ok(Self { start, end })
    }

    pub(crate) fn validated(self) -> Result<Self, AnalysisError> {
        Self::new(self.start, self.end)
    }
}

impl Default for RiseTimeFractions {
    fn default() -> Self {
        Self {
            start: 0.1,
            end: 0.9,
        }
    }
}

/// Crossing search used by evaluators, where a miss or invalid segment only degrades a measurement
pub(crate) fn find_crossing(
    waveform: &Waveform,
    threshold: f64,
    direction: ScanDirection,
    what: &str,
) -> Option<Sample> {
    match crossing(waveform, threshold, direction) {
        Ok(Some(hit)) => Some(hit),
        Ok(None) => {
            warn!(threshold, "{} threshold is never crossed", what);
            None
        }
        Err(e) => {
            warn!(threshold, error = %e, "cannot search for {} crossing", what);
            None
        }
    }
}

/// Leading-edge rise time on a positive-polarity waveform.
///
/// The end point is the first crossing of `end × peak`; the start point is
/// the last crossing of `start × peak` at or before it. Returned anchors are
/// in the absolute domain.
pub(crate) fn measure_rise_time(
    absolute: &Waveform,
    peak: f64,
    fractions: RiseTimeFractions,
) -> Option<(Sample, Sample)> {
    let end = find_crossing(
        absolute,
        fractions.end * peak,
        ScanDirection::Forward,
        "rise time end",
    )?;
    let leading = absolute.trim_end(end.time);
    let start = find_crossing(
        &leading,
        fractions.start * peak,
        ScanDirection::Backward,
        "rise time start",
    )?;
    debug!(start = start.time, end = end.time, "measured rise time");
    Some((start, end))
}

/// Allowed region for a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Between(Band),
    AtMost(f64),
    AtLeast(f64),
}

impl Limit {
    pub fn contains(&self, value: f64) -> bool {
        match self {
            Limit::Between(band) => band.contains(value),
            Limit::AtMost(max) => value <= *max,
            Limit::AtLeast(min) => value >= *min,
        }
    }
}

/// Physical quantity of a characteristic, used for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    Current,
    Time,
    Ratio,
}

/// Overall outcome of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Every characteristic was measured and is within its limit
    Pass,
    /// At least one characteristic is out of its limit
    Fail,
    /// Nothing failed, but at least one characteristic could not be measured
    Incomplete,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Fail => write!(f, "fail"),
            Verdict::Incomplete => write!(f, "incomplete"),
        }
    }
}

/// Presentation-neutral view of one measured characteristic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacteristicSummary {
    pub name: &'static str,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Limit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
}

impl CharacteristicSummary {
    fn new(name: &'static str, quantity: Quantity) -> Self {
        Self {
            name,
            quantity,
            measured: None,
            allowed: None,
            passed: None,
        }
    }

    fn measured(mut self, value: Option<f64>, passed: Option<bool>) -> Self {
        self.measured = value;
        self.passed = passed;
        self
    }

    fn allowed(mut self, limit: Option<Limit>) -> Self {
        self.allowed = limit;
        self
    }
}

/// Common read-only interface over evaluator results
pub trait Evaluation {
    fn standard(&self) -> Standard;

    /// Signed test voltage
    fn voltage(&self) -> f64;

    fn characteristics(&self) -> Vec<CharacteristicSummary>;

    fn verdict(&self) -> Verdict {
        let summaries = self.characteristics();
        if summaries.iter().any(|c| c.passed == Some(false)) {
            Verdict::Fail
        } else if summaries.iter().all(|c| c.passed == Some(true)) {
            Verdict::Pass
        } else {
            Verdict::Incomplete
        }
    }

    /// True only when every characteristic was measured and passed
    fn passes(&self) -> bool {
        self.verdict() == Verdict::Pass
    }
}

// ============================================================================
// Measurements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakCurrent {
    /// Signed peak current in amperes
    pub value: f64,
    /// Signed sample the value is anchored to
    pub point: Sample,
    /// Signed allowed band
    pub allowed: Band,
    pub passed: bool,
}

impl PeakCurrent {
    fn summary(peak: Option<&Self>, allowed: Band) -> CharacteristicSummary {
        CharacteristicSummary::new("Peak current", Quantity::Current)
            .measured(peak.map(|p| p.value), peak.map(|p| p.passed))
            .allowed(Some(Limit::Between(allowed)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiseTime {
    /// Seconds
    pub value: f64,
    pub start: Sample,
    pub end: Sample,
    pub allowed: Limit,
    pub passed: bool,
}

impl RiseTime {
    fn summary(rise: Option<&Self>, allowed: Limit) -> CharacteristicSummary {
        CharacteristicSummary::new("Rise time", Quantity::Time)
            .measured(rise.map(|r| r.value), rise.map(|r| r.passed))
            .allowed(Some(allowed))
    }

    /// Build from absolute-domain crossings
    pub(crate) fn from_crossings(
        input: &StandardInput<'_>,
        (start, end): (Sample, Sample),
        allowed: Limit,
    ) -> Self {
        let value = end.time - start.time;
        Self {
            value,
            start: input.signed(start),
            end: input.signed(end),
            allowed,
            passed: allowed.contains(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FullWidthHalfMax {
    /// Seconds
    pub value: f64,
    pub start: Sample,
    pub end: Sample,
    pub allowed: Band,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Undershoot {
    /// Signed undershoot current, 0 when the tail never reverses
    pub value: f64,
    /// Signed minimum of the undershoot window
    pub point: Sample,
    /// `peak × fraction`, a lower bound for positive polarity and an upper
    /// bound for negative polarity
    pub allowed: Limit,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecayTime {
    /// Seconds from peak to the 1/e point of the fitted decay
    pub value: f64,
    pub start: Sample,
    pub end: Sample,
    pub allowed: Band,
    pub passed: bool,
    /// Whether the fitted curve had to be extended past the end of the capture
    pub extended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ringing {
    /// Sum of the largest positive and negative deviations, amperes
    pub total: f64,
    /// `total / |Ips|`
    pub ratio: f64,
    /// Signed anchor of the largest positive deviation, noise removed
    pub positive: Sample,
    /// Signed anchor of the largest negative deviation, noise removed
    pub negative: Sample,
    pub allowed_ratio: f64,
    pub passed: bool,
}

impl Ringing {
    pub fn percent(&self) -> f64 {
        self.ratio * 100.0
    }
}

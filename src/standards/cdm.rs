//! Charged-device model evaluation (JS-002)
//!
//! Measures peak current, rise time, full width at half maximum and
//! undershoot, each against the JS-002 tolerance entry for the test
//! voltage, target size and oscilloscope bandwidth.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::{check_parameter, AnalysisError};
use crate::core::threshold::ScanDirection;
use crate::core::tolerance::{Band, ResolvedTolerance, ToleranceRow, ToleranceTable};
use crate::core::waveform::{Sample, Waveform};
use crate::standards::{
    find_crossing, measure_rise_time, CharacteristicSummary, Evaluation, EvaluationError,
    FullWidthHalfMax, Limit, PeakCurrent, Polarity, Quantity, RiseTime, RiseTimeFractions,
    Standard, StandardInput, Undershoot,
};

/// Verification module size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSize {
    #[default]
    Large,
    Small,
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSize::Large => write!(f, "large"),
            TargetSize::Small => write!(f, "small"),
        }
    }
}

/// Oscilloscope bandwidth class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bandwidth {
    /// 6 GHz or more
    #[default]
    High,
    /// 1 GHz
    Low,
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bandwidth::High => write!(f, "high"),
            Bandwidth::Low => write!(f, "low"),
        }
    }
}

/// Table key for JS-002
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CdmConfiguration {
    pub target: TargetSize,
    pub bandwidth: Bandwidth,
}

impl CdmConfiguration {
    pub const fn new(target: TargetSize, bandwidth: Bandwidth) -> Self {
        Self { target, bandwidth }
    }
}

impl fmt::Display for CdmConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} target, {} bandwidth", self.target, self.bandwidth)
    }
}

/// Voltage-independent limits of a JS-002 configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CdmCharacteristics {
    /// Seconds
    pub rise_time_max: f64,
    /// Seconds
    pub full_width_half_max: Band,
    /// Allowed undershoot as a (negative) fraction of peak current
    pub undershoot_fraction: f64,
}

const fn characteristics(config: CdmConfiguration) -> CdmCharacteristics {
    match (config.target, config.bandwidth) {
        (TargetSize::Large, Bandwidth::High) => CdmCharacteristics {
            rise_time_max: 350e-12,
            full_width_half_max: Band::new(450e-12, 900e-12),
            undershoot_fraction: -0.5,
        },
        (TargetSize::Large, Bandwidth::Low) => CdmCharacteristics {
            rise_time_max: 450e-12,
            full_width_half_max: Band::new(500e-12, 1000e-12),
            undershoot_fraction: -0.5,
        },
        (TargetSize::Small, Bandwidth::High) => CdmCharacteristics {
            rise_time_max: 250e-12,
            full_width_half_max: Band::new(250e-12, 600e-12),
            undershoot_fraction: -0.7,
        },
        (TargetSize::Small, Bandwidth::Low) => CdmCharacteristics {
            rise_time_max: 350e-12,
            full_width_half_max: Band::new(325e-12, 725e-12),
            undershoot_fraction: -0.7,
        },
    }
}

const fn row(
    target: TargetSize,
    bandwidth: Bandwidth,
    voltage: f64,
    min: f64,
    max: f64,
) -> ToleranceRow<CdmConfiguration, CdmCharacteristics> {
    let key = CdmConfiguration::new(target, bandwidth);
    ToleranceRow {
        key,
        voltage,
        peak_current: Band::new(min, max),
        characteristics: characteristics(key),
    }
}

use Bandwidth::{High, Low};
use TargetSize::{Large, Small};

static CDM_ROWS: [ToleranceRow<CdmConfiguration, CdmCharacteristics>; 20] = [
    row(Large, High, 125.0, 2.3, 3.8),
    row(Large, High, 250.0, 4.8, 7.3),
    row(Large, High, 500.0, 10.3, 13.9),
    row(Large, High, 750.0, 15.5, 20.9),
    row(Large, High, 1000.0, 20.6, 27.9),
    row(Large, Low, 125.0, 1.9, 3.2),
    row(Large, Low, 250.0, 4.2, 6.3),
    row(Large, Low, 500.0, 9.1, 12.3),
    row(Large, Low, 750.0, 13.7, 18.5),
    row(Large, Low, 1000.0, 18.3, 24.7),
    row(Small, High, 125.0, 1.4, 2.3),
    row(Small, High, 250.0, 2.9, 4.3),
    row(Small, High, 500.0, 6.1, 8.3),
    row(Small, High, 750.0, 9.2, 12.4),
    row(Small, High, 1000.0, 12.2, 16.5),
    row(Small, Low, 125.0, 1.0, 1.6),
    row(Small, Low, 250.0, 2.1, 3.1),
    row(Small, Low, 500.0, 4.4, 5.9),
    row(Small, Low, 750.0, 6.6, 8.9),
    row(Small, Low, 1000.0, 8.8, 11.9),
];

/// Published JS-002 tolerances
pub static CDM_TOLERANCES: ToleranceTable<CdmConfiguration, CdmCharacteristics> = ToleranceTable {
    name: "JS-002 CDM",
    rows: &CDM_ROWS,
};

/// Measurement parameters for a CDM evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CdmOptions {
    pub rise_time: RiseTimeFractions,
    /// Fraction of peak the full width is measured at
    pub full_width_fraction: f64,
    /// Length of the undershoot window after the peak, in multiples of the FWHM
    pub undershoot_window: f64,
}

impl Default for CdmOptions {
    fn default() -> Self {
        Self {
            rise_time: RiseTimeFractions::default(),
            full_width_fraction: 0.5,
            undershoot_window: 2.5,
        }
    }
}

impl CdmOptions {
    fn validated(self) -> Result<Self, AnalysisError> {
        self.rise_time.validated()?;
        check_parameter(
            "full width fraction",
            self.full_width_fraction,
            |v| v > 0.0 && v < 1.0,
            "in (0, 1)",
        )?;
        check_parameter(
            "undershoot window multiplier",
            self.undershoot_window,
            |v| v > 0.0,
            "positive",
        )?;
        Ok(self)
    }
}

/// JS-002 evaluation of one capture
#[derive(Debug, Clone, Serialize)]
pub struct CdmJs002<'w> {
    #[serde(skip)]
    input: StandardInput<'w>,

    /// Signed test voltage
    pub voltage: f64,
    pub polarity: Polarity,
    pub configuration: CdmConfiguration,
    pub options: CdmOptions,
    pub tolerance: ResolvedTolerance<CdmCharacteristics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_current: Option<PeakCurrent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rise_time: Option<RiseTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_width_half_max: Option<FullWidthHalfMax>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undershoot: Option<Undershoot>,
}

impl<'w> CdmJs002<'w> {
    pub fn new(
        waveform: &'w Waveform,
        voltage: f64,
        configuration: CdmConfiguration,
    ) -> Result<Self, EvaluationError> {
        Self::with_options(waveform, voltage, configuration, CdmOptions::default())
    }

    pub fn with_options(
        waveform: &'w Waveform,
        voltage: f64,
        configuration: CdmConfiguration,
        options: CdmOptions,
    ) -> Result<Self, EvaluationError> {
        let options = options.validated()?;
        let input = StandardInput::new(waveform, voltage)?;
        let tolerance = CDM_TOLERANCES.lookup(&configuration, voltage)?;
        let limits = tolerance.characteristics;

        let peak = input.absolute().maximum();
        let peak_current = peak.map(|p| {
            let allowed = input.signed_band(tolerance.peak_current);
            let value = input.signed_value(p.amplitude);
            PeakCurrent {
                value,
                point: input.signed(p),
                allowed,
                passed: allowed.contains(value),
            }
        });

        let rise_time = peak
            .and_then(|p| measure_rise_time(input.absolute(), p.amplitude, options.rise_time))
            .map(|crossings| {
                RiseTime::from_crossings(&input, crossings, Limit::AtMost(limits.rise_time_max))
            });

        let full_width_half_max = peak.and_then(|p| {
            full_width(&input, p, options.full_width_fraction, limits.full_width_half_max)
        });

        let undershoot = match (peak, &full_width_half_max) {
            (Some(p), Some(width)) => Some(undershoot(
                &input,
                p,
                width.value * options.undershoot_window,
                limits.undershoot_fraction,
            )),
            _ => None,
        };

        let evaluation = Self {
            voltage: input.voltage,
            polarity: input.polarity,
            input,
            configuration,
            options,
            tolerance,
            peak_current,
            rise_time,
            full_width_half_max,
            undershoot,
        };
        info!(
            standard = %Standard::Cdm,
            voltage,
            configuration = %configuration,
            verdict = %evaluation.verdict(),
            "evaluated waveform"
        );
        Ok(evaluation)
    }

    /// Waveform the evaluation was run on
    pub fn waveform(&self) -> &'w Waveform {
        self.input.waveform
    }

    /// Signed limit for the undershoot, derived from the measured peak
    fn undershoot_limit(&self) -> Option<Limit> {
        self.undershoot.map(|u| u.allowed).or_else(|| {
            self.peak_current.map(|p| {
                undershoot_limit(
                    self.polarity,
                    p.value * self.tolerance.characteristics.undershoot_fraction,
                )
            })
        })
    }
}

fn full_width(
    input: &StandardInput<'_>,
    peak: Sample,
    fraction: f64,
    allowed: Band,
) -> Option<FullWidthHalfMax> {
    let threshold = fraction * peak.amplitude;
    let start = find_crossing(
        input.absolute(),
        threshold,
        ScanDirection::Forward,
        "full width start",
    )?;
    let end = find_crossing(
        &input.absolute().trim_start(peak.time),
        threshold,
        ScanDirection::Forward,
        "full width end",
    )?;
    let value = end.time - start.time;
    debug!(start = start.time, end = end.time, "measured full width");
    Some(FullWidthHalfMax {
        value,
        start: input.signed(start),
        end: input.signed(end),
        allowed,
        passed: allowed.contains(value),
    })
}

fn undershoot_limit(polarity: Polarity, allowed: f64) -> Limit {
    match polarity {
        Polarity::Positive => Limit::AtLeast(allowed),
        Polarity::Negative => Limit::AtMost(allowed),
    }
}

fn undershoot(
    input: &StandardInput<'_>,
    peak: Sample,
    window_length: f64,
    fraction: f64,
) -> Undershoot {
    let window = input
        .absolute()
        .trim_start(peak.time)
        .trim_end(peak.time + window_length);
    // The window always holds the peak sample itself
    let minimum = window.minimum().unwrap_or(peak);

    let value = if minimum.amplitude > 0.0 {
        0.0
    } else {
        input.signed_value(minimum.amplitude)
    };
    let allowed = undershoot_limit(
        input.polarity,
        input.signed_value(peak.amplitude) * fraction,
    );
    debug!(value, time = minimum.time, "measured undershoot");

    Undershoot {
        value,
        point: input.signed(minimum),
        allowed,
        passed: allowed.contains(value),
    }
}

impl Evaluation for CdmJs002<'_> {
    fn standard(&self) -> Standard {
        Standard::Cdm
    }

    fn voltage(&self) -> f64 {
        self.voltage
    }

    fn characteristics(&self) -> Vec<CharacteristicSummary> {
        let signed_peak_band = self.input.signed_band(self.tolerance.peak_current);
        vec![
            PeakCurrent::summary(self.peak_current.as_ref(), signed_peak_band),
            RiseTime::summary(
                self.rise_time.as_ref(),
                Limit::AtMost(self.tolerance.characteristics.rise_time_max),
            ),
            CharacteristicSummary::new("Full width at half maximum", Quantity::Time)
                .measured(
                    self.full_width_half_max.map(|w| w.value),
                    self.full_width_half_max.map(|w| w.passed),
                )
                .allowed(Some(Limit::Between(
                    self.tolerance.characteristics.full_width_half_max,
                ))),
            CharacteristicSummary::new("Undershoot", Quantity::Current)
                .measured(
                    self.undershoot.map(|u| u.value),
                    self.undershoot.map(|u| u.passed),
                )
                .allowed(self.undershoot_limit()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const LARGE_HIGH: CdmConfiguration = CdmConfiguration::new(TargetSize::Large, Bandwidth::High);

    /// 10 ps steps: flat until 1.0 ns, up to 6 A at 1.3 ns, back to zero at
    /// 2.0 ns, -1 A undershoot at 2.2 ns, settled at 2.6 ns.
    fn pulse() -> Waveform {
        (0..=300)
            .map(|k| {
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

    #[test]
    fn test_table_has_every_configuration() {
        for target in [TargetSize::Large, TargetSize::Small] {
            for bandwidth in [Bandwidth::High, Bandwidth::Low] {
                let key = CdmConfiguration::new(target, bandwidth);
                assert_eq!(CDM_TOLERANCES.rows_for(&key).count(), 5, "{}", key);
            }
        }
    }

    #[test]
    fn test_positive_pulse_passes() {
        let wf = pulse();
        let cdm = CdmJs002::new(&wf, 250.0, LARGE_HIGH).unwrap();

        let peak = cdm.peak_current.unwrap();
        assert_relative_eq!(peak.value, 6.0, epsilon = 1e-12);
        assert_relative_eq!(peak.point.time, 1.3e-9, epsilon = 1e-15);
        assert_eq!(peak.allowed, Band::new(4.8, 7.3));

        let rise = cdm.rise_time.unwrap();
        assert_relative_eq!(rise.value, 0.24e-9, epsilon = 1e-15);
        assert!(rise.passed);

        let width = cdm.full_width_half_max.unwrap();
        assert_relative_eq!(width.start.time, 1.15e-9, epsilon = 1e-15);
        assert_relative_eq!(width.end.time, 1.65e-9, epsilon = 1e-15);
        assert_relative_eq!(width.value, 0.5e-9, epsilon = 1e-15);

        let undershoot = cdm.undershoot.unwrap();
        assert_relative_eq!(undershoot.value, -1.0, epsilon = 1e-12);
        assert_relative_eq!(undershoot.point.time, 2.2e-9, epsilon = 1e-15);
        assert_eq!(undershoot.allowed, Limit::AtLeast(-3.0));

        assert!(cdm.passes());
    }

    #[test]
    fn test_negative_pulse_is_reported_signed() {
        let wf = pulse().scale_vertically(-1.0);
        let cdm = CdmJs002::new(&wf, -250.0, LARGE_HIGH).unwrap();

        let peak = cdm.peak_current.unwrap();
        assert_relative_eq!(peak.value, -6.0, epsilon = 1e-12);
        assert_eq!(peak.allowed, Band::new(-4.8, -7.3));
        assert!(peak.passed);

        let undershoot = cdm.undershoot.unwrap();
        assert_relative_eq!(undershoot.value, 1.0, epsilon = 1e-12);
        assert_eq!(undershoot.allowed, Limit::AtMost(3.0));
        assert!(undershoot.passed);

        let rise = cdm.rise_time.unwrap();
        assert!(rise.end.amplitude < 0.0, "anchors are signed");
        assert!(cdm.passes());
    }

    #[test]
    fn test_undershoot_clamped_when_tail_stays_positive() {
        let wf: Waveform = pulse()
            .samples()
            .iter()
            .map(|s| Sample::new(s.time, s.amplitude.max(0.0) + 0.1))
            .collect();
        let cdm = CdmJs002::new(&wf, 250.0, LARGE_HIGH).unwrap();
        let undershoot = cdm.undershoot.unwrap();
        assert_eq!(undershoot.value, 0.0);
        assert!(undershoot.passed);
    }

    #[test]
    fn test_peak_out_of_band_fails() {
        let wf = pulse();
        let cdm = CdmJs002::new(&wf, 500.0, LARGE_HIGH).unwrap();
        assert!(!cdm.peak_current.unwrap().passed);
        assert!(!cdm.passes());
        assert_eq!(cdm.verdict(), crate::standards::Verdict::Fail);
    }

    #[test]
    fn test_small_target_limits() {
        let wf = pulse();
        let config = CdmConfiguration::new(TargetSize::Small, Bandwidth::High);
        let cdm = CdmJs002::new(&wf, 250.0, config).unwrap();
        assert!(!cdm.peak_current.unwrap().passed, "6 A exceeds 2.9-4.3 A");
        assert!(cdm.rise_time.unwrap().passed);
        assert!(cdm.full_width_half_max.unwrap().passed);
        assert_eq!(cdm.undershoot.unwrap().allowed, Limit::AtLeast(-6.0 * 0.7));
    }

    #[test]
    fn test_interpolated_voltage() {
        let wf = pulse();
        let cdm = CdmJs002::new(&wf, 375.0, LARGE_HIGH).unwrap();
        assert_relative_eq!(cdm.tolerance.peak_current.min, 7.55, epsilon = 1e-12);
        assert_relative_eq!(cdm.tolerance.peak_current.max, 10.6, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_capture_degrades_measurements() {
        let wf: Waveform = (0..10).map(|k| Sample::new(k as f64 * 1e-11, 0.0)).collect();
        let cdm = CdmJs002::new(&wf, 250.0, LARGE_HIGH).unwrap();
        assert!(cdm.peak_current.is_some());
        assert!(!cdm.passes());
    }

    #[test]
    fn test_empty_capture_has_no_measurements() {
        let wf = Waveform::default();
        let cdm = CdmJs002::new(&wf, 250.0, LARGE_HIGH).unwrap();
        assert!(cdm.peak_current.is_none());
        assert!(cdm.rise_time.is_none());
        assert!(cdm.full_width_half_max.is_none());
        assert!(cdm.undershoot.is_none());
        assert_eq!(cdm.verdict(), crate::standards::Verdict::Incomplete);
    }

    #[test]
    fn test_invalid_inputs_are_fatal() {
        let wf = pulse();
        assert!(CdmJs002::new(&wf, 0.0, LARGE_HIGH).is_err());
        let options = CdmOptions {
            full_width_fraction: 1.0,
            ..CdmOptions::default()
        };
        assert!(CdmJs002::with_options(&wf, 250.0, LARGE_HIGH, options).is_err());
        let options = CdmOptions {
            undershoot_window: 0.0,
            ..CdmOptions::default()
        };
        assert!(CdmJs002::with_options(&wf, 250.0, LARGE_HIGH, options).is_err());
    }
}

//! Human-body model evaluation into a shorted load (JS-001, 0 Ω)
//!
//! The peak current is taken from a least-squares line fitted over a window
//! following the peak sample, which smooths single-sample spikes. Decay time
//! is read from an exponential fit of the trailing edge, and ringing is the
//! deviation of the raw signal from the fitted line within the same window.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::error::{check_parameter, AnalysisError};
use crate::core::filter::bessel_filter;
use crate::core::fit::{exponential_fit, least_squares_fit, ExponentialFit, Polynomial};
use crate::core::threshold::{crossing, ScanDirection};
use crate::core::tolerance::{Band, ResolvedTolerance, ToleranceRow, ToleranceTable};
use crate::core::waveform::{Sample, Waveform};
use crate::standards::{
    find_crossing, measure_rise_time, CharacteristicSummary, DecayTime, Evaluation,
    EvaluationError, HbmLoad, Limit, PeakCurrent, Polarity, Quantity, RiseTime,
    RiseTimeFractions, Ringing, Standard, StandardInput,
};

/// Fractions of |Ips| bounding the exponentially fitted trailing edge
const DECAY_FIT_START: f64 = 0.5;
const DECAY_FIT_END: f64 = 0.3;

/// Voltage-independent JS-001 limits into 0 Ω
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HbmZeroOhmCharacteristics {
    /// Seconds
    pub rise_time: Band,
    /// Seconds
    pub decay_time: Band,
    /// Largest allowed ringing as a fraction of |Ips|
    pub ringing_max: f64,
}

const LIMITS: HbmZeroOhmCharacteristics = HbmZeroOhmCharacteristics {
    rise_time: Band::new(2e-9, 10e-9),
    decay_time: Band::new(130e-9, 170e-9),
    ringing_max: 0.15,
};

const fn row(
    voltage: f64,
    min: f64,
    max: f64,
) -> ToleranceRow<HbmLoad, HbmZeroOhmCharacteristics> {
    ToleranceRow {
        key: HbmLoad::ZeroOhm,
        voltage,
        peak_current: Band::new(min, max),
        characteristics: LIMITS,
    }
}

static HBM_ZERO_OHM_ROWS: [ToleranceRow<HbmLoad, HbmZeroOhmCharacteristics>; 7] = [
    row(125.0, 0.075, 0.092),
    row(250.0, 0.15, 0.18),
    row(500.0, 0.30, 0.37),
    row(1000.0, 0.60, 0.73),
    row(2000.0, 1.20, 1.47),
    row(4000.0, 2.40, 2.93),
    row(8000.0, 4.80, 5.87),
];

/// Published JS-001 tolerances for the shorted load
pub static HBM_ZERO_OHM_TOLERANCES: ToleranceTable<HbmLoad, HbmZeroOhmCharacteristics> =
    ToleranceTable {
        name: "JS-001 HBM 0 Ω",
        rows: &HBM_ZERO_OHM_ROWS,
    };

/// Re-selection of a secondary peak that follows a dip.
///
/// Some testers produce a first hump followed by a second, often higher,
/// one. Scanning starts at the first local maximum reaching
/// `lower_cutoff × peak`. When, within the fit window after it, the signal
/// dips and then climbs by at least `minimum_increase × peak` above the dip
/// while reaching at least `lower_cutoff × peak`, the top of that second
/// hump is used as the peak. `peak` is the highest sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoublePeakDetection {
    pub lower_cutoff: f64,
    pub minimum_increase: f64,
}

impl Default for DoublePeakDetection {
    fn default() -> Self {
        Self {
            lower_cutoff: 0.9,
            minimum_increase: 0.05,
        }
    }
}

/// Noise floor subtracted from the ringing anchors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseCompensation {
    #[default]
    None,
    /// Extremes of the baseline up to `cutoff_time`, before the pulse starts
    PreTrigger { cutoff_time: f64 },
    /// Extremes of the raw signal minus its Bessel-filtered copy within the fit window
    Filtered,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HbmZeroOhmOptions {
    pub rise_time: RiseTimeFractions,
    /// Length of the least-squares window after the peak, seconds
    pub fit_window: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_peak: Option<DoublePeakDetection>,
    pub noise: NoiseCompensation,
    /// How far past the peak the fitted decay may be extended, seconds
    pub decay_search_limit: f64,
}

impl Default for HbmZeroOhmOptions {
    fn default() -> Self {
        Self {
            rise_time: RiseTimeFractions::default(),
            fit_window: 40e-9,
            double_peak: None,
            noise: NoiseCompensation::None,
            decay_search_limit: 1e-6,
        }
    }
}

impl HbmZeroOhmOptions {
    fn validated(self) -> Result<Self, AnalysisError> {
        self.rise_time.validated()?;
        check_parameter("fit window", self.fit_window, |v| v > 0.0, "positive")?;
        check_parameter(
            "decay search limit",
            self.decay_search_limit,
            |v| v > 0.0,
            "positive",
        )?;
        if let Some(detection) = self.double_peak {
            let fraction = |v: f64| v > 0.0 && v < 1.0;
            check_parameter(
                "double peak lower cutoff",
                detection.lower_cutoff,
                fraction,
                "in (0, 1)",
            )?;
            check_parameter(
                "double peak minimum increase",
                detection.minimum_increase,
                fraction,
                "in (0, 1)",
            )?;
        }
        if let NoiseCompensation::PreTrigger { cutoff_time } = self.noise {
            check_parameter("noise cutoff time", cutoff_time, |_| true, "finite")?;
        }
        Ok(self)
    }
}

/// JS-001 0 Ω evaluation of one capture
#[derive(Debug, Clone, Serialize)]
pub struct HbmZeroOhmJs001<'w> {
    #[serde(skip)]
    input: StandardInput<'w>,
    /// Absolute-domain samples within the fit window
    #[serde(skip)]
    fit_window: Waveform,

    /// Signed test voltage
    pub voltage: f64,
    pub polarity: Polarity,
    pub options: HbmZeroOhmOptions,
    pub tolerance: ResolvedTolerance<HbmZeroOhmCharacteristics>,
    /// Line fitted over the window after the peak, absolute domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_line: Option<Polynomial>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_current: Option<PeakCurrent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rise_time: Option<RiseTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay_time: Option<DecayTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ringing: Option<Ringing>,
}

impl<'w> HbmZeroOhmJs001<'w> {
    pub fn new(waveform: &'w Waveform, voltage: f64) -> Result<Self, EvaluationError> {
        Self::with_options(waveform, voltage, HbmZeroOhmOptions::default())
    }

    pub fn with_options(
        waveform: &'w Waveform,
        voltage: f64,
        options: HbmZeroOhmOptions,
    ) -> Result<Self, EvaluationError> {
        let options = options.validated()?;
        let input = StandardInput::new(waveform, voltage)?;
        let tolerance = HBM_ZERO_OHM_TOLERANCES.lookup(&HbmLoad::ZeroOhm, voltage)?;

        let mut evaluation = Self {
            voltage: input.voltage,
            polarity: input.polarity,
            input,
            fit_window: Waveform::default(),
            options,
            tolerance,
            fit_line: None,
            peak_current: None,
            rise_time: None,
            decay_time: None,
            ringing: None,
        };

        if let Some(peak) = evaluation.locate_peak() {
            evaluation.fit_window = evaluation
                .input
                .absolute()
                .gate(peak.time, peak.time + options.fit_window);
            if evaluation.fit_window.len() < 2 {
                warn!(
                    samples = evaluation.fit_window.len(),
                    "fit window after the peak is too short for a line fit"
                );
            } else {
                let line = least_squares_fit(&evaluation.fit_window);
                let ips = line.evaluate(peak.time);
                debug!(raw_peak = peak.amplitude, ips, "fitted peak current");
                evaluation.fit_line = Some(line);
                evaluation.measure(peak.time, ips, &line);
            }
        }

        info!(
            standard = %Standard::HbmZeroOhm,
            voltage,
            verdict = %evaluation.verdict(),
            "evaluated waveform"
        );
        Ok(evaluation)
    }

    pub fn waveform(&self) -> &'w Waveform {
        self.input.waveform
    }

    /// Peak sample in the absolute domain, after optional double-peak re-selection
    fn locate_peak(&self) -> Option<Sample> {
        let absolute = self.input.absolute();
        let highest = absolute.maximum()?;
        let Some(detection) = self.options.double_peak else {
            return Some(highest);
        };
        Some(
            second_hump(absolute, highest, self.options.fit_window, detection).unwrap_or(highest),
        )
    }

    fn measure(&mut self, peak_time: f64, ips: f64, line: &Polynomial) {
        let allowed = self.input.signed_band(self.tolerance.peak_current);
        let value = self.input.signed_value(ips);
        self.peak_current = Some(PeakCurrent {
            value,
            point: Sample::new(peak_time, value),
            allowed,
            passed: allowed.contains(value),
        });

        if ips <= 0.0 {
            warn!(ips, "fitted peak current is not positive, skipping edge measurements");
            return;
        }

        let limits = self.tolerance.characteristics;
        self.rise_time = measure_rise_time(self.input.absolute(), ips, self.options.rise_time)
            .map(|c| RiseTime::from_crossings(&self.input, c, Limit::Between(limits.rise_time)));
        self.decay_time = self.measure_decay(peak_time, ips, limits.decay_time);
        self.ringing = Some(self.measure_ringing(ips, line, limits.ringing_max));
    }

    fn measure_decay(&self, peak_time: f64, ips: f64, allowed: Band) -> Option<DecayTime> {
        let absolute = self.input.absolute();
        let trailing = absolute.trim_start(peak_time);
        let fit_start = find_crossing(
            &trailing,
            DECAY_FIT_START * ips,
            ScanDirection::Forward,
            "decay fit start",
        )?;
        let fit_end = match crossing(&trailing, DECAY_FIT_END * ips, ScanDirection::Forward) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "cannot search for decay fit end");
                None
            }
        };

        let region: Waveform = match fit_end {
            Some(end) => absolute.gate(fit_start.time, end.time),
            None => {
                debug!("capture ends before the decay fit end, fitting the positive tail");
                absolute
                    .trim_start(fit_start.time)
                    .samples()
                    .iter()
                    .copied()
                    .take_while(|s| s.amplitude > 0.0)
                    .collect()
            }
        };

        let fit = match exponential_fit(&region) {
            Ok(fit) => fit,
            Err(e) => {
                warn!(error = %e, "decay region cannot be fitted");
                return None;
            }
        };

        let threshold = ips / std::f64::consts::E;
        let mut times = region.times();
        let fitted_samples = times.len();
        let step = absolute.sampling_interval();
        if let Some(&last) = times.last() {
            let until = peak_time + self.options.decay_search_limit;
            times.extend(decay_extension(&fit, last, step, until, threshold));
        }
        let extended = times.len() > fitted_samples;

        let end = find_crossing(
            &fit.waveform(times),
            threshold,
            ScanDirection::Forward,
            "decay end",
        )?;
        let value = end.time - peak_time;
        debug!(value, extended, time_constant = fit.time_constant(), "measured decay time");

        Some(DecayTime {
            value,
            start: Sample::new(peak_time, self.input.signed_value(ips)),
            end: self.input.signed(end),
            allowed,
            passed: allowed.contains(value),
            extended,
        })
    }

    /// Positive and negative noise amplitudes for the ringing anchors
    fn noise_floor(&self) -> (f64, f64) {
        let absolute = self.input.absolute();
        match self.options.noise {
            NoiseCompensation::None => (0.0, 0.0),
            NoiseCompensation::PreTrigger { cutoff_time } => {
                let baseline = absolute.trim_end(cutoff_time);
                match (baseline.maximum(), baseline.minimum()) {
                    (Some(max), Some(min)) => (max.amplitude, min.amplitude),
                    _ => {
                        warn!(cutoff_time, "no samples before the noise cutoff time");
                        (0.0, 0.0)
                    }
                }
            }
            NoiseCompensation::Filtered => {
                let filtered = bessel_filter(absolute);
                self.fit_window
                    .samples()
                    .iter()
                    .filter_map(|s| filtered.amplitude_at(s.time).map(|f| s.amplitude - f))
                    .fold((0.0_f64, 0.0_f64), |(pos, neg), d| (pos.max(d), neg.min(d)))
            }
        }
    }

    fn measure_ringing(&self, ips: f64, line: &Polynomial, allowed_ratio: f64) -> Ringing {
        let (positive_noise, negative_noise) = self.noise_floor();

        let samples = self.fit_window.samples();
        let mut positive = samples[0];
        let mut negative = samples[0];
        let (mut largest, mut smallest) = (0.0, 0.0);
        for &s in samples {
            let deviation = s.amplitude - line.evaluate(s.time);
            if deviation >= 0.0 {
                if deviation > largest {
                    positive = s;
                    largest = deviation;
                }
            } else if deviation < smallest {
                negative = s;
                smallest = deviation;
            }
        }

        let positive = Sample::new(positive.time, positive.amplitude - positive_noise);
        let negative = Sample::new(negative.time, negative.amplitude - negative_noise);
        let total = (positive.amplitude - line.evaluate(positive.time)).abs()
            + (negative.amplitude - line.evaluate(negative.time)).abs();
        let ratio = total / ips;
        debug!(total, ratio, positive_noise, negative_noise, "measured ringing");

        Ringing {
            total,
            ratio,
            positive: self.input.signed(positive),
            negative: self.input.signed(negative),
            allowed_ratio,
            passed: ratio <= allowed_ratio,
        }
    }
}

/// Upper bound on samples appended past the end of a capture
const MAX_DECAY_EXTENSION: usize = 1_000_000;

/// Times past `last`, one `step` apart, while `fit` is above `threshold`.
///
/// Each new time is computed from `last` rather than accumulated, and the
/// count is fixed up front from the distance to `until`.
fn decay_extension(
    fit: &ExponentialFit,
    last: f64,
    step: f64,
    until: f64,
    threshold: f64,
) -> Vec<f64> {
    let decaying = step > 0.0 && fit.evaluate(last) > threshold;
    let steps = ((until - last) / step).floor() + 1.0;
    if !decaying || steps.is_nan() || steps < 1.0 {
        return Vec::new();
    }
    let count = if steps >= MAX_DECAY_EXTENSION as f64 {
        warn!(steps, "decay extension capped");
        MAX_DECAY_EXTENSION
    } else {
        steps as usize
    };

    let mut times = Vec::new();
    for i in 1..=count {
        let t = last + i as f64 * step;
        times.push(t);
        if fit.evaluate(t) <= threshold {
            break;
        }
    }
    times
}

/// Top of the hump following the first qualifying one, if there is one
fn second_hump(
    absolute: &Waveform,
    highest: Sample,
    window: f64,
    detection: DoublePeakDetection,
) -> Option<Sample> {
    let samples = absolute.samples();
    let cutoff = detection.lower_cutoff * highest.amplitude;
    let increase = detection.minimum_increase * highest.amplitude;

    let onset = samples.iter().position(|s| s.amplitude >= cutoff)?;
    let first_top = hump_top(samples, onset);
    let first = samples[first_top];

    let mut dip = first;
    for (i, s) in samples.iter().enumerate().skip(first_top + 1) {
        if s.time > first.time + window {
            break;
        }
        if s.amplitude < dip.amplitude {
            dip = *s;
        } else if s.amplitude >= cutoff && s.amplitude - dip.amplitude >= increase {
            let top = samples[hump_top(samples, i)];
            debug!(first = first.time, second = top.time, "re-selected double peak");
            return Some(top);
        }
    }
    None
}

/// Index of the local maximum reached by climbing from `from`
fn hump_top(samples: &[Sample], from: usize) -> usize {
    samples[from..]
        .windows(2)
        .position(|pair| pair[1].amplitude < pair[0].amplitude)
        .map_or(samples.len() - 1, |offset| from + offset)
}

impl Evaluation for HbmZeroOhmJs001<'_> {
    fn standard(&self) -> Standard {
        Standard::HbmZeroOhm
    }

    fn voltage(&self) -> f64 {
        self.voltage
    }

    fn characteristics(&self) -> Vec<CharacteristicSummary> {
        let limits = self.tolerance.characteristics;
        vec![
            PeakCurrent::summary(
                self.peak_current.as_ref(),
                self.input.signed_band(self.tolerance.peak_current),
            ),
            RiseTime::summary(self.rise_time.as_ref(), Limit::Between(limits.rise_time)),
            CharacteristicSummary::new("Decay time", Quantity::Time)
                .measured(
                    self.decay_time.map(|d| d.value),
                    self.decay_time.map(|d| d.passed),
                )
                .allowed(Some(Limit::Between(limits.decay_time))),
            CharacteristicSummary::new("Ringing", Quantity::Ratio)
                .measured(self.ringing.map(|r| r.ratio), self.ringing.map(|r| r.passed))
                .allowed(Some(Limit::AtMost(limits.ringing_max))),
        ]
    }
}

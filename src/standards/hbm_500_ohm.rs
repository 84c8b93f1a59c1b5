//! Human-body model evaluation into a 500 Ω load (JS-001)
//!
//! Only the peak current (taken directly from the highest sample) and the
//! rise time are specified for this load.

use serde::Serialize;
use tracing::info;

use crate::core::tolerance::{Band, ResolvedTolerance, ToleranceRow, ToleranceTable};
use crate::core::waveform::Waveform;
use crate::standards::{
    measure_rise_time, CharacteristicSummary, Evaluation, EvaluationError, HbmLoad, Limit,
    PeakCurrent, Polarity, RiseTime, RiseTimeFractions, Standard, StandardInput,
};

/// Voltage-independent JS-001 limits into 500 Ω
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HbmFiveHundredOhmCharacteristics {
    /// Seconds
    pub rise_time: Band,
}

const LIMITS: HbmFiveHundredOhmCharacteristics = HbmFiveHundredOhmCharacteristics {
    rise_time: Band::new(5e-9, 25e-9),
};

const fn row(
    voltage: f64,
    min: f64,
    max: f64,
) -> ToleranceRow<HbmLoad, HbmFiveHundredOhmCharacteristics> {
    ToleranceRow {
        key: HbmLoad::FiveHundredOhm,
        voltage,
        peak_current: Band::new(min, max),
        characteristics: LIMITS,
    }
}

static HBM_500_OHM_ROWS: [ToleranceRow<HbmLoad, HbmFiveHundredOhmCharacteristics>; 4] = [
    row(1000.0, 0.37, 0.55),
    row(2000.0, 0.74, 1.10),
    row(4000.0, 1.50, 2.20),
    row(8000.0, 2.96, 4.40),
];

/// JS-001 tolerances for the 500 Ω load
pub static HBM_500_OHM_TOLERANCES: ToleranceTable<HbmLoad, HbmFiveHundredOhmCharacteristics> =
    ToleranceTable {
        name: "JS-001 HBM 500 Ω",
        rows: &HBM_500_OHM_ROWS,
    };

/// JS-001 500 Ω evaluation of one capture
#[derive(Debug, Clone, Serialize)]
pub struct HbmFiveHundredOhmJs001<'w> {
    #[serde(skip)]
    input: StandardInput<'w>,

    pub voltage: f64,
    pub polarity: Polarity,
    pub rise_time_fractions: RiseTimeFractions,
    pub tolerance: ResolvedTolerance<HbmFiveHundredOhmCharacteristics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_current: Option<PeakCurrent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rise_time: Option<RiseTime>,
}

impl<'w> HbmFiveHundredOhmJs001<'w> {
    pub fn new(waveform: &'w Waveform, voltage: f64) -> Result<Self, EvaluationError> {
        Self::with_rise_time_fractions(waveform, voltage, RiseTimeFractions::default())
    }

    pub fn with_rise_time_fractions(
        waveform: &'w Waveform,
        voltage: f64,
        fractions: RiseTimeFractions,
    ) -> Result<Self, EvaluationError> {
        let fractions = fractions.validated()?;
        let input = StandardInput::new(waveform, voltage)?;
        let tolerance = HBM_500_OHM_TOLERANCES.lookup(&HbmLoad::FiveHundredOhm, voltage)?;

        let peak = input.absolute().maximum();
        let allowed = input.signed_band(tolerance.peak_current);
        let peak_current = peak.map(|p| {
            let value = input.signed_value(p.amplitude);
            PeakCurrent {
                value,
                point: input.signed(p),
                allowed,
                passed: allowed.contains(value),
            }
        });
        let rise_time = peak
            .and_then(|p| measure_rise_time(input.absolute(), p.amplitude, fractions))
            .map(|c| {
                let limit = Limit::Between(tolerance.characteristics.rise_time);
                RiseTime::from_crossings(&input, c, limit)
            });

        let evaluation = Self {
            voltage: input.voltage,
            polarity: input.polarity,
            input,
            rise_time_fractions: fractions,
            tolerance,
            peak_current,
            rise_time,
        };
        info!(
            standard = %Standard::Hbm500Ohm,
            voltage,
            verdict = %evaluation.verdict(),
            "evaluated waveform"
        );
        Ok(evaluation)
    }

    pub fn waveform(&self) -> &'w Waveform {
        self.input.waveform
    }
}

impl Evaluation for HbmFiveHundredOhmJs001<'_> {
    fn standard(&self) -> Standard {
        Standard::Hbm500Ohm
    }

    fn voltage(&self) -> f64 {
        self.voltage
    }

    fn characteristics(&self) -> Vec<CharacteristicSummary> {
        vec![
            PeakCurrent::summary(
                self.peak_current.as_ref(),
                self.input.signed_band(self.tolerance.peak_current),
            ),
            RiseTime::summary(
                self.rise_time.as_ref(),
                Limit::Between(self.tolerance.characteristics.rise_time),
            ),
        ]
    }
}

//! Fixed-coefficient third-order Bessel low-pass filter
//!
//! Coefficients are tabulated per maximum sampling frequency. The recursion is
//!
//! ```text
//! y[n] = A·x[n-3] + 3A·x[n-2] + 3A·x[n-1] + A·x[n] + B·y[n-3] + C·y[n-2] + D·y[n-1]
//! ```
//!
//! seeded with three padding samples, and the output time axis is shifted
//! back by the filter's group delay.

use tracing::debug;

use crate::core::waveform::{Sample, Waveform};

/// Number of leading samples needed to seed the recursion
const ORDER: usize = 3;

/// One row of the coefficient table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BesselCoefficients {
    /// Highest sampling frequency (Hz) this row applies to
    pub max_frequency: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    /// Group delay in samples
    pub delay: u32,
}

/// Coefficient rows in ascending order of maximum sampling frequency
pub static BESSEL_TABLE: [BesselCoefficients; 8] = [
    row(1e9, 0.149411432880668, 0.0032040352, -0.1598574107, -0.0386380876, 1),
    row(1.25e9, 0.0957447255353309, 0.02732542, -0.2145651016, 0.4212818776, 2),
    row(2e9, 0.0349655509514258, 0.1133638615, -0.6108579429, 1.2177696739, 3),
    row(2.5e9, 0.0208964055593582, 0.1765684016, -0.8651729334, 1.5214332873, 3),
    row(4e9, 0.00657730328924761, 0.3402988787, -1.4152725242, 2.0223552191, 6),
    row(5e9, 0.00368864405068086, 0.4226750651, -1.6550518354, 2.2028676179, 7),
    row(1e10, 0.000558936637177688, 0.6506765639, -2.241198996, 2.586050939, 13),
    row(2e10, 0.000077342942965062, 0.8067320684, -2.5964900213, 2.7891392093, 27),
];

const fn row(max_frequency: f64, a: f64, b: f64, c: f64, d: f64, delay: u32) -> BesselCoefficients {
    BesselCoefficients {
        max_frequency,
        a,
        b,
        c,
        d,
        delay,
    }
}

/// Smallest row covering `sampling_frequency`, or the highest row when none does
pub fn coefficients_for(sampling_frequency: f64) -> &'static BesselCoefficients {
    BESSEL_TABLE
        .iter()
        .find(|c| sampling_frequency <= c.max_frequency)
        .unwrap_or(&BESSEL_TABLE[BESSEL_TABLE.len() - 1])
}

/// Low-pass filter `waveform`.
///
/// Waveforms with three samples or fewer, or without a usable sampling
/// frequency, are returned unchanged.
pub fn bessel_filter(waveform: &Waveform) -> Waveform {
    let fs = waveform.sampling_frequency();
    if waveform.len() <= ORDER || fs <= 0.0 {
        return waveform.clone();
    }

    let k = coefficients_for(fs);
    let samples = waveform.samples();
    let start = samples[0].time;
    let seed = samples[..ORDER].iter().map(|s| s.amplitude).sum::<f64>() / ORDER as f64;

    let input: Vec<f64> = std::iter::repeat(seed)
        .take(ORDER)
        .chain(samples.iter().map(|s| s.amplitude))
        .collect();
    let times: Vec<f64> = std::iter::repeat(start)
        .take(ORDER)
        .chain(samples.iter().map(|s| s.time))
        .collect();

    let mut output: Vec<f64> = Vec::with_capacity(input.len());
    for n in 0..input.len() {
        let y = if n < ORDER {
            input[n]
        } else {
            k.a * input[n - 3]
                + 3.0 * k.a * input[n - 2]
                + 3.0 * k.a * input[n - 1]
                + k.a * input[n]
                + k.b * output[n - 3]
                + k.c * output[n - 2]
                + k.d * output[n - 1]
        };
        output.push(y);
    }

    let shift = f64::from(k.delay) / fs;
    debug!(
        sampling_frequency = fs,
        table_frequency = k.max_frequency,
        shift,
        "applied Bessel filter"
    );

    times
        .into_iter()
        .zip(output)
        .skip(ORDER)
        .map(|(t, y)| Sample::new(t - shift, y))
        .collect()
}

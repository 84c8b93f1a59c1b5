//! Curve fitting over waveform samples
//!
//! Provides a closed-form linear least-squares fit (returned as a
//! [`Polynomial`]) and an exponential fit obtained by linear regression on
//! the logarithm of the amplitudes.

use serde::{Deserialize, Serialize};

use crate::core::error::AnalysisError;
use crate::core::waveform::{Sample, Waveform};

/// Number of coefficients held by a [`Polynomial`]
pub const POLYNOMIAL_TERMS: usize = 6;

/// Polynomial of degree at most five, `a0 + a1·x + ... + a5·x⁵`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Polynomial {
    coefficients: [f64; POLYNOMIAL_TERMS],
}

impl Polynomial {
    /// Build from coefficients ordered from constant term upward
    pub fn new(coefficients: [f64; POLYNOMIAL_TERMS]) -> Result<Self, AnalysisError> {
        if let Some((index, &value)) = coefficients
            .iter()
            .enumerate()
            .find(|(_, c)| !c.is_finite())
        {
            return Err(AnalysisError::NonFiniteCoefficient { index, value });
        }
        Ok(Self { coefficients })
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Straight line `intercept + slope·x`
    pub fn linear(intercept: f64, slope: f64) -> Result<Self, AnalysisError> {
        Self::new([intercept, slope, 0.0, 0.0, 0.0, 0.0])
    }

    pub fn coefficients(&self) -> &[f64; POLYNOMIAL_TERMS] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.coefficients[0]
    }

    pub fn slope(&self) -> f64 {
        self.coefficients[1]
    }

    /// Horner evaluation at `x`
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }
}

/// Least-squares straight line through the samples.
///
/// Fewer than two samples, or a set whose times are all equal, yields the
/// zero polynomial.
pub fn least_squares_fit(waveform: &Waveform) -> Polynomial {
    let n = waveform.len() as f64;
    if waveform.len() < 2 {
        return Polynomial::zero();
    }

    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
    for s in waveform {
        sx += s.time;
        sy += s.amplitude;
        sxx += s.time * s.time;
        sxy += s.time * s.amplitude;
    }

    let determinant = n * sxx - sx * sx;
    if determinant == 0.0 {
        return Polynomial::zero();
    }

    let slope = (n * sxy - sx * sy) / determinant;
    let intercept = (sy * sxx - sx * sxy) / determinant;
    Polynomial::linear(intercept, slope).unwrap_or_default()
}

/// Parameters of `y = exp(a) · exp(b·t)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialFit {
    pub a: f64,
    pub b: f64,
}

impl ExponentialFit {
    pub fn evaluate(&self, t: f64) -> f64 {
        self.a.exp() * (self.b * t).exp()
    }

    /// Time constant `-1/b`, meaningful for decaying fits
    pub fn time_constant(&self) -> f64 {
        -1.0 / self.b
    }

    /// Synthetic waveform of the fitted curve at the given times
    pub fn waveform(&self, times: impl IntoIterator<Item = f64>) -> Waveform {
        times
            .into_iter()
            .map(|t| Sample::new(t, self.evaluate(t)))
            .collect()
    }
}

/// Fit `y = exp(a)·exp(b·t)` by regressing `ln y` on `t`.
///
/// Every amplitude must be strictly positive.
pub fn exponential_fit(waveform: &Waveform) -> Result<ExponentialFit, AnalysisError> {
    if waveform.len() < 2 {
        return Err(AnalysisError::InsufficientSamples {
            required: 2,
            actual: waveform.len(),
        });
    }
    if let Some(bad) = waveform.samples().iter().find(|s| s.amplitude <= 0.0) {
        return Err(AnalysisError::NonPositiveAmplitude {
            time: bad.time,
            amplitude: bad.amplitude,
        });
    }

    let n = waveform.len() as f64;
    let (mut sx, mut sxx, mut sln, mut sxln) = (0.0, 0.0, 0.0, 0.0);
    for s in waveform {
        let ln = s.amplitude.ln();
        sx += s.time;
        sxx += s.time * s.time;
        sln += ln;
        sxln += s.time * ln;
    }

    let denominator = n * sxx - sx * sx;
    if denominator == 0.0 {
        return Err(AnalysisError::InsufficientSamples {
            required: 2,
            actual: 1,
        });
    }

    Ok(ExponentialFit {
        a: (sln * sxx - sx * sxln) / denominator,
        b: (n * sxln - sx * sln) / denominator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_polynomial_rejects_non_finite() {
        let err = Polynomial::new([0.0, 1.0, f64::NAN, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::NonFiniteCoefficient { index: 2, .. }
        ));
        assert!(Polynomial::linear(f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn test_polynomial_horner_evaluation() {
        let p = Polynomial::new([1.0, -2.0, 0.5, 0.0, 0.0, 1.0]).unwrap();
        // 1 - 2·2 + 0.5·4 + 32
        assert_relative_eq!(p.evaluate(2.0), 31.0);
        assert_eq!(Polynomial::zero().evaluate(123.0), 0.0);
    }

    #[test]
    fn test_least_squares_recovers_line() {
        let wf: Waveform = (0..20)
            .map(|i| {
                let t = i as f64 * 1e-9;
                Sample::new(t, 0.35 - 2.0e6 * t)
            })
            .collect();
        let line = least_squares_fit(&wf);
        assert_relative_eq!(line.intercept(), 0.35, max_relative = 1e-6);
        assert_relative_eq!(line.slope(), -2.0e6, max_relative = 1e-6);
    }

    #[test]
    fn test_least_squares_degenerate_inputs() {
        assert_eq!(least_squares_fit(&Waveform::default()), Polynomial::zero());
        let single: Waveform = vec![Sample::new(1.0, 2.0)].into();
        assert_eq!(least_squares_fit(&single), Polynomial::zero());
        let stacked: Waveform = vec![Sample::new(1.0, 2.0), Sample::new(1.0, 3.0)].into();
        assert_eq!(least_squares_fit(&stacked), Polynomial::zero());
    }

    #[test]
    fn test_exponential_fit_recovers_decay() {
        let tau = 150e-9;
        let wf: Waveform = (0..50)
            .map(|i| {
                let t = i as f64 * 2e-9;
                Sample::new(t, 0.33 * (-t / tau).exp())
            })
            .collect();
        let fit = exponential_fit(&wf).unwrap();
        assert_relative_eq!(fit.a.exp(), 0.33, max_relative = 1e-6);
        assert_relative_eq!(fit.time_constant(), tau, max_relative = 1e-6);

        let rebuilt = fit.waveform(wf.times());
        assert_eq!(rebuilt.len(), wf.len());
        for (fitted, raw) in rebuilt.samples().iter().zip(wf.samples()) {
            assert_abs_diff_eq!(fitted.amplitude, raw.amplitude, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_exponential_fit_rejects_non_positive() {
        let wf: Waveform = vec![Sample::new(0.0, 1.0), Sample::new(1.0, 0.0)].into();
        assert!(matches!(
            exponential_fit(&wf),
            Err(AnalysisError::NonPositiveAmplitude { .. })
        ));
    }

    #[test]
    fn test_exponential_fit_requires_two_samples() {
        let wf: Waveform = vec![Sample::new(0.0, 1.0)].into();
        assert_eq!(
            exponential_fit(&wf),
            Err(AnalysisError::InsufficientSamples {
                required: 2,
                actual: 1
            })
        );
    }
}

//! Sampled waveform data model
//!
//! A [`Waveform`] is an ordered, immutable sequence of [`Sample`]s. Every
//! transformation (scaling, gating, trimming) returns a new waveform; derived
//! quantities such as the sampling interval are recomputed on demand.

use serde::{Deserialize, Serialize};

/// A single (time, amplitude) point of a capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Time in seconds
    pub time: f64,

    /// Amplitude in amperes
    pub amplitude: f64,
}

impl Sample {
    pub fn new(time: f64, amplitude: f64) -> Self {
        Self { time, amplitude }
    }

    /// Same time, amplitude multiplied by `factor`
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.time, self.amplitude * factor)
    }
}

impl From<(f64, f64)> for Sample {
    fn from((time, amplitude): (f64, f64)) -> Self {
        Self::new(time, amplitude)
    }
}

impl std::fmt::Display for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:e} s, {:e} A)", self.time, self.amplitude)
    }
}

/// Ordered sequence of samples, ascending in time for captured data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Waveform {
    samples: Vec<Sample>,
}

impl Waveform {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<Sample> {
        self.samples.first().copied()
    }

    pub fn last(&self) -> Option<Sample> {
        self.samples.last().copied()
    }

    /// Time axis of the waveform
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// Multiply every amplitude by `factor`
    pub fn scale_vertically(&self, factor: f64) -> Waveform {
        self.samples.iter().map(|s| s.scaled(factor)).collect()
    }

    /// Samples whose time lies within `[min(low, high), max(low, high)]`
    pub fn gate(&self, low: f64, high: f64) -> Waveform {
        let (start, end) = if low <= high { (low, high) } else { (high, low) };
        self.filtered(|s| s.time >= start && s.time <= end)
    }

    /// Samples at or after `boundary`
    pub fn trim_start(&self, boundary: f64) -> Waveform {
        self.filtered(|s| s.time >= boundary)
    }

    /// Samples at or before `boundary`
    pub fn trim_end(&self, boundary: f64) -> Waveform {
        self.filtered(|s| s.time <= boundary)
    }

    fn filtered(&self, keep: impl Fn(&Sample) -> bool) -> Waveform {
        self.samples.iter().copied().filter(|s| keep(s)).collect()
    }

    /// First sample attaining the greatest amplitude
    pub fn maximum(&self) -> Option<Sample> {
        self.extreme(|candidate, best| candidate > best)
    }

    /// First sample attaining the smallest amplitude
    pub fn minimum(&self) -> Option<Sample> {
        self.extreme(|candidate, best| candidate < best)
    }

    fn extreme(&self, replaces: impl Fn(f64, f64) -> bool) -> Option<Sample> {
        let mut iter = self.samples.iter().copied();
        let mut best = iter.next()?;
        for sample in iter {
            if replaces(sample.amplitude, best.amplitude) {
                best = sample;
            }
        }
        Some(best)
    }

    /// Mean amplitude, or 0 for an empty waveform
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.amplitude).sum::<f64>() / self.samples.len() as f64
    }

    /// Time step between samples.
    ///
    /// Measured from the first sample to the first later sample with a
    /// different time, divided by the index offset between them, so repeated
    /// leading timestamps do not produce a zero interval. Returns 0 when no
    /// such sample exists.
    pub fn sampling_interval(&self) -> f64 {
        let Some(first) = self.samples.first() else {
            return 0.0;
        };
        self.samples
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, s)| s.time != first.time)
            .map(|(offset, s)| (s.time - first.time) / offset as f64)
            .unwrap_or(0.0)
    }

    /// Rounded reciprocal of the sampling interval, 0 when undefined
    pub fn sampling_frequency(&self) -> f64 {
        let interval = self.sampling_interval();
        if interval == 0.0 {
            0.0
        } else {
            (1.0 / interval).round()
        }
    }

    /// Linearly interpolated amplitude at `time`.
    ///
    /// Returns `None` outside the span covered by the samples.
    pub fn amplitude_at(&self, time: f64) -> Option<f64> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        if time < first.time || time > last.time {
            return None;
        }
        // Index of the first sample strictly after `time`
        let upper = self.samples.partition_point(|s| s.time <= time);
        if upper == 0 {
            return Some(first.amplitude);
        }
        let before = self.samples[upper - 1];
        match self.samples.get(upper) {
            Some(after) if after.time != before.time && before.time != time => {
                let fraction = (time - before.time) / (after.time - before.time);
                Some(before.amplitude + fraction * (after.amplitude - before.amplitude))
            }
            _ => Some(before.amplitude),
        }
    }
}

impl FromIterator<Sample> for Waveform {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<Vec<Sample>> for Waveform {
    fn from(samples: Vec<Sample>) -> Self {
        Self::new(samples)
    }
}

impl<'a> IntoIterator for &'a Waveform {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle() -> Waveform {
        vec![
            (0.0, 0.0),
            (1.0, 2.0),
            (2.0, 5.0),
            (3.0, 5.0),
            (4.0, -1.0),
            (5.0, -1.0),
            (6.0, 0.0),
        ]
        .into_iter()
        .map(Sample::from)
        .collect()
    }

    #[test]
    fn test_maximum_returns_first_occurrence() {
        let max = triangle().maximum().unwrap();
        assert_eq!(max, Sample::new(2.0, 5.0));
    }

    #[test]
    fn test_minimum_returns_first_occurrence() {
        let min = triangle().minimum().unwrap();
        assert_eq!(min, Sample::new(4.0, -1.0));
    }

    #[test]
    fn test_extremes_of_empty_waveform_are_none() {
        let empty = Waveform::default();
        assert!(empty.maximum().is_none());
        assert!(empty.minimum().is_none());
        assert_eq!(empty.average(), 0.0);
    }

    #[test]
    fn test_extremes_are_members_with_no_better_sample() {
        let wf = triangle();
        let max = wf.maximum().unwrap();
        let min = wf.minimum().unwrap();
        assert!(wf.samples().contains(&max));
        assert!(wf.samples().contains(&min));
        assert!(wf.samples().iter().all(|s| s.amplitude <= max.amplitude));
        assert!(wf.samples().iter().all(|s| s.amplitude >= min.amplitude));
    }

    #[test]
    fn test_scale_twice_by_minus_one_is_identity() {
        let wf = triangle();
        assert_eq!(wf.scale_vertically(-1.0).scale_vertically(-1.0), wf);
    }

    #[test]
    fn test_scale_leaves_times_untouched() {
        let scaled = triangle().scale_vertically(3.0);
        assert_eq!(scaled.times(), triangle().times());
        assert_eq!(scaled.samples()[2].amplitude, 15.0);
    }

    #[test]
    fn test_gate_accepts_reversed_bounds() {
        let wf = triangle();
        let forward = wf.gate(1.0, 3.0);
        let reversed = wf.gate(3.0, 1.0);
        assert_eq!(forward, reversed);
        assert_eq!(forward.times(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_trim_is_inclusive() {
        let wf = triangle();
        assert_eq!(wf.trim_start(4.0).times(), vec![4.0, 5.0, 6.0]);
        assert_eq!(wf.trim_end(1.0).times(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_average() {
        assert_relative_eq!(triangle().average(), 10.0 / 7.0);
    }

    #[test]
    fn test_sampling_interval_skips_repeated_leading_times() {
        let wf: Waveform = vec![
            Sample::new(0.0, 0.0),
            Sample::new(0.0, 1.0),
            Sample::new(2e-9, 2.0),
            Sample::new(3e-9, 3.0),
        ]
        .into();
        assert_relative_eq!(wf.sampling_interval(), 1e-9);
        assert_eq!(wf.sampling_frequency(), 1e9);
    }

    #[test]
    fn test_sampling_interval_degenerate() {
        assert_eq!(Waveform::default().sampling_interval(), 0.0);
        let single: Waveform = vec![Sample::new(1.0, 1.0)].into();
        assert_eq!(single.sampling_interval(), 0.0);
        assert_eq!(single.sampling_frequency(), 0.0);
    }

    #[test]
    fn test_amplitude_at_interpolates() {
        let wf = triangle();
        assert_relative_eq!(wf.amplitude_at(0.5).unwrap(), 1.0);
        assert_relative_eq!(wf.amplitude_at(3.5).unwrap(), 2.0);
        assert_relative_eq!(wf.amplitude_at(6.0).unwrap(), 0.0);
        assert_relative_eq!(wf.amplitude_at(2.0).unwrap(), 5.0);
        assert!(wf.amplitude_at(-0.1).is_none());
        assert!(wf.amplitude_at(6.1).is_none());
    }
}

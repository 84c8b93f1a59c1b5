//! Threshold-crossing search
//!
//! Locates the time at which a waveform passes through an amplitude
//! threshold, interpolating linearly between the two samples that straddle
//! it. Scanning forward finds the earliest crossing; scanning backward finds
//! the latest.

use serde::{Deserialize, Serialize};

use crate::core::error::AnalysisError;
use crate::core::range::equivalent_value_in_new_range;
use crate::core::waveform::{Sample, Waveform};

/// Order in which samples are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDirection {
    /// Earliest sample first
    Forward,
    /// Latest sample first
    Backward,
}

/// Find where `waveform` crosses `threshold`.
///
/// A sample exactly at the threshold is returned as-is. Otherwise the first
/// pair of consecutive samples (in scan order) on opposite sides of the
/// threshold is interpolated. `Ok(None)` means the threshold is never
/// reached.
pub fn crossing(
    waveform: &Waveform,
    threshold: f64,
    direction: ScanDirection,
) -> Result<Option<Sample>, AnalysisError> {
    if waveform.is_empty() {
        return Err(AnalysisError::EmptyWaveform);
    }
    if !threshold.is_finite() {
        return Err(AnalysisError::NonFiniteThreshold(threshold));
    }

    let samples = waveform.samples();
    let ordered: Box<dyn Iterator<Item = &Sample>> = match direction {
        ScanDirection::Forward => Box::new(samples.iter()),
        ScanDirection::Backward => Box::new(samples.iter().rev()),
    };

    let mut previous: Option<&Sample> = None;
    for sample in ordered {
        if sample.amplitude == threshold {
            return Ok(Some(*sample));
        }
        if let Some(prev) = previous {
            let was_above = prev.amplitude > threshold;
            let is_above = sample.amplitude > threshold;
            if was_above != is_above {
                let time = equivalent_value_in_new_range(
                    threshold,
                    prev.amplitude,
                    sample.amplitude,
                    prev.time,
                    sample.time,
                )?;
                return Ok(Some(Sample::new(time, threshold)));
            }
        }
        previous = Some(sample);
    }

    Ok(None)
}

//! Tolerance table lookup
//!
//! Each published standard tabulates the allowed peak current at a handful
//! of test voltages, per configuration key. Between tabulated levels the
//! peak-current band is interpolated linearly; beyond the ends of the table
//! the nearest boundary row is scaled in proportion to the voltage. All other
//! characteristics of a row are fixed and copied from the row below.

use std::fmt;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::core::range::{between_inclusive, center_of_range};

/// Allowed interval for a characteristic, bounds in either order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Midpoint of the band
    pub fn nominal(&self) -> f64 {
        center_of_range(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        between_inclusive(value, self.min, self.max)
    }

    /// Both bounds multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Band {
        Band::new(self.min * factor, self.max * factor)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.min, self.max)
    }
}

/// One tabulated test level
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceRow<K: 'static, C: 'static> {
    pub key: K,
    /// Test voltage magnitude in volts
    pub voltage: f64,
    pub peak_current: Band,
    /// Characteristics that do not vary with voltage
    pub characteristics: C,
}

/// How a resolved entry relates to the tabulated rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Voltage matches a tabulated row
    Exact,
    /// Peak band interpolated between two tabulated levels
    Interpolated { lower: f64, upper: f64 },
    /// Voltage above the highest level, scaled from it
    ExtrapolatedAbove { from: f64 },
    /// Voltage below the lowest level, scaled from it
    ExtrapolatedBelow { from: f64 },
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Exact => write!(f, "tabulated"),
            Resolution::Interpolated { lower, upper } => {
                write!(f, "interpolated between {} V and {} V", lower, upper)
            }
            Resolution::ExtrapolatedAbove { from } => write!(f, "extrapolated up from {} V", from),
            Resolution::ExtrapolatedBelow { from } => {
                write!(f, "extrapolated down from {} V", from)
            }
        }
    }
}

/// Entry produced by a lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTolerance<C> {
    /// Test voltage magnitude the entry applies to
    pub voltage: f64,
    pub peak_current: Band,
    pub characteristics: C,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum ToleranceError {
    #[error("{table} has no tolerance entries for configuration '{configuration}'")]
    #[diagnostic(code(esdv::tolerance::no_entries))]
    NoMatchingConfiguration {
        table: &'static str,
        configuration: String,
    },
}

/// A published tolerance table
#[derive(Debug)]
pub struct ToleranceTable<K: 'static, C: 'static> {
    pub name: &'static str,
    pub rows: &'static [ToleranceRow<K, C>],
}

impl<K, C> ToleranceTable<K, C>
where
    K: PartialEq + fmt::Display,
    C: Clone,
{
    /// Rows published for `key`, in table order
    pub fn rows_for<'a>(&'a self, key: &'a K) -> impl Iterator<Item = &'a ToleranceRow<K, C>> + 'a {
        self.rows.iter().filter(move |r| r.key == *key)
    }

    /// Resolve the entry for `key` at `voltage`. The sign of the voltage is ignored.
    pub fn lookup(&self, key: &K, voltage: f64) -> Result<ResolvedTolerance<C>, ToleranceError> {
        let magnitude = voltage.abs();
        let mut lower: Option<&ToleranceRow<K, C>> = None;
        let mut upper: Option<&ToleranceRow<K, C>> = None;

        for row in self.rows_for(key) {
            if row.voltage == magnitude {
                return Ok(ResolvedTolerance {
                    voltage: magnitude,
                    peak_current: row.peak_current,
                    characteristics: row.characteristics.clone(),
                    resolution: Resolution::Exact,
                });
            }
            if row.voltage < magnitude {
                if lower.map_or(true, |l| row.voltage > l.voltage) {
                    lower = Some(row);
                }
            } else if upper.map_or(true, |u| row.voltage < u.voltage) {
                upper = Some(row);
            }
        }

        let resolved = match (lower, upper) {
            (Some(lo), Some(hi)) => {
                let fraction = (magnitude - lo.voltage) / (hi.voltage - lo.voltage);
                let lerp = |a: f64, b: f64| a + fraction * (b - a);
                ResolvedTolerance {
                    voltage: magnitude,
                    peak_current: Band::new(
                        lerp(lo.peak_current.min, hi.peak_current.min),
                        lerp(lo.peak_current.max, hi.peak_current.max),
                    ),
                    characteristics: lo.characteristics.clone(),
                    resolution: Resolution::Interpolated {
                        lower: lo.voltage,
                        upper: hi.voltage,
                    },
                }
            }
            (Some(lo), None) => ResolvedTolerance {
                voltage: magnitude,
                peak_current: lo.peak_current.scaled(magnitude / lo.voltage),
                characteristics: lo.characteristics.clone(),
                resolution: Resolution::ExtrapolatedAbove { from: lo.voltage },
            },
            (None, Some(hi)) => ResolvedTolerance {
                voltage: magnitude,
                peak_current: hi.peak_current.scaled(magnitude / hi.voltage),
                characteristics: hi.characteristics.clone(),
                resolution: Resolution::ExtrapolatedBelow { from: hi.voltage },
            },
            (None, None) => {
                return Err(ToleranceError::NoMatchingConfiguration {
                    table: self.name,
                    configuration: key.to_string(),
                })
            }
        };

        debug!(
            table = self.name,
            voltage = magnitude,
            resolution = %resolved.resolution,
            "resolved tolerance entry"
        );
        Ok(resolved)
    }
}

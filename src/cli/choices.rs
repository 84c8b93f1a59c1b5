//! Command-line value enums
//!
//! These mirror library enums so that the library stays free of clap.

use clap::ValueEnum;

use crate::core::config::NoiseStrategy;
use crate::standards::{Bandwidth, HbmLoad, Standard, TargetSize};

/// CDM verification module size
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TargetArg {
    Large,
    Small,
}

impl From<TargetArg> for TargetSize {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Large => TargetSize::Large,
            TargetArg::Small => TargetSize::Small,
        }
    }
}

/// Oscilloscope bandwidth class used for a CDM capture
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BandwidthArg {
    /// At least 6 GHz
    High,
    /// 1 GHz
    Low,
}

impl From<BandwidthArg> for Bandwidth {
    fn from(arg: BandwidthArg) -> Self {
        match arg {
            BandwidthArg::High => Bandwidth::High,
            BandwidthArg::Low => Bandwidth::Low,
        }
    }
}

/// HBM tester load
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum LoadArg {
    /// Shorted wire
    #[default]
    #[value(name = "zero-ohm")]
    ZeroOhm,
    #[value(name = "500-ohm")]
    FiveHundredOhm,
}

impl From<LoadArg> for HbmLoad {
    fn from(arg: LoadArg) -> Self {
        match arg {
            LoadArg::ZeroOhm => HbmLoad::ZeroOhm,
            LoadArg::FiveHundredOhm => HbmLoad::FiveHundredOhm,
        }
    }
}

/// Noise compensation applied to the 0 Ω ringing measurement
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum NoiseArg {
    None,
    /// Baseline extremes before `--noise-cutoff`
    PreTrigger,
    /// Extremes of the signal minus its Bessel-filtered copy
    Filtered,
}

impl From<NoiseArg> for NoiseStrategy {
    fn from(arg: NoiseArg) -> Self {
        match arg {
            NoiseArg::None => NoiseStrategy::None,
            NoiseArg::PreTrigger => NoiseStrategy::PreTrigger,
            NoiseArg::Filtered => NoiseStrategy::Filtered,
        }
    }
}

/// Standard whose tolerance table to show
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StandardArg {
    Cdm,
    #[value(name = "hbm-zero-ohm")]
    HbmZeroOhm,
    #[value(name = "hbm-500-ohm")]
    Hbm500Ohm,
}

impl From<StandardArg> for Standard {
    fn from(arg: StandardArg) -> Self {
        match arg {
            StandardArg::Cdm => Standard::Cdm,
            StandardArg::HbmZeroOhm => Standard::HbmZeroOhm,
            StandardArg::Hbm500Ohm => Standard::Hbm500Ohm,
        }
    }
}

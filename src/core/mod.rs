//! Core module - waveform type, numeric primitives and configuration

pub mod config;
pub mod error;
pub mod filter;
pub mod fit;
pub mod range;
pub mod threshold;
pub mod tolerance;
pub mod waveform;

pub use config::{Config, ConfigError};
pub use error::AnalysisError;
pub use filter::bessel_filter;
pub use fit::{exponential_fit, least_squares_fit, ExponentialFit, Polynomial};
pub use range::{
    between_inclusive, center_of_range, equivalent_value_in_new_range, percent_within_range,
};
pub use threshold::{crossing, ScanDirection};
pub use tolerance::{Band, Resolution, ResolvedTolerance, ToleranceError, ToleranceTable};
pub use waveform::{Sample, Waveform};

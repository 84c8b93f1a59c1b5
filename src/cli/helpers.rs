//! Shared helper functions for CLI commands

use std::path::Path;

use console::style;
use miette::Result;

use crate::cli::OutputFormat;
use crate::core::waveform::Waveform;
use crate::import::read_waveform;
use crate::standards::{Limit, Quantity};

const PREFIXES: [(f64, &str); 7] = [
    (1e3, "k"),
    (1.0, ""),
    (1e-3, "m"),
    (1e-6, "µ"),
    (1e-9, "n"),
    (1e-12, "p"),
    (1e-15, "f"),
];

/// Format a value with an SI prefix and about four significant digits
///
/// `3.102e-10` seconds becomes `310.2 ps`, `-0.982` amperes becomes `-982.0 mA`.
pub fn format_engineering(value: f64, unit: &str) -> String {
    if !value.is_finite() {
        return format!("{} {}", value, unit);
    }
    if value == 0.0 {
        return format!("0 {}", unit);
    }
    let magnitude = value.abs();
    let (scale, prefix) = PREFIXES
        .iter()
        .copied()
        .find(|(scale, _)| magnitude >= *scale)
        .unwrap_or(PREFIXES[PREFIXES.len() - 1]);
    let scaled = value / scale;
    let precision = if scaled.abs() >= 100.0 {
        1
    } else if scaled.abs() >= 10.0 {
        2
    } else {
        3
    };
    format!("{:.*} {}{}", precision, scaled, prefix, unit)
}

pub fn format_time(seconds: f64) -> String {
    format_engineering(seconds, "s")
}

pub fn format_current(amperes: f64) -> String {
    format_engineering(amperes, "A")
}

/// Ratios are shown as percentages
pub fn format_ratio(ratio: f64) -> String {
    format!("{:.2} %", ratio * 100.0)
}

pub fn format_quantity(value: f64, quantity: Quantity) -> String {
    match quantity {
        Quantity::Current => format_current(value),
        Quantity::Time => format_time(value),
        Quantity::Ratio => format_ratio(value),
    }
}

pub fn format_limit(limit: &Limit, quantity: Quantity) -> String {
    match limit {
        Limit::Between(band) => format!(
            "{} to {}",
            format_quantity(band.min, quantity),
            format_quantity(band.max, quantity)
        ),
        Limit::AtMost(max) => format!("≤ {}", format_quantity(*max, quantity)),
        Limit::AtLeast(min) => format!("≥ {}", format_quantity(*min, quantity)),
    }
}

/// Import a capture, reporting the sample count in text mode
pub fn load_waveform(path: &Path, format: OutputFormat) -> Result<Waveform> {
    let waveform = read_waveform(path)?;
    if format == OutputFormat::Text {
        println!(
            "{} Loaded {} samples from {}",
            style("✓").green(),
            waveform.len(),
            style(path.display()).cyan()
        );
    }
    Ok(waveform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tolerance::Band;

    #[test]
    fn test_format_engineering() {
        assert_eq!(format_engineering(3.102e-10, "s"), "310.2 ps");
        assert_eq!(format_engineering(5.838, "A"), "5.838 A");
        assert_eq!(format_engineering(-0.982, "A"), "-982.0 mA");
        assert_eq!(format_engineering(2.5e-9, "s"), "2.500 ns");
        assert_eq!(format_engineering(1.5e-7, "s"), "150.0 ns");
        assert_eq!(format_engineering(0.0, "A"), "0 A");
    }

    #[test]
    fn test_format_engineering_extremes() {
        assert_eq!(format_engineering(2500.0, "V"), "2.500 kV");
        assert_eq!(format_engineering(f64::NAN, "A"), "NaN A");
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(0.082), "8.20 %");
        assert_eq!(format_quantity(0.15, Quantity::Ratio), "15.00 %");
    }

    #[test]
    fn test_format_limit() {
        let band = Limit::Between(Band::new(0.3, 0.37));
        assert_eq!(format_limit(&band, Quantity::Current), "300.0 mA to 370.0 mA");
        assert_eq!(
            format_limit(&Limit::AtMost(350e-12), Quantity::Time),
            "≤ 350.0 ps"
        );
        assert_eq!(
            format_limit(&Limit::AtLeast(-2.919), Quantity::Current),
            "≥ -2.919 A"
        );
    }
}

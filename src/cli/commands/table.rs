//! `esdv table` command - published tolerance tables

use std::fmt;

use console::style;
use miette::Result;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::choices::{BandwidthArg, StandardArg, TargetArg};
use crate::cli::helpers::{format_current, format_limit, format_ratio};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::tolerance::{Band, ToleranceTable};
use crate::core::Config;
use crate::standards::cdm::{CdmCharacteristics, CDM_TOLERANCES};
use crate::standards::hbm_500_ohm::{HbmFiveHundredOhmCharacteristics, HBM_500_OHM_TOLERANCES};
use crate::standards::hbm_zero_ohm::{HbmZeroOhmCharacteristics, HBM_ZERO_OHM_TOLERANCES};
use crate::standards::{validate_voltage, CdmConfiguration, HbmLoad, Limit, Quantity};

#[derive(clap::Args, Debug)]
pub struct TableArgs {
    /// Standard whose table to show
    #[arg(value_enum)]
    pub standard: StandardArg,

    /// CDM verification module size (default from config, else large)
    #[arg(long, value_enum)]
    pub target: Option<TargetArg>,

    /// CDM oscilloscope bandwidth (default from config, else high)
    #[arg(long, value_enum)]
    pub bandwidth: Option<BandwidthArg>,

    /// Show the entry resolved for this test voltage instead of the table
    #[arg(long, allow_negative_numbers = true)]
    pub voltage: Option<f64>,
}

/// Limits of a configuration as label/value pairs for text output
trait DescribeLimits {
    fn describe(&self) -> Vec<(&'static str, String)>;
}

impl DescribeLimits for CdmCharacteristics {
    fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Rise time", format_limit(&Limit::AtMost(self.rise_time_max), Quantity::Time)),
            (
                "Full width at half maximum",
                format_limit(&Limit::Between(self.full_width_half_max), Quantity::Time),
            ),
            (
                "Undershoot",
                format!("within peak × {:.2}", self.undershoot_fraction),
            ),
        ]
    }
}

impl DescribeLimits for HbmZeroOhmCharacteristics {
    fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Rise time", format_limit(&Limit::Between(self.rise_time), Quantity::Time)),
            ("Decay time", format_limit(&Limit::Between(self.decay_time), Quantity::Time)),
            ("Ringing", format!("≤ {}", format_ratio(self.ringing_max))),
        ]
    }
}

impl DescribeLimits for HbmFiveHundredOhmCharacteristics {
    fn describe(&self) -> Vec<(&'static str, String)> {
        vec![("Rise time", format_limit(&Limit::Between(self.rise_time), Quantity::Time))]
    }
}

#[derive(Tabled)]
struct LevelRow {
    #[tabled(rename = "Voltage")]
    voltage: String,
    #[tabled(rename = "Peak current min")]
    min: String,
    #[tabled(rename = "Peak current max")]
    max: String,
}

#[derive(Serialize)]
struct PublishedLevel<'a, C: Serialize> {
    voltage: f64,
    peak_current: Band,
    characteristics: &'a C,
}

pub fn run(args: TableArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load(global.config.as_deref())?;
    let format = effective_format(global.output, &config);
    let voltage = args.voltage.map(validate_voltage).transpose()?;

    match args.standard {
        StandardArg::Cdm => {
            let defaults = config.cdm_configuration();
            let key = CdmConfiguration::new(
                args.target.map(Into::into).unwrap_or(defaults.target),
                args.bandwidth.map(Into::into).unwrap_or(defaults.bandwidth),
            );
            show(&CDM_TOLERANCES, &key, voltage, format)
        }
        StandardArg::HbmZeroOhm => {
            show(&HBM_ZERO_OHM_TOLERANCES, &HbmLoad::ZeroOhm, voltage, format)
        }
        StandardArg::Hbm500Ohm => show(
            &HBM_500_OHM_TOLERANCES,
            &HbmLoad::FiveHundredOhm,
            voltage,
            format,
        ),
    }
}

fn show<K, C>(
    table: &ToleranceTable<K, C>,
    key: &K,
    voltage: Option<f64>,
    format: OutputFormat,
) -> Result<()>
where
    K: PartialEq + fmt::Display,
    C: Clone + Serialize + DescribeLimits,
{
    if let Some(voltage) = voltage {
        let resolved = table.lookup(key, voltage)?;
        if format != OutputFormat::Text {
            return print_structured(&resolved, format);
        }
        println!("{} ({}) at {} V", style(table.name).bold(), key, resolved.voltage);
        println!("  {}", style(resolved.resolution).dim());
        println!("{}", style("─".repeat(60)).dim());
        println!(
            "{}: {} to {}",
            style("Peak current").bold(),
            format_current(resolved.peak_current.min),
            format_current(resolved.peak_current.max)
        );
        print_limits(&resolved.characteristics);
        return Ok(());
    }

    let rows: Vec<_> = table.rows_for(key).collect();
    if rows.is_empty() {
        return Err(miette::miette!("{} has no rows for '{}'", table.name, key));
    }

    if format != OutputFormat::Text {
        let levels: Vec<_> = rows
            .iter()
            .map(|r| PublishedLevel {
                voltage: r.voltage,
                peak_current: r.peak_current,
                characteristics: &r.characteristics,
            })
            .collect();
        return print_structured(&levels, format);
    }

    println!("{} ({})", style(table.name).bold(), key);
    let levels: Vec<LevelRow> = rows
        .iter()
        .map(|r| LevelRow {
            voltage: format!("{} V", r.voltage),
            min: format_current(r.peak_current.min),
            max: format_current(r.peak_current.max),
        })
        .collect();
    let mut rendered = Table::new(levels);
    rendered.with(Style::rounded());
    println!("{}", rendered);
    print_limits(&rows[0].characteristics);
    Ok(())
}

fn print_limits<C: DescribeLimits>(characteristics: &C) {
    for (label, value) in characteristics.describe() {
        println!("{}: {}", style(label).bold(), value);
    }
}

//! Output formatting utilities

use std::path::Path;

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::helpers::{format_limit, format_quantity};
use crate::cli::OutputFormat;
use crate::core::Config;
use crate::standards::{CharacteristicSummary, Evaluation, Standard, Verdict};

/// Determine the effective output format from the flag and the configuration
pub fn effective_format(format: OutputFormat, config: &Config) -> OutputFormat {
    match format {
        OutputFormat::Auto => match config.output() {
            Some("json") => OutputFormat::Json,
            Some("yaml") => OutputFormat::Yaml,
            _ => OutputFormat::Text,
        },
        other => other,
    }
}

/// Print any serializable value as YAML or JSON
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
        }
        _ => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

/// Machine-readable evaluation report
#[derive(Serialize)]
pub struct EvaluationReport<'a, E: Serialize> {
    pub file: &'a Path,
    pub standard: Standard,
    pub voltage: f64,
    pub verdict: Verdict,
    pub characteristics: Vec<CharacteristicSummary>,
    pub details: &'a E,
}

#[derive(Tabled)]
struct CharacteristicRow {
    #[tabled(rename = "Characteristic")]
    name: String,
    #[tabled(rename = "Measured")]
    measured: String,
    #[tabled(rename = "Allowed")]
    allowed: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&CharacteristicSummary> for CharacteristicRow {
    fn from(summary: &CharacteristicSummary) -> Self {
        Self {
            name: summary.name.to_string(),
            measured: summary
                .measured
                .map(|v| format_quantity(v, summary.quantity))
                .unwrap_or_else(|| "-".to_string()),
            allowed: summary
                .allowed
                .as_ref()
                .map(|l| format_limit(l, summary.quantity))
                .unwrap_or_else(|| "-".to_string()),
            result: match summary.passed {
                Some(true) => "PASS".to_string(),
                Some(false) => "FAIL".to_string(),
                None => "N/A".to_string(),
            },
        }
    }
}

/// Styled verdict label
pub fn verdict_label(verdict: Verdict) -> console::StyledObject<&'static str> {
    match verdict {
        Verdict::Pass => style("PASS").green().bold(),
        Verdict::Fail => style("FAIL").red().bold(),
        Verdict::Incomplete => style("INCOMPLETE").yellow().bold(),
    }
}

/// Print an evaluation in the requested format
///
/// `notes` are extra lines shown under the header in text mode.
pub fn print_evaluation<E>(
    evaluation: &E,
    file: &Path,
    format: OutputFormat,
    notes: &[String],
) -> Result<()>
where
    E: Evaluation + Serialize,
{
    let characteristics = evaluation.characteristics();
    let verdict = evaluation.verdict();

    if format != OutputFormat::Text {
        let report = EvaluationReport {
            file,
            standard: evaluation.standard(),
            voltage: evaluation.voltage(),
            verdict,
            characteristics,
            details: evaluation,
        };
        return print_structured(&report, format);
    }

    println!();
    println!(
        "{} at {} V",
        style(evaluation.standard()).bold(),
        evaluation.voltage()
    );
    for note in notes {
        println!("  {}", style(note).dim());
    }
    println!("{}", style("─".repeat(60)).dim());

    let rows: Vec<CharacteristicRow> = characteristics
        .iter()
        .map(CharacteristicRow::from)
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    println!();
    println!("{}: {}", style("Verdict").bold(), verdict_label(verdict));
    Ok(())
}

/// With `--strict`, turn a non-passing verdict into an error exit
pub fn check_strict(verdict: Verdict, strict: bool) -> Result<()> {
    if strict && verdict != Verdict::Pass {
        return Err(miette::miette!(
            "Waveform is not compliant (verdict: {})",
            verdict
        ));
    }
    Ok(())
}

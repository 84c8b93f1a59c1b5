//! Comma- and tab-separated capture parsing

use std::borrow::Cow;

use csv::{ReaderBuilder, Trim};
use tracing::trace;

use crate::core::waveform::{Sample, Waveform};

/// Rewrite tab separators as commas so every record splits on either one.
///
/// Scope exports often mix a comma-separated preamble with tab-separated data.
pub fn normalize_separators(content: &str) -> Cow<'_, str> {
    if content.contains('\t') {
        Cow::Owned(content.replace('\t', ","))
    } else {
        Cow::Borrowed(content)
    }
}

/// Parse delimited `time, amplitude` text, keeping only valid sample rows
pub fn parse_waveform(content: &str) -> Waveform {
    let content = normalize_separators(content);
    let mut reader = ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let mut skipped = 0usize;
    let samples: Vec<Sample> = reader
        .records()
        .filter_map(|record| {
            let sample = record.ok().and_then(|r| parse_record(&r));
            if sample.is_none() {
                skipped += 1;
            }
            sample
        })
        .collect();
    trace!(samples = samples.len(), skipped, "parsed delimited capture");
    Waveform::new(samples)
}

fn parse_record(record: &csv::StringRecord) -> Option<Sample> {
    if record.len() != 2 {
        return None;
    }
    let time: f64 = record.get(0)?.parse().ok()?;
    let amplitude: f64 = record.get(1)?.parse().ok()?;
    (time.is_finite() && amplitude.is_finite()).then(|| Sample::new(time, amplitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_tabs_only_when_present() {
        assert!(matches!(normalize_separators("0,1\n"), Cow::Borrowed(_)));
        assert_eq!(normalize_separators("0\t1\n"), "0,1\n");
    }

    #[test]
    fn test_skips_headers_and_malformed_rows() {
        let content = "\
Model,DPO7000
Time,Current
0.0,0.0
1e-10, 0.25
oops,1
2e-10,0.5,extra
3e-10,NaN
4e-10,0.75
";
        let wf = parse_waveform(content);
        assert_eq!(wf.times(), vec![0.0, 1e-10, 4e-10]);
        assert_eq!(wf.samples()[1].amplitude, 0.25);
    }

    #[test]
    fn test_parses_tab_separated_capture() {
        let wf = parse_waveform("t\ti\n0\t-1.5\n1e-9\t-2.5\n");
        assert_eq!(wf.len(), 2);
        assert_eq!(wf.minimum().unwrap().amplitude, -2.5);
    }

    #[test]
    fn test_mixed_separators_keep_every_row() {
        let wf = parse_waveform("Model,DPO7000\n0\t1\n1e-9\t2\n2e-9, 3\n");
        assert_eq!(wf.times(), vec![0.0, 1e-9, 2e-9]);
        assert_eq!(wf.samples()[2].amplitude, 3.0);
    }

    #[test]
    fn test_empty_content_yields_empty_waveform() {
        assert!(parse_waveform("").is_empty());
    }
}

//! Waveform capture import
//!
//! Oscilloscope exports are two-column text files of `time, current` pairs.
//! Header lines, instrument preambles and any row that does not hold exactly
//! two finite numbers are skipped.

mod delimited;

pub use delimited::{normalize_separators, parse_waveform};

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::waveform::Waveform;

#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("Failed to read waveform file {}", .path.display())]
    #[diagnostic(code(esdv::import::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No samples found in {}", .path.display())]
    #[diagnostic(
        code(esdv::import::empty),
        help("expected rows of `time,current` separated by a comma or a tab")
    )]
    Empty { path: PathBuf },
}

/// Read a capture file into a waveform
pub fn read_waveform(path: &Path) -> Result<Waveform, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "read capture file");

    let waveform = parse_waveform(&content);
    if waveform.is_empty() {
        return Err(ImportError::Empty {
            path: path.to_path_buf(),
        });
    }
    info!(
        path = %path.display(),
        samples = waveform.len(),
        sampling_frequency = waveform.sampling_frequency(),
        "imported waveform"
    );
    Ok(waveform)
}

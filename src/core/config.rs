//! Layered YAML configuration
//!
//! Settings are read from, in increasing priority:
//!
//! 1. the user config file (`config.yaml` in the platform config directory)
//! 2. `esdv.yaml` in the working directory
//! 3. an explicit file given with `--config` / `ESDV_CONFIG`
//!
//! Later layers override individual keys of earlier ones. Command-line flags
//! override all of them.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::standards::{
    Bandwidth, CdmConfiguration, DoublePeakDetection, HbmZeroOhmOptions, NoiseCompensation,
    TargetSize,
};

/// Name of the per-directory config file
pub const LOCAL_CONFIG_FILE: &str = "esdv.yaml";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read config file {}", .path.display())]
    #[diagnostic(code(esdv::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {name}: {message}")]
    #[diagnostic(code(esdv::config::syntax))]
    Syntax {
        name: String,
        message: String,
        #[source_code]
        source_code: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("Noise strategy 'pre_trigger' needs hbm.noise.cutoff_time")]
    #[diagnostic(
        code(esdv::config::noise_cutoff),
        help("set the time (seconds) before which the capture is pre-trigger baseline")
    )]
    MissingNoiseCutoff,
}

/// Noise compensation strategy as written in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseStrategy {
    None,
    PreTrigger,
    Filtered,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<NoiseStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoublePeakSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_cutoff: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_increase: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdmSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<Bandwidth>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HbmSettings {
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_window: Option<f64>,
    pub double_peak: DoublePeakSettings,
    pub noise: NoiseSettings,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decay_search_limit: Option<f64>,
}

/// Tool configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default output format (auto, text, yaml, json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub cdm: CdmSettings,
    pub hbm: HbmSettings,
}

impl Config {
    /// Load all default layers, then `explicit` if given.
    ///
    /// Missing default files are skipped; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        for path in Self::search_paths() {
            if path.is_file() {
                debug!(path = %path.display(), "loading config layer");
                config = config.merge(Self::from_file(&path)?);
            }
        }
        if let Some(path) = explicit {
            debug!(path = %path.display(), "loading explicit config");
            config = config.merge(Self::from_file(path)?);
        }
        Ok(config)
    }

    /// Default config locations, lowest priority first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = Self::user_config_path() {
            paths.push(path);
        }
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(LOCAL_CONFIG_FILE));
        }
        paths
    }

    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "esdv").map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse YAML content; `name` labels diagnostics
    pub fn parse(content: &str, name: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yml::from_str(content).map_err(|e| ConfigError::Syntax {
            name: name.to_string(),
            message: e.to_string(),
            span: e.location().map(|l| SourceSpan::from((l.index(), 1))),
            source_code: NamedSource::new(name, content.to_string()),
        })
    }

    /// Overlay `other` on top of `self`, keeping `self` where `other` is unset
    pub fn merge(self, other: Config) -> Config {
        Config {
            output: other.output.or(self.output),
            cdm: CdmSettings {
                target: other.cdm.target.or(self.cdm.target),
                bandwidth: other.cdm.bandwidth.or(self.cdm.bandwidth),
            },
            hbm: HbmSettings {
                fit_window: other.hbm.fit_window.or(self.hbm.fit_window),
                double_peak: DoublePeakSettings {
                    enabled: other.hbm.double_peak.enabled.or(self.hbm.double_peak.enabled),
                    lower_cutoff: other
                        .hbm
                        .double_peak
                        .lower_cutoff
                        .or(self.hbm.double_peak.lower_cutoff),
                    minimum_increase: other
                        .hbm
                        .double_peak
                        .minimum_increase
                        .or(self.hbm.double_peak.minimum_increase),
                },
                noise: NoiseSettings {
                    strategy: other.hbm.noise.strategy.or(self.hbm.noise.strategy),
                    cutoff_time: other.hbm.noise.cutoff_time.or(self.hbm.noise.cutoff_time),
                },
                decay_search_limit: other
                    .hbm
                    .decay_search_limit
                    .or(self.hbm.decay_search_limit),
            },
        }
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// CDM table key, defaulting to a large target on a high-bandwidth scope
    pub fn cdm_configuration(&self) -> CdmConfiguration {
        CdmConfiguration::new(
            self.cdm.target.unwrap_or_default(),
            self.cdm.bandwidth.unwrap_or_default(),
        )
    }

    pub fn double_peak(&self) -> Option<DoublePeakDetection> {
        let settings = &self.hbm.double_peak;
        if !settings.enabled.unwrap_or(false) {
            return None;
        }
        let defaults = DoublePeakDetection::default();
        Some(DoublePeakDetection {
            lower_cutoff: settings.lower_cutoff.unwrap_or(defaults.lower_cutoff),
            minimum_increase: settings.minimum_increase.unwrap_or(defaults.minimum_increase),
        })
    }

    pub fn noise(&self) -> Result<NoiseCompensation, ConfigError> {
        match self.hbm.noise.strategy {
            None | Some(NoiseStrategy::None) => Ok(NoiseCompensation::None),
            Some(NoiseStrategy::Filtered) => Ok(NoiseCompensation::Filtered),
            Some(NoiseStrategy::PreTrigger) => self
                .hbm
                .noise
                .cutoff_time
                .map(|cutoff_time| NoiseCompensation::PreTrigger { cutoff_time })
                .ok_or(ConfigError::MissingNoiseCutoff),
        }
    }

    /// Zero-ohm evaluator options with configured values applied over the defaults
    pub fn hbm_options(&self) -> Result<HbmZeroOhmOptions, ConfigError> {
        Ok(self.hbm_options_with_noise(self.noise()?))
    }

    /// As [`Config::hbm_options`], with the noise compensation chosen by the caller
    pub fn hbm_options_with_noise(&self, noise: NoiseCompensation) -> HbmZeroOhmOptions {
        let defaults = HbmZeroOhmOptions::default();
        HbmZeroOhmOptions {
            fit_window: self.hbm.fit_window.unwrap_or(defaults.fit_window),
            double_peak: self.double_peak(),
            noise,
            decay_search_limit: self
                .hbm
                .decay_search_limit
                .unwrap_or(defaults.decay_search_limit),
            ..defaults
        }
    }
}

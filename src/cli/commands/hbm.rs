//! `esdv hbm` command - JS-001 human-body model evaluation

use std::path::PathBuf;

use miette::Result;
use tracing::warn;

use crate::cli::choices::{LoadArg, NoiseArg};
use crate::cli::helpers::{format_time, load_waveform};
use crate::cli::output::{check_strict, effective_format, print_evaluation};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::NoiseStrategy;
use crate::core::Config;
use crate::standards::{
    DoublePeakDetection, Evaluation, HbmFiveHundredOhmJs001, HbmZeroOhmJs001, HbmZeroOhmOptions,
    NoiseCompensation,
};

#[derive(clap::Args, Debug)]
pub struct HbmArgs {
    /// Capture file: two columns of time (s) and current (A), comma or tab separated
    pub file: PathBuf,

    /// Test voltage in volts; a negative value selects negative polarity
    #[arg(long, allow_negative_numbers = true)]
    pub voltage: f64,

    /// Tester load the capture was taken into
    #[arg(long, value_enum, default_value_t = LoadArg::ZeroOhm)]
    pub load: LoadArg,

    /// Length of the line-fit window after the peak, seconds (0 Ω only)
    #[arg(long)]
    pub fit_window: Option<f64>,

    /// Re-select a second peak that follows a dip (0 Ω only)
    #[arg(long)]
    pub double_peak: bool,

    /// Second hump must stay above this fraction of the peak (implies --double-peak)
    #[arg(long)]
    pub double_peak_cutoff: Option<f64>,

    /// Required climb out of the dip as a fraction of the peak (implies --double-peak)
    #[arg(long)]
    pub double_peak_increase: Option<f64>,

    /// Noise compensation for the ringing measurement (0 Ω only)
    #[arg(long, value_enum)]
    pub noise: Option<NoiseArg>,

    /// End of the pre-trigger baseline, seconds (for --noise pre-trigger)
    #[arg(long, allow_negative_numbers = true)]
    pub noise_cutoff: Option<f64>,

    /// Exit with an error unless the waveform passes
    #[arg(long)]
    pub strict: bool,
}

impl HbmArgs {
    fn has_zero_ohm_options(&self) -> bool {
        self.fit_window.is_some()
            || self.double_peak
            || self.double_peak_cutoff.is_some()
            || self.double_peak_increase.is_some()
            || self.noise.is_some()
            || self.noise_cutoff.is_some()
    }
}

pub fn run(args: HbmArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load(global.config.as_deref())?;
    let format = effective_format(global.output, &config);

    match args.load {
        LoadArg::ZeroOhm => run_zero_ohm(&args, &config, format),
        LoadArg::FiveHundredOhm => {
            if args.has_zero_ohm_options() {
                warn!("fit, double-peak and noise options only apply to the 0 Ω load");
            }
            let waveform = load_waveform(&args.file, format)?;
            let evaluation = HbmFiveHundredOhmJs001::new(&waveform, args.voltage)?;
            let notes = vec![format!("Tolerance: {}", evaluation.tolerance.resolution)];
            print_evaluation(&evaluation, &args.file, format, &notes)?;
            check_strict(evaluation.verdict(), args.strict)
        }
    }
}

fn run_zero_ohm(args: &HbmArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let options = zero_ohm_options(args, config)?;
    let waveform = load_waveform(&args.file, format)?;
    let evaluation = HbmZeroOhmJs001::with_options(&waveform, args.voltage, options)?;

    let mut notes = vec![format!("Tolerance: {}", evaluation.tolerance.resolution)];
    if evaluation.options.double_peak.is_some() {
        notes.push("Double-peak detection enabled".to_string());
    }
    match evaluation.options.noise {
        NoiseCompensation::None => {}
        NoiseCompensation::PreTrigger { cutoff_time } => notes.push(format!(
            "Noise: pre-trigger baseline up to {}",
            format_time(cutoff_time)
        )),
        NoiseCompensation::Filtered => notes.push("Noise: Bessel-filtered residual".to_string()),
    }
    if evaluation.decay_time.is_some_and(|d| d.extended) {
        notes.push("Decay fit extended past the end of the capture".to_string());
    }

    print_evaluation(&evaluation, &args.file, format, &notes)?;
    check_strict(evaluation.verdict(), args.strict)
}

/// Configured options with command-line flags applied on top
fn zero_ohm_options(args: &HbmArgs, config: &Config) -> Result<HbmZeroOhmOptions> {
    let noise = if args.noise.is_some() || args.noise_cutoff.is_some() {
        noise_from_flags(args, config)?
    } else {
        config.noise()?
    };
    let mut options = config.hbm_options_with_noise(noise);

    if let Some(window) = args.fit_window {
        options.fit_window = window;
    }

    let double_peak_flags = args.double_peak
        || args.double_peak_cutoff.is_some()
        || args.double_peak_increase.is_some();
    if double_peak_flags {
        let base = options.double_peak.unwrap_or_default();
        options.double_peak = Some(DoublePeakDetection {
            lower_cutoff: args.double_peak_cutoff.unwrap_or(base.lower_cutoff),
            minimum_increase: args.double_peak_increase.unwrap_or(base.minimum_increase),
        });
    }

    Ok(options)
}

/// `--noise-cutoff` alone selects the pre-trigger strategy
fn noise_from_flags(args: &HbmArgs, config: &Config) -> Result<NoiseCompensation> {
    let strategy = args
        .noise
        .map(NoiseStrategy::from)
        .unwrap_or(NoiseStrategy::PreTrigger);
    Ok(match strategy {
        NoiseStrategy::None => NoiseCompensation::None,
        NoiseStrategy::Filtered => NoiseCompensation::Filtered,
        NoiseStrategy::PreTrigger => {
            let cutoff_time = args
                .noise_cutoff
                .or(config.hbm.noise.cutoff_time)
                .ok_or_else(|| {
                    miette::miette!("--noise pre-trigger needs --noise-cutoff <SECONDS>")
                })?;
            NoiseCompensation::PreTrigger { cutoff_time }
        }
    })
}

//! `esdv cdm` command - JS-002 charged-device model evaluation

use std::path::PathBuf;

use miette::Result;

use crate::cli::choices::{BandwidthArg, TargetArg};
use crate::cli::helpers::load_waveform;
use crate::cli::output::{check_strict, effective_format, print_evaluation};
use crate::cli::GlobalOpts;
use crate::core::Config;
use crate::standards::{CdmConfiguration, CdmJs002, Evaluation};

#[derive(clap::Args, Debug)]
pub struct CdmArgs {
    /// Capture file: two columns of time (s) and current (A), comma or tab separated
    pub file: PathBuf,

    /// Test voltage in volts; a negative value selects negative polarity
    #[arg(long, allow_negative_numbers = true)]
    pub voltage: f64,

    /// Verification module size (default from config, else large)
    #[arg(long, value_enum)]
    pub target: Option<TargetArg>,

    /// Oscilloscope bandwidth (default from config, else high)
    #[arg(long, value_enum)]
    pub bandwidth: Option<BandwidthArg>,

    /// Exit with an error unless the waveform passes
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: CdmArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load(global.config.as_deref())?;
    let format = effective_format(global.output, &config);

    let defaults = config.cdm_configuration();
    let configuration = CdmConfiguration::new(
        args.target.map(Into::into).unwrap_or(defaults.target),
        args.bandwidth.map(Into::into).unwrap_or(defaults.bandwidth),
    );

    let waveform = load_waveform(&args.file, format)?;
    let evaluation = CdmJs002::new(&waveform, args.voltage, configuration)?;

    let notes = vec![
        format!("Configuration: {}", configuration),
        format!("Tolerance: {}", evaluation.tolerance.resolution),
    ];
    print_evaluation(&evaluation, &args.file, format, &notes)?;
    check_strict(evaluation.verdict(), args.strict)
}

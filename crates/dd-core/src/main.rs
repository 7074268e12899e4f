//! ddstat - significance and limits for counting experiments
//!
//! The command-line front end for `dd-core`:
//! - Log-likelihood and exclusion p-values for one experiment
//! - Rescaling a signal prediction to a target confidence level
//! - Feldman-Cousins signal intervals
//! - Batch summaries over a TOML file of experiments

use clap::{Args, Parser, Subcommand};
use dd_core::config::{load_config, ConfigError, EngineConfig};
use dd_core::exit_codes::ExitCode;
use dd_core::experiments::{ExperimentFile, InputError};
use dd_core::inference::{
    confidence_interval, summarize, AnalysisOptions, CountingResult, ExperimentSummary,
    StatsError,
};
use dd_core::logging::{event_names, init_logging, LogConfig, LogFormat, LogLevel, Stage};
use dd_core::output::{format_sig, table_row, to_json, OutputFormat};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// Significance, signal rescaling, and confidence intervals for rare-event
/// counting experiments
#[derive(Parser)]
#[command(name = "ddstat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Config file (overrides DDSTAT_CONFIG and the XDG location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level (overrides DDSTAT_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr: human or jsonl (overrides DDSTAT_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log-likelihood of the observed count given background plus signal
    Likelihood(CountArgs),

    /// Exclusion log p-value (maximum gap with --intervals, Poisson otherwise)
    Pvalue(PValueArgs),

    /// Factor by which the signal must be rescaled to reach the target p-value
    Scale(ScaleArgs),

    /// Feldman-Cousins confidence interval on the signal
    Interval(IntervalArgs),

    /// Run every analysis over a TOML file of experiments
    Summary(SummaryArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Likelihood(_) => "likelihood",
            Commands::Pvalue(_) => "pvalue",
            Commands::Scale(_) => "scale",
            Commands::Interval(_) => "interval",
            Commands::Summary(_) => "summary",
        }
    }
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct CountArgs {
    /// Observed event count
    #[arg(long, short = 'n')]
    observed: u64,

    /// Expected background events
    #[arg(long, short = 'b', default_value_t = 0.0, allow_negative_numbers = true)]
    background: f64,

    /// Expected signal events
    #[arg(long, short = 's', allow_negative_numbers = true)]
    signal: f64,
}

#[derive(Args, Debug)]
struct PValueArgs {
    #[command(flatten)]
    counts: CountArgs,

    /// Expected signal in each gap between observed events, comma-separated
    /// (observed + 1 values)
    #[arg(long, value_delimiter = ',')]
    intervals: Option<Vec<f64>>,
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Target log p-value, e.g. -2.302585 for 90% CL
    #[arg(long, allow_negative_numbers = true, conflicts_with = "cl")]
    lnp: Option<f64>,

    /// Target confidence level, e.g. 0.9
    #[arg(long)]
    cl: Option<f64>,
}

#[derive(Args, Debug)]
struct ScaleArgs {
    #[command(flatten)]
    pvalue: PValueArgs,

    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Args, Debug)]
struct IntervalArgs {
    /// Observed event count
    #[arg(long, short = 'n')]
    observed: u64,

    /// Expected background events
    #[arg(long, short = 'b', default_value_t = 0.0, allow_negative_numbers = true)]
    background: f64,

    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    /// TOML file with [[experiment]] tables
    #[arg(long, short = 'i')]
    input: PathBuf,

    #[command(flatten)]
    target: TargetArgs,
}

impl TargetArgs {
    /// `--lnp`, then `--cl`, then the configured default.
    fn resolve(&self, config: &EngineConfig) -> Result<AnalysisOptions, StatsError> {
        match (self.lnp, self.cl) {
            (Some(lnp), _) => AnalysisOptions::new(lnp),
            (None, Some(cl)) => AnalysisOptions::from_confidence_level(cl),
            (None, None) => Ok(AnalysisOptions::from_config(&config.analysis)),
        }
    }
}

impl CountArgs {
    fn counting_result(&self) -> Result<CountingResult, StatsError> {
        CountingResult::new(self.observed, self.background, self.signal)
    }
}

impl PValueArgs {
    fn counting_result(&self) -> Result<CountingResult, StatsError> {
        let result = self.counts.counting_result()?;
        match &self.intervals {
            Some(intervals) => result.with_intervals(intervals.clone()),
            None => Ok(result),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Stats(err) => ExitCode::from(err),
            CliError::Config(err) => ExitCode::from(err),
            CliError::Input(InputError::Io { .. }) => ExitCode::IoError,
            CliError::Input(InputError::Invalid { source, .. }) => ExitCode::from(source),
            CliError::Input(_) => ExitCode::ArgsError,
            CliError::Output(_) => ExitCode::IoError,
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version also arrive here, on stdout
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Ok
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let mut log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    log_config.level = log_config
        .level
        .adjusted(cli.global.verbose, cli.global.quiet);
    init_logging(&log_config);

    info!(
        event = event_names::RUN_STARTED,
        stage = %Stage::Init,
        command = cli.command.name(),
        "ddstat started"
    );

    let exit_code = match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::Ok
        }
        Err(err) => report_error(&cli.global, &err),
    };

    info!(
        event = event_names::RUN_FINISHED,
        stage = %Stage::Init,
        exit_code = exit_code.as_i32(),
        "ddstat finished"
    );
    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli) -> Result<String, CliError> {
    let resolved = load_config(cli.global.config.as_deref())?;
    match &resolved.path {
        Some(path) => info!(
            event = event_names::CONFIG_LOADED,
            stage = %Stage::Init,
            path = %path.display(),
            source = %resolved.source,
            "config loaded"
        ),
        None => debug!(
            event = event_names::CONFIG_DEFAULT_USED,
            stage = %Stage::Init,
            "no config file found; using built-in defaults"
        ),
    }
    let config = &resolved.config;
    let format = cli.global.format;

    match &cli.command {
        Commands::Likelihood(args) => run_likelihood(args, format),
        Commands::Pvalue(args) => run_pvalue(args, format),
        Commands::Scale(args) => run_scale(args, config, format),
        Commands::Interval(args) => run_interval(args, config, format),
        Commands::Summary(args) => run_summary(args, config, format),
    }
}

fn report_error(global: &GlobalOpts, err: &CliError) -> ExitCode {
    let exit_code = err.exit_code();
    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "status": "error",
                "error": {
                    "code": exit_code.code_name(),
                    "exit_code": exit_code.as_i32(),
                    "message": err.to_string(),
                }
            });
            match serde_json::to_string_pretty(&response) {
                Ok(text) => eprintln!("{text}"),
                Err(_) => eprintln!("Error: {err}"),
            }
        }
        OutputFormat::Human => eprintln!("Error: {err}"),
    }
    exit_code
}

// ============================================================================
// Command implementations
// ============================================================================

/// Infinite scales and bounds have no JSON number; report them as null.
fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn percent(cl: f64) -> String {
    let pct = cl * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{pct:.0}%")
    } else {
        format!("{pct:.2}%")
    }
}

#[derive(Serialize)]
struct LikelihoodReport {
    observed: u64,
    background: f64,
    signal: f64,
    log_likelihood: f64,
}

fn run_likelihood(args: &CountArgs, format: OutputFormat) -> Result<String, CliError> {
    let result = args.counting_result()?;
    let report = LikelihoodReport {
        observed: result.events(),
        background: result.background(),
        signal: result.signal(),
        log_likelihood: result.log_likelihood(),
    };
    match format {
        OutputFormat::Json => Ok(to_json(&report)?),
        OutputFormat::Human => Ok([
            table_row("Observed events", [report.observed.to_string()]),
            table_row("Expected background", [format_sig(report.background)]),
            table_row("Expected signal", [format_sig(report.signal)]),
            table_row("Log-likelihood", [format_sig(report.log_likelihood)]),
        ]
        .join("\n")),
    }
}

#[derive(Serialize)]
struct PValueReport {
    observed: u64,
    background: f64,
    signal: f64,
    method: &'static str,
    max_interval_fraction: Option<f64>,
    log_p_value: f64,
    p_value: f64,
}

fn run_pvalue(args: &PValueArgs, format: OutputFormat) -> Result<String, CliError> {
    let result = args.counting_result()?;
    let log_p_value = result.log_p_value()?;
    let report = PValueReport {
        observed: result.events(),
        background: result.background(),
        signal: result.signal(),
        method: if result.has_intervals() {
            "maximum_gap"
        } else {
            "poisson"
        },
        max_interval_fraction: result
            .has_intervals()
            .then(|| result.max_interval_fraction()),
        log_p_value,
        p_value: log_p_value.exp(),
    };
    match format {
        OutputFormat::Json => Ok(to_json(&report)?),
        OutputFormat::Human => Ok([
            table_row("Method", [report.method.to_string()]),
            table_row("Log p-value", [format_sig(report.log_p_value)]),
            table_row("p-value", [format_sig(report.p_value)]),
        ]
        .join("\n")),
    }
}

#[derive(Serialize)]
struct ScaleReport {
    observed: u64,
    background: f64,
    signal: f64,
    method: &'static str,
    lnp: f64,
    confidence_level: f64,
    scale: Option<f64>,
}

fn run_scale(
    args: &ScaleArgs,
    config: &EngineConfig,
    format: OutputFormat,
) -> Result<String, CliError> {
    let result = args.pvalue.counting_result()?;
    let options = args.target.resolve(config)?;
    let scale = result.scale_to_p_value(&options, config)?;
    let report = ScaleReport {
        observed: result.events(),
        background: result.background(),
        signal: result.signal(),
        method: if result.has_intervals() {
            "maximum_gap"
        } else {
            "poisson"
        },
        lnp: options.lnp,
        confidence_level: options.confidence_level(),
        scale: finite(scale),
    };
    match format {
        OutputFormat::Json => Ok(to_json(&report)?),
        OutputFormat::Human => Ok(table_row(
            &format!("Rescaling for {} CL", percent(report.confidence_level)),
            [format_sig(scale)],
        )),
    }
}

#[derive(Serialize)]
struct IntervalReport {
    observed: u64,
    background: f64,
    lnp: f64,
    confidence_level: f64,
    lower: f64,
    upper: Option<f64>,
}

fn run_interval(
    args: &IntervalArgs,
    config: &EngineConfig,
    format: OutputFormat,
) -> Result<String, CliError> {
    let options = args.target.resolve(config)?;
    let interval = confidence_interval(options.lnp, args.observed, args.background, config)?;
    let report = IntervalReport {
        observed: args.observed,
        background: args.background.max(0.0),
        lnp: options.lnp,
        confidence_level: options.confidence_level(),
        lower: interval.lower,
        upper: finite(interval.upper),
    };
    match format {
        OutputFormat::Json => Ok(to_json(&report)?),
        OutputFormat::Human => Ok(format!(
            "{} CL interval: [{}, {}]",
            percent(report.confidence_level),
            format_sig(interval.lower),
            format_sig(interval.upper)
        )),
    }
}

#[derive(Serialize)]
struct SummaryReport {
    lnp: f64,
    confidence_level: f64,
    experiments: Vec<ExperimentSummary>,
}

fn run_summary(
    args: &SummaryArgs,
    config: &EngineConfig,
    format: OutputFormat,
) -> Result<String, CliError> {
    let file = ExperimentFile::from_file(&args.input)?;
    let options = args.target.resolve(config)?;

    let mut experiments = Vec::with_capacity(file.experiment.len());
    for entry in &file.experiment {
        let result = entry.to_counting_result()?;
        experiments.push(summarize(&entry.name, &result, &options, config)?);
    }
    let report = SummaryReport {
        lnp: options.lnp,
        confidence_level: options.confidence_level(),
        experiments,
    };

    match format {
        OutputFormat::Json => Ok(to_json(&report)?),
        OutputFormat::Human => Ok(render_summary_table(&report)),
    }
}

fn column<F>(rows: &[ExperimentSummary], cell: F) -> Vec<String>
where
    F: Fn(&ExperimentSummary) -> String,
{
    rows.iter().map(cell).collect()
}

fn render_summary_table(report: &SummaryReport) -> String {
    let rows = &report.experiments;
    let lines = [
        table_row("", column(rows, |e| e.name.clone())),
        table_row("Observed events", column(rows, |e| e.events.to_string())),
        table_row("Expected background", column(rows, |e| format_sig(e.background))),
        table_row("Expected signal", column(rows, |e| format_sig(e.signal))),
        table_row("Log-likelihood", column(rows, |e| format_sig(e.log_likelihood))),
        table_row("Log p-value", column(rows, |e| format_sig(e.log_p_value))),
        table_row(
            &format!("Rescaling for {} CL*", percent(report.confidence_level)),
            column(rows, |e| format_sig(e.scale)),
        ),
        table_row("FC interval lower", column(rows, |e| format_sig(e.interval.lower))),
        table_row("FC interval upper", column(rows, |e| format_sig(e.interval.upper))),
        " * factor by which the signal must be rescaled to give the desired p-value".to_string(),
    ];
    lines.join("\n")
}

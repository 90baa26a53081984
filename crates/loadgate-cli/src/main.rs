use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use loadgate_app::{
    render_markdown, CaptureBaselineRequest, CaptureBaselineUseCase, CheckRequest, CheckUseCase,
    CompareRequest, CompareUseCase, SummarizeUseCase, SystemClock, ValidateRequest,
    ValidateUseCase, EXIT_PASS, EXIT_TOOL_ERROR,
};
use loadgate_config::{discover, parse_p_value_mode, parse_polarity, resolve, Overrides};
use loadgate_types::{AnalysisConfig, Baseline, Direction, PValueMode, RunResults};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "loadgate",
    version,
    about = "Statistical comparison, validation and regression gating for load-test results"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Config file (default: ./loadgate.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Args, Default)]
struct ThresholdArgs {
    /// Relative change that counts as a regression (default 0.05 = 5%)
    #[arg(long)]
    regression_threshold: Option<f64>,

    /// p-value below which a change is significant
    #[arg(long)]
    significance_threshold: Option<f64>,

    /// p-value estimator: lookup | student_t
    #[arg(long, value_parser = parse_mode_arg)]
    p_value_mode: Option<PValueMode>,

    /// Metric polarity, e.g. throughput=higher. Repeatable.
    #[arg(long, value_parser = parse_polarity_arg)]
    polarity: Vec<(String, Direction)>,
}

impl ThresholdArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            confidence_level: None,
            significance_threshold: self.significance_threshold,
            regression_threshold: self.regression_threshold,
            p_value_mode: self.p_value_mode,
            polarity: self.polarity,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Derive per-metric statistics for every scenario that lacks them.
    Summarize {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "loadgate-run.json")]
        out: PathBuf,
    },

    /// Compare two result sets and emit a comparison report (JSON).
    Compare {
        #[arg(long)]
        baseline: PathBuf,

        #[arg(long)]
        current: PathBuf,

        #[arg(long, default_value = "loadgate-compare.json")]
        out: PathBuf,

        /// Also write a Markdown summary
        #[arg(long)]
        md: Option<PathBuf>,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Check a result set for reliability problems.
    Validate {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "loadgate-validation.json")]
        out: PathBuf,

        /// Exit 2 when validation fails
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Freeze a result set into a named baseline.
    Baseline {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "loadgate-baseline.json")]
        out: PathBuf,
    },

    /// Validate a result set and gate it against a baseline.
    Check {
        #[arg(long)]
        baseline: PathBuf,

        #[arg(long)]
        current: PathBuf,

        /// Directory for validation.json, gate.json and summary.md
        #[arg(long, default_value = "artifacts/loadgate")]
        out_dir: PathBuf,

        /// Exit 2 when the gate or validation fails
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Print GitHub Actions annotations to stdout
        #[arg(long, default_value_t = false)]
        annotations: bool,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(EXIT_TOOL_ERROR as u8)
        }
    }
}

fn real_main() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let pretty = cli.pretty;
    let config_path = cli.config.as_deref();

    match cli.cmd {
        Command::Summarize { input, out } => {
            let run = read_run(&input)?;
            let outcome = SummarizeUseCase::execute(run);
            info!(derived = outcome.derived, "summarized {}", input.display());
            write_json(&out, &outcome.run, pretty)?;
            Ok(EXIT_PASS)
        }

        Command::Compare {
            baseline,
            current,
            out,
            md,
            thresholds,
        } => {
            let config = load_config(config_path, thresholds.into_overrides())?;
            let report = CompareUseCase::execute(CompareRequest {
                baseline: read_run(&baseline)?,
                current: read_run(&current)?,
                config,
            });

            write_json(&out, &report, pretty)?;
            if let Some(path) = md {
                atomic_write(&path, render_markdown(&report).as_bytes())?;
            }
            Ok(EXIT_PASS)
        }

        Command::Validate { input, out, strict } => {
            let config = load_config(config_path, Overrides::default())?;
            let outcome = ValidateUseCase::execute(ValidateRequest {
                run: read_run(&input)?,
                config: config.validation,
                strict,
            });

            write_json(&out, &outcome.report, pretty)?;
            if outcome.failed {
                eprintln!("validation failed (score {})", outcome.report.score);
            }
            Ok(outcome.exit_code)
        }

        Command::Baseline { input, name, out } => {
            let config = load_config(config_path, Overrides::default())?;
            let baseline = CaptureBaselineUseCase::new(SystemClock).execute(CaptureBaselineRequest {
                name,
                run: read_run(&input)?,
                config: config.validation,
            })?;
            write_json(&out, &baseline, pretty)?;
            Ok(EXIT_PASS)
        }

        Command::Check {
            baseline,
            current,
            out_dir,
            strict,
            annotations,
            thresholds,
        } => {
            let config = load_config(config_path, thresholds.into_overrides())?;
            let baseline: Baseline = read_json(&baseline)?;
            let outcome = CheckUseCase::execute(CheckRequest {
                baseline,
                current: read_run(&current)?,
                config,
                strict,
            });

            write_json(&out_dir.join("validation.json"), &outcome.validation, pretty)?;
            write_json(&out_dir.join("gate.json"), &outcome.gate, pretty)?;
            atomic_write(&out_dir.join("summary.md"), outcome.markdown.as_bytes())?;

            if annotations {
                for line in &outcome.annotations {
                    println!("{line}");
                }
            }
            for reason in &outcome.reasons {
                eprintln!("{reason}");
            }
            Ok(outcome.exit_code)
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(explicit: Option<&Path>, overrides: Overrides) -> anyhow::Result<AnalysisConfig> {
    let found = discover(explicit, Path::new("."))?;
    if let Some((path, _)) = &found {
        debug!(path = %path.display(), "loaded config");
    }
    let config = resolve(found.as_ref().map(|(_, file)| file), &overrides)
        .context("invalid configuration")?;
    Ok(config)
}

fn parse_polarity_arg(s: &str) -> Result<(String, Direction), String> {
    parse_polarity(s).map_err(|e| e.to_string())
}

fn parse_mode_arg(s: &str) -> Result<PValueMode, String> {
    parse_p_value_mode(s).map_err(|e| e.to_string())
}

fn read_run(path: &Path) -> anyhow::Result<RunResults> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let run = RunResults::from_json_slice(&bytes)
        .with_context(|| format!("parse result set {}", path.display()))?;
    Ok(run)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v =
        serde_json::from_slice(&bytes).with_context(|| format!("parse json {}", path.display()))?;
    Ok(v)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> anyhow::Result<()> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };

    atomic_write(path, &bytes)
}

/// Write through a temp file in the same directory, then rename into place.
fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;

    let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use loadgate_types::{
    BASELINE_SCHEMA_V1, COMPARE_SCHEMA_V1, GATE_SCHEMA_V1, RUN_SCHEMA_V1, VALIDATION_SCHEMA_V1,
};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Repo automation for loadgate")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// (Re)generate JSON Schemas for every document loadgate reads or writes.
    Schema {
        /// Output directory
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,

        /// Fail instead of writing when a schema on disk is stale
        #[arg(long, default_value_t = false)]
        check: bool,
    },

    /// Run the usual repo checks (fmt, clippy, test, schema drift).
    Ci,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Schema { out_dir, check } => cmd_schema(&out_dir, check),
        Command::Ci => cmd_ci(),
    }
}

fn cmd_ci() -> anyhow::Result<()> {
    run("cargo", &["fmt", "--all", "--", "--check"])?;
    run(
        "cargo",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )?;
    run("cargo", &["test", "--workspace"])?;
    run("cargo", &["run", "-p", "xtask", "--", "schema", "--check"])?;
    Ok(())
}

fn run(bin: &str, args: &[&str]) -> anyhow::Result<()> {
    let status = std::process::Command::new(bin)
        .args(args)
        .status()
        .with_context(|| format!("running {bin}"))?;
    if !status.success() {
        anyhow::bail!("{bin} {} failed: {status}", args.join(" "));
    }
    Ok(())
}

fn schemas() -> anyhow::Result<Vec<(String, Vec<u8>)>> {
    let docs = [
        (RUN_SCHEMA_V1, serde_json::to_vec_pretty(&schema_for!(loadgate_types::RunResults))?),
        (
            COMPARE_SCHEMA_V1,
            serde_json::to_vec_pretty(&schema_for!(loadgate_types::ComparisonReport))?,
        ),
        (
            VALIDATION_SCHEMA_V1,
            serde_json::to_vec_pretty(&schema_for!(loadgate_types::ValidationReport))?,
        ),
        (BASELINE_SCHEMA_V1, serde_json::to_vec_pretty(&schema_for!(loadgate_types::Baseline))?),
        (GATE_SCHEMA_V1, serde_json::to_vec_pretty(&schema_for!(loadgate_types::GateResult))?),
        ("loadgate.config.v1", serde_json::to_vec_pretty(&schema_for!(loadgate_types::ConfigFile))?),
    ];
    Ok(docs
        .into_iter()
        .map(|(id, mut json)| {
            json.push(b'\n');
            (format!("{id}.schema.json"), json)
        })
        .collect())
}

fn cmd_schema(out_dir: &Path, check: bool) -> anyhow::Result<()> {
    let mut stale = Vec::new();

    if !check {
        fs::create_dir_all(out_dir).with_context(|| format!("create dir {}", out_dir.display()))?;
    }

    for (name, json) in schemas()? {
        let path = out_dir.join(&name);
        if check {
            let on_disk = fs::read(&path).unwrap_or_default();
            if on_disk != json {
                stale.push(name);
            }
        } else {
            fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        }
    }

    if !stale.is_empty() {
        anyhow::bail!(
            "schemas out of date in {}: {} (run `cargo run -p xtask -- schema`)",
            out_dir.display(),
            stale.join(", ")
        );
    }
    Ok(())
}

//! dayclust - cluster one day of partitioned distance records.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dayclust_objstore::FsStore;
use dayclust_pipeline::{Config, ConfigOption, Pipeline};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// Cluster one day of partitioned distance records.
///
/// Options are read from the environment first (MAX_RECORDS, ALGORITHM,
/// HYPER_PARAMS, CONVERT_KEY_TO_INT, INPUT_FOLDER, OUTPUT_FOLDER, BUCKET,
/// RECORD_CAP_SCOPE) and then from --set flags.
#[derive(Parser, Debug)]
#[command(name = "dayclust")]
#[command(about = "Cluster one day of partitioned distance records")]
#[command(version)]
struct Args {
    /// Store root directory; the bucket is a sub-directory of it
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Day to cluster (e.g. 2024-01-01)
    #[arg(short, long, conflicts_with = "event")]
    day: Option<String>,

    /// Invocation payload JSON file ("-" for stdin)
    #[arg(short, long)]
    event: Option<String>,

    /// Override an option: name=value (repeatable)
    #[arg(short = 's', long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = load_config(&args.set)?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let payload = load_payload(&args)?;

    let root = if cfg.bucket.is_empty() {
        args.root.clone()
    } else {
        args.root.join(&cfg.bucket)
    };
    let store = FsStore::open(&root).with_context(|| format!("open store {}", root.display()))?;
    tracing::debug!(root = %root.display(), "store opened");

    let pipeline = Pipeline::with_default_registry(cfg, Box::new(store))?;
    let outcome = pipeline.handle(&payload)?;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

/// Environment first, then `--set name=value` overrides in order.
fn load_config(overrides: &[String]) -> Result<Config> {
    let mut cfg = Config::from_env()?;
    for item in overrides {
        let (name, value) = item
            .split_once('=')
            .with_context(|| format!("--set expects NAME=VALUE, got {item:?}"))?;
        if let Err(e) = cfg.set(name, value) {
            let names: Vec<&str> = ConfigOption::ALL.iter().map(|o| o.name()).collect();
            return Err(e).with_context(|| format!("known options: {}", names.join(", ")));
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn load_payload(args: &Args) -> Result<Value> {
    if let Some(day) = &args.day {
        return Ok(json!({ "day": day }));
    }
    let Some(path) = &args.event else {
        return Ok(json!({}));
    };
    let mut text = String::new();
    if path == "-" {
        std::io::stdin().read_to_string(&mut text)?;
    } else {
        text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    }
    serde_json::from_str(&text).with_context(|| format!("parse event {path}"))
}

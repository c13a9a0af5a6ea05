// src/cli.rs
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, bail};

use crate::config::options::{AppOptions, FetchMode};
use crate::core::canon::AliasTable;
use crate::fetch::{self, Target};
use crate::progress::Progress;
use crate::publish::FlipOutcome;
use crate::runner;
use crate::scrape::{Pipeline, RunOutcome};
use crate::store::{DocumentStore, ElasticStore, IndexSchema, MemoryStore};
use crate::validate::Validator;

#[derive(Parser, Debug)]
#[command(name = "pop_scrape", version, about = "Scrape world population figures into versioned snapshots")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Fetch strategy (overrides SCRAPE_MODE)
    #[arg(long, global = true, value_enum)]
    pub mode: Option<ModeArg>,

    /// Where snapshots go; `memory` is a dry run
    #[arg(long, global = true, value_enum, default_value_t = StoreArg::Elastic)]
    pub store: StoreArg,

    /// Alias table TOML (overrides ALIAS_FILE)
    #[arg(long, global = true)]
    pub alias_file: Option<PathBuf>,

    /// Log file (overrides LOG_FILE); stderr when unset
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pipeline once
    Run,
    /// Run on the configured interval until Ctrl-C
    Watch,
    /// Create the index if missing
    InitIndex,
    /// Fetch and extract one page, print the records as JSON
    Fetch {
        #[arg(value_enum)]
        target: TargetArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg { Static, Browser }

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreArg { Elastic, Memory }

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TargetArg { World, Countries }

impl From<TargetArg> for Target {
    fn from(t: TargetArg) -> Self {
        match t {
            TargetArg::World => Target::World,
            TargetArg::Countries => Target::Countries,
        }
    }
}

/// Env-derived options with command-line overrides applied.
pub fn resolve_options(args: &Args) -> Result<AppOptions> {
    let mut opts = AppOptions::from_env().wrap_err("reading configuration")?;
    if let Some(mode) = args.mode {
        opts.fetch.mode = match mode {
            ModeArg::Static => FetchMode::Static,
            ModeArg::Browser => FetchMode::Browser,
        };
    }
    if let Some(p) = &args.alias_file { opts.alias_file = Some(p.clone()); }
    if let Some(p) = &args.log_file { opts.log_file = Some(p.clone()); }
    Ok(opts)
}

fn build_store(kind: StoreArg, opts: &AppOptions) -> Result<Arc<dyn DocumentStore>> {
    Ok(match kind {
        StoreArg::Elastic => Arc::new(ElasticStore::new(opts.store.clone())?),
        StoreArg::Memory => Arc::new(MemoryStore::new()),
    })
}

fn load_aliases(opts: &AppOptions) -> Result<AliasTable> {
    match &opts.alias_file {
        Some(path) => AliasTable::load(path).wrap_err_with(|| format!("loading {}", path.display())),
        None => Ok(AliasTable::default()),
    }
}

/// Prints stage updates to stderr.
struct StderrProgress;

impl Progress for StderrProgress {
    fn page_done(&mut self, target: Target, records: usize) {
        eprintln!("{target}: {records} records");
    }
    fn log(&mut self, msg: &str) {
        eprintln!("{msg}");
    }
}

pub async fn run() -> Result<()> {
    let args = Args::parse();
    let opts = resolve_options(&args)?;
    crate::log::init(opts.log_file.as_deref(), args.verbose)?;
    tracing::debug!(?opts, "configuration");

    let aliases = load_aliases(&opts)?;
    let store = build_store(args.store, &opts)?;

    match args.command {
        Command::InitIndex => {
            let created = store.ensure_index(&IndexSchema::snapshot()).await?;
            println!("{}", if created { "index created" } else { "index already exists" });
        }
        Command::Fetch { target } => {
            let fetcher = fetch::build(&opts.source, &opts.fetch)?;
            let pipeline = Pipeline::new(fetcher, store, aliases, Validator::new(opts.validation.clone()));
            let out = pipeline.acquire(target.into()).await;
            println!("{}", serde_json::to_string_pretty(&out.records)?);
            eprintln!("{} records, {} dropped", out.records.len(), out.dropped);
        }
        Command::Run => {
            let fetcher = fetch::build(&opts.source, &opts.fetch)?;
            let pipeline = Pipeline::new(fetcher, store, aliases, Validator::new(opts.validation.clone()));
            match pipeline.run_once(Some(&mut StderrProgress)).await? {
                RunOutcome::Published(report) => {
                    println!(
                        "generation {}: {} accepted, {} failed",
                        report.generation, report.accepted, report.failed
                    );
                    if let FlipOutcome::Failed(reason) = &report.flip {
                        bail!("new generation written but older documents are still current: {reason}");
                    }
                }
                RunOutcome::Rejected(batch) => {
                    bail!("batch rejected: {}", batch.errors.join("; "));
                }
            }
        }
        Command::Watch => {
            let fetcher = fetch::build(&opts.source, &opts.fetch)?;
            let pipeline = Pipeline::new(fetcher, store, aliases, Validator::new(opts.validation.clone()));
            let shutdown = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
                tracing::info!("Ctrl-C received");
            };
            runner::watch(&pipeline, &opts.schedule, shutdown).await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands_and_globals() {
        let a = Args::try_parse_from(["pop_scrape", "fetch", "countries", "--store", "memory", "--mode", "static"]).unwrap();
        assert!(matches!(a.command, Command::Fetch { target: TargetArg::Countries }));
        assert_eq!(a.store, StoreArg::Memory);

        let a = Args::try_parse_from(["pop_scrape", "init-index"]).unwrap();
        assert!(matches!(a.command, Command::InitIndex));
        assert_eq!(a.store, StoreArg::Elastic);

        assert!(Args::try_parse_from(["pop_scrape", "fetch", "moon"]).is_err());
    }
}

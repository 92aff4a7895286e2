// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `field`: run aggregate-program scenarios on a simulated network.
//!
//! Settings resolve as built-in defaults, then a saved profile
//! (`--profile`), then explicit flags.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use field_cli::config::{ConfigService, FsConfigStore, ScenarioConfig};
use field_cli::scenario::{self, Scenario};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Aggregate-program simulator")]
struct Args {
    /// Directory holding saved profiles (defaults to the user config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Log filter applied on top of RUST_LOG (e.g. `debug`, `field_sim=trace`)
    #[arg(long, global = true, default_value = "warn")]
    log: String,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario and print a summary
    Run(RunArgs),
    /// Inspect saved profiles
    Profile {
        #[command(subcommand)]
        cmd: ProfileCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Print a saved profile as JSON
    Show {
        /// Profile name
        name: String,
    },
    /// Print the built-in defaults as JSON
    Defaults,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Start from this saved profile
    #[arg(long)]
    profile: Option<String>,
    /// Save the resolved settings under this name before running
    #[arg(long)]
    save_profile: Option<String>,
    /// Write the final frame as JSON to this file
    #[arg(long)]
    out: Option<PathBuf>,
    /// Pretty-print the `--out` JSON
    #[arg(long)]
    pretty: bool,
    #[command(flatten)]
    overrides: Overrides,
}

#[derive(ClapArgs, Debug)]
struct Overrides {
    /// Program to run
    #[arg(long, value_enum)]
    scenario: Option<Scenario>,
    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
    /// Lattice columns
    #[arg(long)]
    width: Option<u32>,
    /// Lattice rows
    #[arg(long)]
    height: Option<u32>,
    /// Simulation horizon
    #[arg(long)]
    until: Option<f64>,
    /// Communication range
    #[arg(long)]
    radius: Option<f64>,
    /// Round period
    #[arg(long)]
    period: Option<f64>,
}

impl Overrides {
    fn apply(&self, config: &mut ScenarioConfig) {
        if let Some(v) = self.scenario {
            config.scenario = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(v) = self.height {
            config.height = v;
        }
        if let Some(v) = self.until {
            config.until = v;
        }
        if let Some(v) = self.radius {
            config.radius = v;
        }
        if let Some(v) = self.period {
            config.period = v;
        }
    }
}

fn open_store(dir: Option<&PathBuf>) -> Result<ConfigService<FsConfigStore>> {
    let store = match dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("open profile store")?;
    Ok(ConfigService::new(store))
}

fn load_profile(service: &ConfigService<FsConfigStore>, name: &str) -> Result<ScenarioConfig> {
    service
        .load(name)
        .with_context(|| format!("read profile {name:?}"))?
        .ok_or_else(|| anyhow!("profile {name:?} not found"))
}

fn run(args: &Args, run: &RunArgs) -> Result<()> {
    let mut config = ScenarioConfig::default();
    if let Some(name) = &run.profile {
        config = load_profile(&open_store(args.config_dir.as_ref())?, name)?;
    }
    run.overrides.apply(&mut config);
    if let Some(name) = &run.save_profile {
        open_store(args.config_dir.as_ref())?
            .save(name, &config)
            .with_context(|| format!("save profile {name:?}"))?;
        info!(profile = %name, "profile saved");
    }

    let outcome = scenario::run(&config)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", outcome.report)?;

    if let Some(path) = &run.out {
        let json = outcome.snapshot.to_json(run.pretty)?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), "frame written");
    }
    Ok(())
}

fn profile(args: &Args, cmd: &ProfileCommand) -> Result<()> {
    let config = match cmd {
        ProfileCommand::Show { name } => load_profile(&open_store(args.config_dir.as_ref())?, name)?,
        ProfileCommand::Defaults => ScenarioConfig::default(),
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", serde_json::to_string_pretty(&config)?)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(args.log.parse()?))
        .init();

    match &args.cmd {
        Command::Run(run_args) => run(&args, run_args),
        Command::Profile { cmd } => profile(&args, cmd),
    }
}

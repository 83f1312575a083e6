//! Leader-follow navigation engine.
//!
//! The control loop itself needs a live perception layer and input driver,
//! which are supplied by the embedding host. This binary manages the config
//! file and replays recorded world timelines through the real loop.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use follower::exit_codes;
use follower::io::config::{FollowerConfig, load_config, write_config};
use follower::logging;
use follower::simulate::{SimulateOptions, simulate};

const DEFAULT_CONFIG: &str = "follower.toml";

#[derive(Parser)]
#[command(
    name = "follower",
    version,
    about = "Autonomous leader-follow navigation engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a config file with every default filled in.
    InitConfig {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Load and validate a config file.
    CheckConfig {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        path: PathBuf,
    },
    /// Replay a recorded world timeline and print the input that would be issued.
    Simulate {
        /// Scenario JSON (`frames` of timed world snapshots).
        #[arg(long)]
        scenario: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Leader to follow; overrides the config file.
        #[arg(long)]
        leader: Option<String>,
        #[arg(long, default_value_t = 200)]
        cycles: u64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() {
    logging::init();
    let code = match run().await {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::InitConfig { path, force } => cmd_init_config(&path, force),
        Command::CheckConfig { path } => cmd_check_config(&path),
        Command::Simulate {
            scenario,
            config,
            leader,
            cycles,
            seed,
        } => {
            let opts = SimulateOptions {
                scenario,
                config,
                leader,
                cycles,
                seed,
            };
            let stdout = io::stdout();
            let mut out = stdout.lock();
            simulate(&opts, &mut out).await?;
            out.flush().context("flush stdout")?;
            Ok(())
        }
    }
}

fn cmd_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &FollowerConfig::default())
}

fn cmd_check_config(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("{} not found", path.display());
    }
    let config = load_config(path)?;
    if config.leader_name.trim().is_empty() {
        eprintln!("warning: leader_name is empty; the follower will idle");
    }
    println!("{}: ok", path.display());
    Ok(())
}

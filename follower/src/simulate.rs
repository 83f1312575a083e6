//! Dry run for `follower simulate`: replay a recorded world timeline through
//! the real control loop and print the input it would have issued.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::autopilot::AutoPilot;
use crate::io::config::{FollowerConfig, load_config};
use crate::io::input::RecordingInput;
use crate::io::timeline::{TimelineWorld, load_scenario};
use crate::io::world::ConstantOracle;
use crate::looping::{Flow, LoopOutcome, run_loop};

#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub scenario: PathBuf,
    /// Config file; defaults apply when absent.
    pub config: Option<PathBuf>,
    /// Overrides `leader_name` from the config.
    pub leader: Option<String>,
    pub cycles: u64,
    pub seed: u64,
}

/// Resolve the effective config for a dry run.
pub fn resolve_config(opts: &SimulateOptions) -> Result<FollowerConfig> {
    let mut config = match &opts.config {
        Some(path) => load_config(path)?,
        None => FollowerConfig::default(),
    };
    if let Some(leader) = &opts.leader {
        config.leader_name = leader.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Run the scenario, writing one JSON line per issued input command to `out`
/// followed by a final summary line.
pub async fn simulate<Out: Write>(opts: &SimulateOptions, out: &mut Out) -> Result<LoopOutcome> {
    let config = resolve_config(opts)?;
    let scenario = load_scenario(&opts.scenario)?;
    let oracle = Arc::new(ConstantOracle(scenario.path_status));
    let world = Arc::new(TimelineWorld::from_scenario(scenario));
    let input = Arc::new(RecordingInput::new());
    info!(scenario = %opts.scenario.display(), cycles = opts.cycles, seed = opts.seed, "simulating");

    let mut pilot = AutoPilot::new(
        world,
        Arc::clone(&input),
        oracle,
        config,
        StdRng::seed_from_u64(opts.seed),
    );

    let mut write_error = None;
    let outcome = run_loop(&mut pilot, Some(opts.cycles), |_report| {
        for command in input.drain() {
            let line = serde_json::to_string(&command).map_err(anyhow::Error::from);
            if let Err(err) = line.and_then(|line| writeln!(out, "{line}").map_err(Into::into)) {
                write_error = Some(err);
                return Flow::Stop;
            }
        }
        Flow::Continue
    })
    .await;
    if let Some(err) = write_error {
        return Err(err.context("write simulated input"));
    }

    let summary = serde_json::to_string(&outcome).context("serialize summary")?;
    writeln!(out, "{summary}").map_err(|err| anyhow!("write summary: {err}"))?;
    Ok(outcome)
}

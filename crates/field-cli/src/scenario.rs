// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Built-in scenarios.
//!
//! Every scenario places `width × height` nodes on a deformed lattice, marks
//! the first node as source and the last one as target (sensors `"source"`
//! and `"target"`), and runs one program on every node every `period` until
//! `until`.

use std::collections::BTreeSet;
use std::fmt;

use anyhow::{ensure, Result};
use clap::ValueEnum;
use field_core::{NodeId, Vm, VmError};
use field_lib::{collect_or, distance_to, elect_leader, neighbors_distances};
use field_sim::{deployment, from_fn, AggregateProgram, Environment, Node, Radius, SimRng, Simulator, Snapshot};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ScenarioConfig;

/// Which program to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Nodes close to the shortest source-target path light up.
    Channel,
    /// Distance from the source.
    Gradient,
    /// Leaders spaced about `area` apart.
    Leader,
}

impl Scenario {
    fn highlight_label(self) -> &'static str {
        match self {
            Self::Channel => "channel nodes",
            Self::Gradient => "reached nodes",
            Self::Leader => "leaders",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Channel => "channel",
            Self::Gradient => "gradient",
            Self::Leader => "leader",
        })
    }
}

/// Summary of one run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    /// Scenario that ran.
    pub scenario: Scenario,
    /// Node count.
    pub nodes: usize,
    /// Rounds executed over all nodes.
    pub rounds: u64,
    /// Final simulation time.
    pub time: f64,
    /// Hex BLAKE3 digest of all node results.
    pub digest: String,
    /// Scenario-specific count (channel members, reached nodes, leaders).
    pub highlighted: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario: {}", self.scenario)?;
        writeln!(f, "nodes: {}", self.nodes)?;
        writeln!(f, "rounds: {}", self.rounds)?;
        writeln!(f, "time: {}", self.time)?;
        writeln!(f, "digest: {}", self.digest)?;
        write!(f, "{}: {}", self.scenario.highlight_label(), self.highlighted)
    }
}

/// Report plus the final frame.
#[derive(Clone, Debug)]
pub struct Outcome {
    /// Summary.
    pub report: Report,
    /// Positions and results at the end of the run.
    pub snapshot: Snapshot,
}

fn flag(vm: &Vm, node: &Node, name: &str) -> Result<bool, VmError> {
    node.sensor_or_default(name).map_err(|source| VmError::Payload {
        path: vm.current_path().cloned().unwrap_or_default(),
        source,
    })
}

fn channel(vm: &mut Vm, node: &Node, width: f64) -> Result<f64, VmError> {
    let distances = neighbors_distances(vm, node.position().into())?;
    let target = flag(vm, node, "target")?;
    let source = flag(vm, node, "source")?;
    let to_target = distance_to(vm, target, &distances)?;
    let on_path = collect_or(vm, to_target, source)?;
    let from_path = distance_to(vm, on_path, &distances)?;
    Ok(if from_path < width { 1.0 } else { 0.0 })
}

fn gradient(vm: &mut Vm, node: &Node) -> Result<f64, VmError> {
    let distances = neighbors_distances(vm, node.position().into())?;
    let source = flag(vm, node, "source")?;
    distance_to(vm, source, &distances)
}

/// Builds the environment shared by every scenario.
fn environment(config: &ScenarioConfig, rng: &mut SimRng) -> Result<Environment> {
    ensure!(
        config.width > 0 && config.height > 0,
        "lattice must have at least one node (got {}x{})",
        config.width,
        config.height
    );
    ensure!(config.period > 0.0, "period must be positive");
    let mut env = Environment::new(Radius::new(config.radius));
    deployment::deformed_lattice(
        &mut env,
        rng,
        config.width,
        config.height,
        config.spacing,
        config.deformation,
    )?;
    let last = NodeId(u64::from(config.width) * u64::from(config.height) - 1);
    for node in env.nodes_mut() {
        let id = node.id();
        node.set_sensor("source", &(id == NodeId(0)))?;
        node.set_sensor("target", &(id == last))?;
    }
    Ok(env)
}

fn drive<P: AggregateProgram>(
    mut sim: Simulator<P>,
    config: &ScenarioConfig,
    highlighted: impl FnOnce(&Simulator<P>) -> Result<usize>,
) -> Result<Outcome> {
    sim.schedule_rounds(config.period)?;
    sim.run_until(config.until)?;
    let report = Report {
        scenario: config.scenario,
        nodes: sim.environment().len(),
        rounds: sim.rounds_executed(),
        time: sim.time(),
        digest: hex::encode(sim.results_digest()?),
        highlighted: highlighted(&sim)?,
    };
    info!(scenario = %report.scenario, digest = %report.digest, "scenario finished");
    Ok(Outcome {
        report,
        snapshot: sim.snapshot()?,
    })
}

/// Runs the configured scenario to its horizon.
pub fn run(config: &ScenarioConfig) -> Result<Outcome> {
    let mut rng = SimRng::new(config.seed);
    let env = environment(config, &mut rng)?;
    match config.scenario {
        Scenario::Channel => {
            let width = config.channel_width;
            let sim = Simulator::new(env, rng, from_fn(move |vm, node| channel(vm, node, width)));
            drive(sim, config, |sim| {
                Ok(sim.results::<f64>()?.values().filter(|v| **v > 0.5).count())
            })
        }
        Scenario::Gradient => {
            let sim = Simulator::new(env, rng, from_fn(gradient));
            drive(sim, config, |sim| {
                Ok(sim.results::<f64>()?.values().filter(|d| d.is_finite()).count())
            })
        }
        Scenario::Leader => {
            let mut draws = rng.fork();
            let area = config.area;
            let program = from_fn(move |vm, node| {
                let distances = neighbors_distances(vm, node.position().into())?;
                elect_leader(vm, draws.inner_mut(), area, &distances)
            });
            let sim = Simulator::new(env, rng, program);
            drive(sim, config, |sim| {
                let leaders: BTreeSet<NodeId> = sim
                    .results::<Option<NodeId>>()?
                    .into_values()
                    .flatten()
                    .collect();
                Ok(leaders.len())
            })
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The Round Driver: event loop, message routing and result bookkeeping.

use std::collections::BTreeMap;

use field_core::{wire, NodeId, Payload, RoundContext, Vm, VmError};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, instrument, trace};

use crate::environment::Environment;
use crate::error::SimError;
use crate::event::{Action, EventQueue, Scheduled};
use crate::node::{Node, Position};
use crate::rng::SimRng;
use crate::snapshot::{NodeFrame, Snapshot};

/// An aggregate program: the same body runs on every node, every round.
pub trait AggregateProgram {
    /// Value a round produces; kept on the node as its latest result.
    type Output: Serialize;

    /// Runs one round for `node`.
    fn run(&mut self, vm: &mut Vm, node: &Node) -> Result<Self::Output, VmError>;
}

/// Program backed by a closure; see [`from_fn`].
#[derive(Clone, Debug)]
pub struct FromFn<F>(F);

/// Wraps a closure as an [`AggregateProgram`].
pub fn from_fn<T, F>(f: F) -> FromFn<F>
where
    T: Serialize,
    F: FnMut(&mut Vm, &Node) -> Result<T, VmError>,
{
    FromFn(f)
}

impl<T, F> AggregateProgram for FromFn<F>
where
    T: Serialize,
    F: FnMut(&mut Vm, &Node) -> Result<T, VmError>,
{
    type Output = T;

    fn run(&mut self, vm: &mut Vm, node: &Node) -> Result<T, VmError> {
        (self.0)(vm, node)
    }
}

/// Discrete-event simulation of one aggregate program over an environment.
#[derive(Debug)]
pub struct Simulator<P> {
    env: Environment,
    queue: EventQueue,
    now: f64,
    rng: SimRng,
    vm: Vm,
    program: P,
    rounds: u64,
}

impl<P: AggregateProgram> Simulator<P> {
    /// Simulator at time zero with nothing scheduled.
    pub fn new(env: Environment, rng: SimRng, program: P) -> Self {
        Self {
            env,
            queue: EventQueue::new(),
            now: 0.0,
            rng,
            vm: Vm::new(),
            program,
            rounds: 0,
        }
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.now
    }

    /// Total rounds executed across all nodes.
    pub fn rounds_executed(&self) -> u64 {
        self.rounds
    }

    /// The nodes.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// The nodes, mutably (sensors, positions, membership).
    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Pending events.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// The simulator's RNG (movement draws from it).
    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    /// Schedules `action` `delay` after the current time.
    ///
    /// The action repeats every [`Action::period`], which must be positive;
    /// otherwise the clock could never move past this instant.
    pub fn schedule(&mut self, delay: f64, action: Action) -> Result<(), SimError> {
        if delay.is_nan() || delay < 0.0 {
            return Err(SimError::InvalidDelay(delay));
        }
        let period = action.period();
        if period.is_nan() || period <= 0.0 {
            return Err(SimError::InvalidPeriod(period));
        }
        self.queue.push(self.now + delay, action);
        Ok(())
    }

    /// Schedules a round for every node now, each repeating every `period`.
    /// Nodes run in ascending id order within one instant.
    pub fn schedule_rounds(&mut self, period: f64) -> Result<(), SimError> {
        let ids: Vec<NodeId> = self.env.ids().collect();
        for node in ids {
            self.schedule(0.0, Action::RunRound { node, period })?;
        }
        Ok(())
    }

    /// Fires every event up to and including time `until`; returns how many
    /// fired. Later events stay queued.
    #[instrument(level = "debug", skip(self), fields(nodes = self.env.len()))]
    pub fn run_until(&mut self, until: f64) -> Result<usize, SimError> {
        let mut fired = 0;
        while let Some(event) = self.queue.pop_until(until) {
            self.fire(event)?;
            fired += 1;
        }
        info!(
            time = self.now,
            fired,
            rounds = self.rounds,
            pending = self.queue.len(),
            "simulation paused"
        );
        Ok(fired)
    }

    /// Fires the next event; `Ok(false)` when nothing is pending.
    pub fn step(&mut self) -> Result<bool, SimError> {
        match self.queue.pop() {
            Some(event) => {
                self.fire(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn fire(&mut self, event: Scheduled) -> Result<(), SimError> {
        self.now = event.time;
        let action = event.action;
        let id = action.node();
        if self.env.node(id).is_err() {
            debug!(node = %id, "dropping event for removed node");
            return Ok(());
        }
        match &action {
            Action::RunRound { .. } => self.run_round(id)?,
            Action::MoveWithVelocity {
                velocity: (vx, vy),
                period,
                ..
            } => {
                let node = self.env.node_mut(id)?;
                let p = node.position();
                node.set_position(Position::new(vx.mul_add(*period, p.x), vy.mul_add(*period, p.y)));
            }
            Action::GaussianStep { mean, stddev, .. } => {
                let x = self.rng.gaussian(mean.x, *stddev);
                let y = self.rng.gaussian(mean.y, *stddev);
                self.env.node_mut(id)?.set_position(Position::new(x, y));
            }
        }
        self.schedule(action.period(), action)
    }

    /// Runs one round on `id` immediately.
    ///
    /// Inbound data is, for each current neighbor `m`, the Export `m` last
    /// addressed to `id`, plus `id`'s own self Export. A failed round leaves
    /// the node exactly as it was.
    pub fn run_round(&mut self, id: NodeId) -> Result<(), SimError> {
        let neighbors = self.env.neighbors_of(id)?;
        let mut context = RoundContext::new(id).with_neighbors(neighbors.iter().copied());
        for from in neighbors.iter().copied().chain([id]) {
            if let Some(export) = self.env.node(from)?.outbound.get(&id) {
                context = context.with_export(from, export.clone());
            }
        }

        let node = self.env.node(id)?;
        let prior = node.state.clone();
        let program = &mut self.program;
        let (value, out) = self
            .vm
            .run_round(context, prior, |vm| program.run(vm, node))
            .map_err(|source| SimError::Round { node: id, source })?;
        let result = Payload::encode(&value)?;

        let node = self.env.node_mut(id)?;
        node.outbound = out.outbound;
        node.state = out.state;
        node.result = Some(result);
        node.rounds += 1;
        self.rounds += 1;
        trace!(node = %id, neighbors = neighbors.len(), round = node.rounds, "round complete");
        Ok(())
    }

    /// Decoded latest result of every node that has completed a round.
    pub fn results<T: DeserializeOwned>(&self) -> Result<BTreeMap<NodeId, T>, SimError> {
        let mut out = BTreeMap::new();
        for node in self.env.nodes() {
            if let Some(value) = node.result_as()? {
                out.insert(node.id(), value);
            }
        }
        Ok(out)
    }

    /// BLAKE3 digest over every node's latest result, in id order.
    ///
    /// Two runs with the same seed, deployment and program produce the same
    /// digest.
    pub fn results_digest(&self) -> Result<wire::Hash32, SimError> {
        let results: BTreeMap<NodeId, Option<&Payload>> =
            self.env.nodes().map(|n| (n.id(), n.result())).collect();
        Ok(blake3::hash(&wire::to_cbor(&results)?).into())
    }

    /// Positions and results of every node at the current time.
    pub fn snapshot(&self) -> Result<Snapshot, SimError> {
        let nodes = self
            .env
            .nodes()
            .map(|n| {
                Ok(NodeFrame {
                    id: n.id(),
                    position: n.position(),
                    rounds: n.rounds(),
                    result: n.result().map(serde_json::to_value).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, SimError>>()?;
        Ok(Snapshot {
            time: self.now,
            nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment;
    use crate::neighborhood::{Full, Radius};

    fn counting() -> impl AggregateProgram<Output = u32> {
        from_fn(|vm: &mut Vm, _: &Node| vm.rep(|_| Ok(1_u32), |_, n| Ok(n + 1)))
    }

    #[test]
    fn rounds_repeat_every_period() {
        let mut env = Environment::new(Full);
        deployment::grid(&mut env, 1, 2, 1.0).unwrap();
        let mut sim = Simulator::new(env, SimRng::new(1), counting());
        sim.schedule_rounds(1.0).unwrap();
        let fired = sim.run_until(2.5).unwrap();
        assert_eq!(fired, 6);
        assert_eq!(sim.rounds_executed(), 6);
        assert_eq!(sim.results::<u32>().unwrap()[&NodeId(1)], 3);
        assert_eq!(sim.queue().len(), 2);
    }

    #[test]
    fn failed_round_keeps_the_node_unchanged() {
        let mut env = Environment::new(Full);
        env.insert(NodeId(0), Position::default()).unwrap();
        let mut fail = false;
        let program = from_fn(move |vm: &mut Vm, _: &Node| {
            let n = vm.rep(|_| Ok(0_u32), |_, n| Ok(n + 1))?;
            if fail {
                return Err(VmError::NoActiveRound);
            }
            fail = true;
            Ok(n)
        });
        let mut sim = Simulator::new(env, SimRng::new(1), program);
        sim.run_round(NodeId(0)).unwrap();
        let before = sim.environment().node(NodeId(0)).unwrap().clone();
        assert!(matches!(sim.run_round(NodeId(0)), Err(SimError::Round { .. })));
        assert_eq!(sim.environment().node(NodeId(0)).unwrap(), &before);
    }

    #[test]
    fn movement_updates_positions() {
        let mut env = Environment::new(Radius::new(1.0));
        env.insert(NodeId(0), Position::default()).unwrap();
        let mut sim = Simulator::new(env, SimRng::new(1), counting());
        sim.schedule(
            0.0,
            Action::MoveWithVelocity {
                node: NodeId(0),
                velocity: (1.0, -0.5),
                period: 0.5,
            },
        )
        .unwrap();
        sim.run_until(1.0).unwrap();
        // Fired at 0.0, 0.5 and 1.0.
        let p = sim.environment().node(NodeId(0)).unwrap().position();
        assert!((p.x - 1.5).abs() < 1e-12);
        assert!((p.y + 0.75).abs() < 1e-12);
    }

    #[test]
    fn removed_nodes_stop_running() {
        let mut env = Environment::new(Full);
        deployment::grid(&mut env, 1, 2, 1.0).unwrap();
        let mut sim = Simulator::new(env, SimRng::new(1), counting());
        sim.schedule_rounds(1.0).unwrap();
        sim.run_until(0.0).unwrap();
        sim.environment_mut().remove(NodeId(1));
        sim.run_until(3.0).unwrap();
        assert_eq!(sim.results::<u32>().unwrap().len(), 1);
        assert_eq!(sim.queue().len(), 1);
    }

    #[test]
    fn non_positive_periods_are_rejected() {
        let mut env = Environment::new(Full);
        deployment::grid(&mut env, 1, 2, 1.0).unwrap();
        let mut sim = Simulator::new(env, SimRng::new(1), counting());
        assert!(matches!(sim.schedule_rounds(0.0), Err(SimError::InvalidPeriod(_))));
        assert!(matches!(
            sim.schedule_rounds(f64::NAN),
            Err(SimError::InvalidPeriod(_))
        ));
        let step = Action::GaussianStep {
            node: NodeId(0),
            mean: Position::default(),
            stddev: 1.0,
            period: -1.0,
        };
        assert!(matches!(sim.schedule(0.0, step), Err(SimError::InvalidPeriod(_))));
        let run = Action::RunRound {
            node: NodeId(0),
            period: 1.0,
        };
        assert!(matches!(sim.schedule(-0.5, run), Err(SimError::InvalidDelay(_))));
        assert!(sim.queue().is_empty());
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! field-sim: a deterministic discrete-event Round Driver.
//!
//! The simulator owns every node's position, sensors, last outbound Exports
//! and persisted state. When a node's round comes up it gathers, for each
//! current neighbor `m`, the Export `m` last addressed to it (plus its own
//! self Export), runs the aggregate program through a [`field_core::Vm`], and
//! stores the result, outbound Exports and surviving state back on the node.
//!
//! ```
//! use field_core::NodeId;
//! use field_sim::{deployment, from_fn, Environment, Radius, SimRng, Simulator};
//!
//! let mut env = Environment::new(Radius::new(1.0));
//! deployment::grid(&mut env, 1, 3, 1.0)?;
//! let program = from_fn(|vm, _node| Ok(vm.nbr(1_u32)?.fold(0, |acc, n| acc + n)));
//! let mut sim = Simulator::new(env, SimRng::new(7), program);
//! sim.schedule_rounds(1.0)?;
//! sim.run_until(3.0)?;
//! let sizes = sim.results::<u32>()?;
//! assert_eq!(sizes[&NodeId(1)], 3);
//! # Ok::<(), field_sim::SimError>(())
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::cast_precision_loss
)]

pub mod deployment;
mod environment;
mod error;
mod event;
mod neighborhood;
mod node;
mod rng;
mod simulator;
mod snapshot;

/// Node container plus the active neighborhood rule.
pub use environment::Environment;
/// Simulator error type.
pub use error::SimError;
/// Scheduled actions and the time-ordered queue.
pub use event::{Action, EventQueue, Scheduled};
/// Neighborhood rules.
pub use neighborhood::{Full, KNearest, Neighborhood, Radius};
/// Simulated devices.
pub use node::{Node, Position};
/// Seeded randomness.
pub use rng::SimRng;
/// The Round Driver itself.
pub use simulator::{from_fn, AggregateProgram, FromFn, Simulator};
/// Serializable frames for inspection.
pub use snapshot::{NodeFrame, Snapshot};

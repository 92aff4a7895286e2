// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! field-lib: building blocks for aggregate programs.
//!
//! Every function takes the node's [`field_core::Vm`] first and wraps its body
//! in [`field_core::Vm::aligned`] under its own name, so two different library
//! calls never align with each other and the same call aligns across nodes.
//!
//! Distances are `f64`; unreachable is `f64::INFINITY`.
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
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod collect;
mod diffusion;
mod leader;
mod utils;

/// Tree-based aggregation towards gradient minima.
pub use collect::{collect_or, collect_with, count_nodes, find_parent, sum_values};
/// Gradients and gradient-cast.
pub use diffusion::{cast_from, distance_to};
/// Leader election.
pub use leader::{breaking_using_uids, distance_competition, elect_leader, random_uid, Uid};
/// Small helpers.
pub use utils::{counter, min_with_default, neighbors_distances};

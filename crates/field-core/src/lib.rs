// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! field-core: execution engine for aggregate (field-calculus) programs.
//!
//! A single program runs on every node of a network, one *round* at a time.
//! Within a round every primitive call happens at a program point addressed
//! by a [`Path`]; values are only ever combined with neighbors that produced
//! something at the *same* Path (they are *aligned*). The engine provides:
//!
//! - the addressing model ([`Slot`], [`Path`]) and the execution stack
//!   ([`VmStatus`]) that derives Paths from nested scope entries,
//! - per-neighbor [`Export`]s (what a node sends) and the alignment query
//!   over inbound Exports,
//! - the round-persistent [`StateStore`] with read-tracked garbage collection,
//! - [`Field`]s and the primitives `rep`, `nbr`, `branch` on [`Vm`].
//!
//! The Round Driver (who delivers messages and persists state) is external:
//! it calls [`Vm::begin_round`] / [`Vm::end_round`] (or [`Vm::run_round`]).
//!
//! ```
//! use field_core::{NodeId, RoundContext, StateSnapshot, Vm, VmError};
//!
//! let mut vm = Vm::new();
//! let mut state = StateSnapshot::default();
//! for expected in 0..3 {
//!     let ctx = RoundContext::new(NodeId(1));
//!     let (count, out) = vm.run_round(ctx, state, |vm| {
//!         vm.rep(|_| Ok(0_u32), |_, n| Ok(n + 1))
//!     })?;
//!     assert_eq!(count, expected);
//!     state = out.state;
//! }
//! # Ok::<(), VmError>(())
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
    clippy::module_name_repetitions
)]

mod calculus;
mod error;
mod export;
mod field;
mod ident;
mod path;
mod payload;
mod round;
mod state;
mod status;
mod vm;
pub mod wire;

/// Primitive scope tags and the typed state handle.
pub use calculus::{StateHandle, BRANCH_TAG_PREFIX, NBR_TAG, REMEMBER_TAG, REP_TAG};
/// Engine error type.
pub use error::VmError;
/// Per-neighbor outbound/inbound data keyed by program point.
pub use export::{Export, PathEntry};
/// Neighbor-indexed values and their combinators.
pub use field::Field;
/// Node identifiers.
pub use ident::NodeId;
/// Program-point addressing.
pub use path::{Path, Slot};
/// Type-erased payload carrier.
pub use payload::{Payload, PayloadError};
/// Round Driver contract types.
pub use round::{RoundContext, RoundOutput};
/// Round-persistent state.
pub use state::{StateSnapshot, StateStore};
/// Execution stack.
pub use status::VmStatus;
/// The engine instance passed to every primitive.
pub use vm::Vm;

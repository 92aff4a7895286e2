// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine errors.

use thiserror::Error;

use crate::ident::NodeId;
use crate::path::Path;
use crate::payload::PayloadError;

/// Errors raised by the engine while running a round.
///
/// Every variant is fatal for the round that raised it: [`crate::Vm::run_round`]
/// discards the round's exports and state changes and the prior state remains
/// with the Round Driver.
#[derive(Debug, Error)]
pub enum VmError {
    /// A primitive was called while no round was open.
    #[error("no active round")]
    NoActiveRound,
    /// `begin_round` was called while another round was still open.
    #[error("round already in progress for node {0}")]
    RoundInProgress(NodeId),
    /// `exit` was called with no open scope; the execution stack is corrupt.
    #[error("exit without matching enter at {path}")]
    UnbalancedExit {
        /// Path at which the stray exit happened.
        path: Path,
    },
    /// The round ended with scopes still open.
    #[error("round ended with {depth} open scope(s) at {path}")]
    UnbalancedScopes {
        /// Number of scopes left open.
        depth: usize,
        /// Innermost open Path.
        path: Path,
    },
    /// A [`crate::StateHandle`] was used after the round that created it.
    #[error("state handle for {path} used outside its round")]
    StaleHandle {
        /// Program point the handle refers to.
        path: Path,
    },
    /// A value could not be encoded, or a stored value did not decode into
    /// the type the program asked for.
    #[error("payload error at {path}: {source}")]
    Payload {
        /// Program point whose value failed to convert.
        path: Path,
        /// Underlying conversion failure.
        #[source]
        source: PayloadError,
    },
}

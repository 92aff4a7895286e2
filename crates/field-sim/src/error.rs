// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Simulator errors.

use field_core::{wire::WireError, NodeId, PayloadError, VmError};
use thiserror::Error;

/// Errors raised while driving a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// An event or query named a node that is not in the environment.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// A node id was registered twice.
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),
    /// No id is left past the highest one in use.
    #[error("node ids exhausted")]
    IdsExhausted,
    /// A repeating action was given a period that is not positive.
    #[error("period must be positive, got {0}")]
    InvalidPeriod(f64),
    /// An event was scheduled in the past.
    #[error("delay must be non-negative, got {0}")]
    InvalidDelay(f64),
    /// The aggregate program failed; the round was discarded.
    #[error("round failed on node {node}: {source}")]
    Round {
        /// Node whose round failed.
        node: NodeId,
        /// Engine error.
        #[source]
        source: VmError,
    },
    /// A sensor or result could not be converted.
    #[error(transparent)]
    Payload(#[from] PayloadError),
    /// Encoding results for the digest failed.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// Snapshot serialization failed.
    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serializable frames of a running simulation.

use field_core::NodeId;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::node::Position;

/// One node at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeFrame {
    /// Node id.
    pub id: NodeId,
    /// Position at the snapshot time.
    pub position: Position,
    /// Rounds completed so far.
    pub rounds: u64,
    /// Latest program result in JSON form; `null` before the first round.
    pub result: Option<serde_json::Value>,
}

/// All nodes at one instant, ascending by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation time.
    pub time: f64,
    /// Per-node frames.
    pub nodes: Vec<NodeFrame>,
}

impl Snapshot {
    /// JSON text, pretty-printed when `pretty` is set.
    pub fn to_json(&self, pretty: bool) -> Result<String, SimError> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }

    /// Parses a snapshot back from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(text)?)
    }
}

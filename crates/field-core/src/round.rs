// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Round Driver contract: what goes into a round and what comes out.

use std::collections::{BTreeMap, BTreeSet};

use crate::export::Export;
use crate::ident::NodeId;
use crate::state::StateSnapshot;

/// Everything a node needs from the outside world for one round.
///
/// `inbound` holds the Export each neighbor addressed to this node in its
/// latest round, plus (under the node's own id) the node's previous
/// self-addressed Export. Exports from ids that are neither a neighbor nor
/// the node itself are kept but never consulted.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundContext {
    node_id: NodeId,
    neighbors: BTreeSet<NodeId>,
    inbound: BTreeMap<NodeId, Export>,
}

impl RoundContext {
    /// Context for `node_id` with no neighbors and no inbound data.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            neighbors: BTreeSet::new(),
            inbound: BTreeMap::new(),
        }
    }

    /// Context whose neighbor set is every sender in `inbound` except the
    /// node itself.
    pub fn from_inbound(node_id: NodeId, inbound: BTreeMap<NodeId, Export>) -> Self {
        let neighbors = inbound.keys().copied().filter(|id| *id != node_id).collect();
        Self {
            node_id,
            neighbors,
            inbound,
        }
    }

    /// Adds neighbor ids; the node's own id is ignored.
    #[must_use]
    pub fn with_neighbors(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        let me = self.node_id;
        self.neighbors.extend(ids.into_iter().filter(|id| *id != me));
        self
    }

    /// Records the Export received from `from`.
    #[must_use]
    pub fn with_export(mut self, from: NodeId, export: Export) -> Self {
        self.inbound.insert(from, export);
        self
    }

    /// Local node id.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Current neighbor ids.
    pub fn neighbors(&self) -> &BTreeSet<NodeId> {
        &self.neighbors
    }

    /// Export received from `from`, if it is a neighbor or the node itself.
    pub fn export_from(&self, from: NodeId) -> Option<&Export> {
        if from == self.node_id || self.neighbors.contains(&from) {
            self.inbound.get(&from)
        } else {
            None
        }
    }

    /// Consulted `(sender, export)` pairs in ascending sender order.
    pub fn exports(&self) -> impl Iterator<Item = (NodeId, &Export)> {
        self.inbound
            .iter()
            .filter(|(id, _)| **id == self.node_id || self.neighbors.contains(*id))
            .map(|(id, e)| (*id, e))
    }
}

/// Result of a completed round, handed back to the Round Driver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoundOutput {
    /// Export addressed to each recipient (including the node itself when
    /// it used `store`).
    pub outbound: BTreeMap<NodeId, Export>,
    /// State that survived the round-end sweep.
    pub state: StateSnapshot,
}

impl RoundOutput {
    /// Export addressed to `to`.
    pub fn export_for(&self, to: NodeId) -> Option<&Export> {
        self.outbound.get(&to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraneous_exports_are_not_consulted() {
        let ctx = RoundContext::new(NodeId(1))
            .with_neighbors([NodeId(2)])
            .with_export(NodeId(2), Export::new())
            .with_export(NodeId(7), Export::new());
        assert!(ctx.export_from(NodeId(2)).is_some());
        assert!(ctx.export_from(NodeId(7)).is_none());
        assert_eq!(ctx.exports().count(), 1);
    }

    #[test]
    fn self_is_never_a_neighbor() {
        let ctx = RoundContext::new(NodeId(1)).with_neighbors([NodeId(1), NodeId(2)]);
        assert_eq!(ctx.neighbors().len(), 1);

        let inbound = BTreeMap::from([(NodeId(1), Export::new()), (NodeId(3), Export::new())]);
        let ctx = RoundContext::from_inbound(NodeId(1), inbound);
        assert_eq!(ctx.neighbors().iter().copied().collect::<Vec<_>>(), [NodeId(3)]);
        assert!(ctx.export_from(NodeId(1)).is_some());
    }
}

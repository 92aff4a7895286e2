// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node container plus the active neighborhood rule.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use field_core::NodeId;
use tracing::debug;

use crate::error::SimError;
use crate::neighborhood::Neighborhood;
use crate::node::{Node, Position};

/// All nodes of a simulation, keyed by id.
pub struct Environment {
    nodes: BTreeMap<NodeId, Node>,
    neighborhood: Box<dyn Neighborhood>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

impl Environment {
    /// Empty environment using `neighborhood`.
    pub fn new(neighborhood: impl Neighborhood + 'static) -> Self {
        Self {
            nodes: BTreeMap::new(),
            neighborhood: Box::new(neighborhood),
        }
    }

    /// Replaces the neighborhood rule.
    pub fn set_neighborhood(&mut self, neighborhood: impl Neighborhood + 'static) {
        self.neighborhood = Box::new(neighborhood);
    }

    /// Adds a node with an explicit id.
    pub fn insert(&mut self, id: NodeId, position: Position) -> Result<&mut Node, SimError> {
        if self.nodes.contains_key(&id) {
            return Err(SimError::DuplicateNode(id));
        }
        debug!(node = %id, x = position.x, y = position.y, "node added");
        Ok(self.nodes.entry(id).or_insert_with(|| Node::new(id, position)))
    }

    /// Adds a node under the next free id (one past the highest in use).
    pub fn spawn(&mut self, position: Position) -> Result<&mut Node, SimError> {
        let id = match self.nodes.keys().next_back() {
            Some(last) => NodeId(last.value().checked_add(1).ok_or(SimError::IdsExhausted)?),
            None => NodeId(0),
        };
        self.insert(id, position)
    }

    /// Removes a node; its neighbors stop hearing it from their next round.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(&id)
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Result<&Node, SimError> {
        self.nodes.get(&id).ok_or(SimError::UnknownNode(id))
    }

    /// Mutable node by id.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SimError> {
        self.nodes.get_mut(&id).ok_or(SimError::UnknownNode(id))
    }

    /// Every node, ascending by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Every node mutably, ascending by id.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when no node exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current neighbors of `id` under the active rule.
    pub fn neighbors_of(&self, id: NodeId) -> Result<BTreeSet<NodeId>, SimError> {
        let node = self.node(id)?;
        let mut ids = self.neighborhood.neighbors(node, &self.nodes);
        ids.remove(&id);
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighborhood::{Full, Radius};

    #[test]
    fn spawn_allocates_past_the_highest_id() {
        let mut env = Environment::new(Full);
        env.insert(NodeId(5), Position::default()).unwrap();
        assert_eq!(env.spawn(Position::default()).unwrap().id(), NodeId(6));
        assert!(matches!(
            env.insert(NodeId(5), Position::default()),
            Err(SimError::DuplicateNode(NodeId(5)))
        ));
    }

    #[test]
    fn neighbors_follow_the_rule() {
        let mut env = Environment::new(Full);
        env.insert(NodeId(0), Position::new(0.0, 0.0)).unwrap();
        env.insert(NodeId(1), Position::new(5.0, 0.0)).unwrap();
        assert_eq!(env.neighbors_of(NodeId(0)).unwrap().len(), 1);
        env.set_neighborhood(Radius::new(1.0));
        assert!(env.neighbors_of(NodeId(0)).unwrap().is_empty());
        assert!(matches!(env.neighbors_of(NodeId(9)), Err(SimError::UnknownNode(_))));
    }

    #[test]
    fn spawn_refuses_to_wrap_around() {
        let mut env = Environment::new(Full);
        env.insert(NodeId(u64::MAX), Position::default()).unwrap();
        assert!(matches!(
            env.spawn(Position::default()),
            Err(SimError::IdsExhausted)
        ));
        assert_eq!(env.len(), 1);
    }
}

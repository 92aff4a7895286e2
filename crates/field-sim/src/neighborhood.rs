// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Neighborhood rules: who a node hears in its next round.
//!
//! A node is never its own neighbor. Rules are re-evaluated every round, so
//! moving nodes pick up and lose neighbors as they go.

use std::collections::{BTreeMap, BTreeSet};

use field_core::NodeId;

use crate::node::Node;

/// Decides the neighbor set of one node given every node in the environment.
pub trait Neighborhood {
    /// Neighbor ids of `node`; must not contain `node.id()`.
    fn neighbors(&self, node: &Node, all: &BTreeMap<NodeId, Node>) -> BTreeSet<NodeId>;
}

/// Every node within `radius` (inclusive).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Radius {
    radius: f64,
}

impl Radius {
    /// Rule with the given communication range.
    pub const fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Communication range.
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Neighborhood for Radius {
    fn neighbors(&self, node: &Node, all: &BTreeMap<NodeId, Node>) -> BTreeSet<NodeId> {
        let here = node.position();
        all.values()
            .filter(|other| other.id() != node.id())
            .filter(|other| here.distance(&other.position()) <= self.radius)
            .map(Node::id)
            .collect()
    }
}

/// The `k` closest nodes; equal distances go to the lower id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KNearest {
    k: usize,
}

impl KNearest {
    /// Rule keeping `k` neighbors.
    pub const fn new(k: usize) -> Self {
        Self { k }
    }
}

impl Neighborhood for KNearest {
    fn neighbors(&self, node: &Node, all: &BTreeMap<NodeId, Node>) -> BTreeSet<NodeId> {
        let here = node.position();
        let mut others: Vec<(f64, NodeId)> = all
            .values()
            .filter(|other| other.id() != node.id())
            .map(|other| (here.distance(&other.position()), other.id()))
            .collect();
        others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        others.into_iter().take(self.k).map(|(_, id)| id).collect()
    }
}

/// Everyone hears everyone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Full;

impl Neighborhood for Full {
    fn neighbors(&self, node: &Node, all: &BTreeMap<NodeId, Node>) -> BTreeSet<NodeId> {
        all.keys().copied().filter(|id| *id != node.id()).collect()
    }
}

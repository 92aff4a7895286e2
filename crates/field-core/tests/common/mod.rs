// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, dead_code)]

//! Minimal synchronous Round Driver shared by the integration tests.

use std::collections::{BTreeMap, BTreeSet};

use field_core::{Export, NodeId, RoundContext, StateSnapshot, Vm, VmError};

/// Nodes on a fixed topology, run one after another in ascending id order.
pub struct Network {
    pub links: BTreeMap<NodeId, BTreeSet<NodeId>>,
    pub outbound: BTreeMap<NodeId, BTreeMap<NodeId, Export>>,
    pub state: BTreeMap<NodeId, StateSnapshot>,
}

impl Network {
    /// Undirected line `0 - 1 - ... - (n-1)`.
    pub fn line(n: u64) -> Self {
        let mut links = BTreeMap::new();
        for i in 0..n {
            let mut near = BTreeSet::new();
            if i > 0 {
                near.insert(NodeId(i - 1));
            }
            if i + 1 < n {
                near.insert(NodeId(i + 1));
            }
            links.insert(NodeId(i), near);
        }
        Self::with_links(links)
    }

    /// Every node linked to every other.
    pub fn complete(n: u64) -> Self {
        let ids: Vec<NodeId> = (0..n).map(NodeId).collect();
        let links = ids
            .iter()
            .map(|id| (*id, ids.iter().copied().filter(|o| o != id).collect()))
            .collect();
        Self::with_links(links)
    }

    pub fn with_links(links: BTreeMap<NodeId, BTreeSet<NodeId>>) -> Self {
        Self {
            links,
            outbound: BTreeMap::new(),
            state: BTreeMap::new(),
        }
    }

    /// Context for `id`: what each neighbor last addressed to it plus its own
    /// self Export.
    pub fn context_for(&self, id: NodeId) -> RoundContext {
        let neighbors = self.links.get(&id).cloned().unwrap_or_default();
        let mut ctx = RoundContext::new(id).with_neighbors(neighbors.iter().copied());
        for from in neighbors.iter().copied().chain([id]) {
            if let Some(export) = self.outbound.get(&from).and_then(|m| m.get(&id)) {
                ctx = ctx.with_export(from, export.clone());
            }
        }
        ctx
    }

    /// Runs one round on every node, returning each node's result.
    pub fn step<T, F>(&mut self, mut program: F) -> Result<BTreeMap<NodeId, T>, VmError>
    where
        F: FnMut(&mut Vm) -> Result<T, VmError>,
    {
        let ids: Vec<NodeId> = self.links.keys().copied().collect();
        let mut results = BTreeMap::new();
        for id in ids {
            let ctx = self.context_for(id);
            let prior = self.state.remove(&id).unwrap_or_default();
            let mut vm = Vm::new();
            let (value, out) = vm.run_round(ctx, prior, &mut program)?;
            self.outbound.insert(id, out.outbound);
            self.state.insert(id, out.state);
            results.insert(id, value);
        }
        Ok(results)
    }
}

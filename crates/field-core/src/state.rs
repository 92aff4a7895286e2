// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Round-persistent state with read-tracked garbage collection.
//!
//! Entries are keyed by the [`Path`] of the `rep`/`remember` that owns them.
//! During a round every entry that is looked up is marked *read*; at round end
//! [`StateStore::sweep`] drops everything that was not. A program point that
//! stops being visited (for example the untaken side of a `branch`) therefore
//! loses its state, and resuming it later starts again from `init`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::export::PathEntry;
use crate::path::Path;
use crate::payload::Payload;

/// Persisted form of a node's state between rounds.
///
/// Owned by the Round Driver while no round is running.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PathEntry>", into = "Vec<PathEntry>")]
pub struct StateSnapshot {
    entries: BTreeMap<Path, Payload>,
}

impl StateSnapshot {
    /// Value stored at `path`.
    pub fn get(&self, path: &Path) -> Option<&Payload> {
        self.entries.get(path)
    }

    /// Paths with surviving state, in canonical order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no state survived.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<PathEntry>> for StateSnapshot {
    fn from(entries: Vec<PathEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.path, e.value)).collect(),
        }
    }
}

impl From<StateSnapshot> for Vec<PathEntry> {
    fn from(snapshot: StateSnapshot) -> Self {
        snapshot
            .entries
            .into_iter()
            .map(|(path, value)| PathEntry { path, value })
            .collect()
    }
}

/// In-round state store.
#[derive(Clone, Debug, Default)]
pub struct StateStore {
    entries: BTreeMap<Path, Payload>,
    reads: BTreeSet<Path>,
}

impl StateStore {
    /// Installs a snapshot with read tracking cleared.
    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            entries: snapshot.entries,
            reads: BTreeSet::new(),
        }
    }

    /// Looks up `path` and marks it read, whether or not it is present.
    pub fn read(&mut self, path: &Path) -> Option<&Payload> {
        self.reads.insert(path.clone());
        self.entries.get(path)
    }

    /// Looks up `path` without touching read tracking.
    pub fn peek(&self, path: &Path) -> Option<&Payload> {
        self.entries.get(path)
    }

    /// Stores `value` at `path` and marks it read.
    pub fn write(&mut self, path: Path, value: Payload) {
        self.reads.insert(path.clone());
        self.entries.insert(path, value);
    }

    /// Removes the entry at `path`.
    pub fn forget(&mut self, path: &Path) -> Option<Payload> {
        self.reads.remove(path);
        self.entries.remove(path)
    }

    /// Returns `true` if `path` was read or written this round.
    pub fn was_read(&self, path: &Path) -> bool {
        self.reads.contains(path)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry not read this round and clears read tracking.
    ///
    /// Returns the number of entries dropped.
    pub fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        let reads = std::mem::take(&mut self.reads);
        self.entries.retain(|path, _| {
            let keep = reads.contains(path);
            if !keep {
                trace!(%path, "dropping unread state");
            }
            keep
        });
        before - self.entries.len()
    }

    /// Ends the store's round: sweeps and hands the survivors back.
    pub fn into_snapshot(mut self) -> StateSnapshot {
        self.sweep();
        StateSnapshot {
            entries: self.entries,
        }
    }
}

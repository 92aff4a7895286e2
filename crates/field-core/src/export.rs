// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Exports: what one node produced at each program point in one round.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::path::Path;
use crate::payload::{Payload, PayloadError};

/// One `(path, value)` pair of an [`Export`] or [`crate::StateSnapshot`].
///
/// This is the unit of the wire and persistence format: the Path is kept
/// structural, so tags containing any character cannot collide.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Program point.
    pub path: Path,
    /// Value produced there.
    pub value: Payload,
}

/// Mapping from [`Path`] to the value a node produced there for one
/// recipient in one round.
///
/// # Invariants
/// - Keys are Paths actually visited by the producing node in that round.
/// - At most one value per Path; a later [`Export::put`] replaces the earlier one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PathEntry>", into = "Vec<PathEntry>")]
pub struct Export {
    map: BTreeMap<Path, Payload>,
}

impl Export {
    /// Creates an empty export.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` at `path`, returning the value it replaced.
    pub fn put(&mut self, path: Path, value: Payload) -> Option<Payload> {
        self.map.insert(path, value)
    }

    /// Encodes and stores a program value at `path`.
    pub fn put_value<T: Serialize + ?Sized>(
        &mut self,
        path: Path,
        value: &T,
    ) -> Result<(), PayloadError> {
        self.map.insert(path, Payload::encode(value)?);
        Ok(())
    }

    /// Value at `path`, if any.
    pub fn get(&self, path: &Path) -> Option<&Payload> {
        self.map.get(path)
    }

    /// Decoded value at `path`, `Ok(None)` if the Path is absent.
    pub fn get_as<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, PayloadError> {
        self.map.get(path).map(Payload::decode).transpose()
    }

    /// Returns `true` if a value was produced at `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.map.contains_key(path)
    }

    /// Value stored at the root Path.
    pub fn root(&self) -> Option<&Payload> {
        self.map.get(&Path::root())
    }

    /// Visited Paths in canonical order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.map.keys()
    }

    /// Entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Payload)> {
        self.map.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing was exported.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// BLAKE3 hash of the canonical CBOR encoding.
    pub fn digest(&self) -> Result<crate::wire::Hash32, crate::wire::WireError> {
        crate::wire::export_digest(self)
    }
}

impl From<Vec<PathEntry>> for Export {
    fn from(entries: Vec<PathEntry>) -> Self {
        entries.into_iter().map(|e| (e.path, e.value)).collect()
    }
}

impl From<Export> for Vec<PathEntry> {
    fn from(export: Export) -> Self {
        export
            .map
            .into_iter()
            .map(|(path, value)| PathEntry { path, value })
            .collect()
    }
}

impl FromIterator<(Path, Payload)> for Export {
    fn from_iter<I: IntoIterator<Item = (Path, Payload)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

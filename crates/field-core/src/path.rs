// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Program-point addressing.
//!
//! A [`Path`] names a program point by the chain of scopes entered to reach
//! it. Each link is a [`Slot`]: the scope's tag plus how many siblings with
//! any tag were entered before it at the same depth. Two nodes are aligned at
//! a point iff they reached it through equal Paths.

use serde::{Deserialize, Serialize};

/// The `index`-th scope entered at one nesting depth, labelled `tag`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Slot {
    tag: String,
    index: u32,
}

impl Slot {
    /// Creates a slot for the `index`-th entry at its depth.
    pub fn new(tag: impl Into<String>, index: u32) -> Self {
        Self {
            tag: tag.into(),
            index,
        }
    }

    /// Scope label.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Occurrence index among siblings at the same depth.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl core::fmt::Display for Slot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.tag, self.index)
    }
}

/// Immutable chain of [`Slot`]s; the empty Path is the root.
///
/// Conceptually a Path is read innermost-first ([`Path::head`] is the most
/// recently entered scope). Slots are held outermost-first so that pushing a
/// child only appends, and so the derived ordering groups every Path directly
/// after its ancestors. The serialized form is the outermost-first sequence.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    slots: Vec<Slot>,
}

impl Path {
    /// The root Path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a Path from slots given innermost-first.
    pub fn from_innermost(slots: impl IntoIterator<Item = Slot>) -> Self {
        let mut slots: Vec<Slot> = slots.into_iter().collect();
        slots.reverse();
        Self { slots }
    }

    /// Returns `true` for the root Path.
    pub fn is_root(&self) -> bool {
        self.slots.is_empty()
    }

    /// Nesting depth (0 for the root).
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Returns a new Path with `slot` as its innermost entry.
    #[must_use]
    pub fn push(&self, slot: Slot) -> Self {
        let mut slots = Vec::with_capacity(self.slots.len() + 1);
        slots.extend_from_slice(&self.slots);
        slots.push(slot);
        Self { slots }
    }

    /// Returns the parent Path (the root is its own parent).
    #[must_use]
    pub fn pop_front(&self) -> Self {
        let keep = self.slots.len().saturating_sub(1);
        Self {
            slots: self.slots[..keep].to_vec(),
        }
    }

    /// Innermost slot, `None` at the root.
    pub fn head(&self) -> Option<&Slot> {
        self.slots.last()
    }

    /// Slots innermost-first.
    pub fn slots(&self) -> impl DoubleEndedIterator<Item = &Slot> + ExactSizeIterator {
        self.slots.iter().rev()
    }

    /// Returns `true` if `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.slots.starts_with(&self.slots)
    }
}

impl core::fmt::Display for Path {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("[")?;
        for (i, slot) in self.slots().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{slot}")?;
        }
        f.write_str("]")
    }
}

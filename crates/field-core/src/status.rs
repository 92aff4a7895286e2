// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Execution stack: derives the current [`Path`] from nested scope entries.

use crate::error::VmError;
use crate::path::{Path, Slot};

/// Current program point plus the saved frames of every enclosing scope.
///
/// # Invariants
/// - `depth()` equals `path().depth()`.
/// - [`VmStatus::exit`] restores exactly the `(path, index)` pair saved by the
///   matching [`VmStatus::enter`], then advances that index by one so the next
///   sibling gets a fresh occurrence number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VmStatus {
    path: Path,
    index: u32,
    frames: Vec<(Path, u32)>,
}

impl VmStatus {
    /// Fresh stack positioned at the root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current program point.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Occurrence index the next [`VmStatus::enter`] at this depth will use.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Opens a scope labelled `tag` and returns the new current Path.
    pub fn enter(&mut self, tag: &str) -> &Path {
        let slot = Slot::new(tag, self.index);
        let child = self.path.push(slot);
        let parent = std::mem::replace(&mut self.path, child);
        self.frames.push((parent, self.index));
        self.index = 0;
        debug_assert_eq!(self.frames.len(), self.path.depth());
        &self.path
    }

    /// Closes the innermost scope.
    ///
    /// Fails with [`VmError::UnbalancedExit`] when no scope is open; the stack
    /// is left untouched in that case.
    pub fn exit(&mut self) -> Result<(), VmError> {
        let Some((path, index)) = self.frames.pop() else {
            return Err(VmError::UnbalancedExit {
                path: self.path.clone(),
            });
        };
        self.path = path;
        self.index = index + 1;
        Ok(())
    }
}

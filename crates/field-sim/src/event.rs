// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Time-ordered event queue.
//!
//! Events fire in ascending time; events scheduled for the same instant fire
//! in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use field_core::NodeId;

use crate::node::Position;

/// Something the simulator does at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Runs one round of the program on `node`, then reschedules itself
    /// `period` later.
    RunRound {
        /// Node to run.
        node: NodeId,
        /// Time between rounds.
        period: f64,
    },
    /// Moves `node` by `velocity * period`, then reschedules itself.
    MoveWithVelocity {
        /// Node to move.
        node: NodeId,
        /// Displacement per unit of time.
        velocity: (f64, f64),
        /// Time between steps.
        period: f64,
    },
    /// Places `node` at a normal sample around `mean`, then reschedules
    /// itself `period` later.
    GaussianStep {
        /// Node to move.
        node: NodeId,
        /// Centre of the distribution.
        mean: Position,
        /// Standard deviation on each axis.
        stddev: f64,
        /// Time between steps.
        period: f64,
    },
}

impl Action {
    /// Node the action applies to.
    pub fn node(&self) -> NodeId {
        match self {
            Self::RunRound { node, .. }
            | Self::MoveWithVelocity { node, .. }
            | Self::GaussianStep { node, .. } => *node,
        }
    }

    /// Delay before the action repeats.
    pub fn period(&self) -> f64 {
        match self {
            Self::RunRound { period, .. }
            | Self::MoveWithVelocity { period, .. }
            | Self::GaussianStep { period, .. } => *period,
        }
    }
}

/// An [`Action`] bound to its firing time.
#[derive(Clone, Debug)]
pub struct Scheduled {
    /// Absolute firing time.
    pub time: f64,
    seq: u64,
    /// What happens.
    pub action: Action,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap pops the earliest event first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending events.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl EventQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `action` at absolute time `time`.
    pub fn push(&mut self, time: f64, action: Action) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { time, seq, action });
    }

    /// Earliest pending event, if any.
    pub fn peek(&self) -> Option<&Scheduled> {
        self.heap.peek()
    }

    /// Removes and returns the earliest pending event.
    pub fn pop(&mut self) -> Option<Scheduled> {
        self.heap.pop()
    }

    /// Removes the earliest event only if it fires at or before `until`.
    pub fn pop_until(&mut self, until: f64) -> Option<Scheduled> {
        if self.peek()?.time <= until {
            self.pop()
        } else {
            None
        }
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drops every pending event.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

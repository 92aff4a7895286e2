// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Leader election by distance-bounded competition.
//!
//! Every node draws a random priority once and starts out leading itself.
//! Each round it adopts the smallest lead announced by any neighbor close
//! enough to it (measured along the gradient from current leaders), gives up
//! when it sits on the boundary of another leader's area, and reclaims its
//! own candidacy when it is too far from any leader. Ties on priority go to
//! the lower node id.

use std::cmp::Ordering;

use field_core::{Field, NodeId, Vm, VmError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diffusion::distance_to;
use crate::utils::min_with_default;

/// Candidate identity: random priority plus node id. Lower wins.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Uid {
    /// Random draw; `f64::INFINITY` means "no candidate".
    pub priority: f64,
    /// Node that drew it.
    pub id: NodeId,
}

impl Uid {
    /// The "no candidate" marker for `id`.
    pub const fn none(id: NodeId) -> Self {
        Self {
            priority: f64::INFINITY,
            id,
        }
    }

    /// Returns `true` unless this is the "no candidate" marker.
    pub fn is_candidate(&self) -> bool {
        self.priority.is_finite()
    }
}

impl PartialEq for Uid {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Uid {}

impl PartialOrd for Uid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Uid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Elects leaders so that every node is within roughly `area` of one;
/// returns the id of this node's leader, `None` while it has none.
pub fn elect_leader<R: Rng>(
    vm: &mut Vm,
    rng: &mut R,
    area: f64,
    distances: &Field<f64>,
) -> Result<Option<NodeId>, VmError> {
    vm.aligned("elect_leader", |vm| {
        let uid = random_uid(vm, rng)?;
        let lead = breaking_using_uids(vm, uid, area, distances)?;
        Ok(lead.is_candidate().then_some(lead.id))
    })
}

/// This node's [`Uid`]; the priority is drawn once and kept while the call
/// site keeps running.
pub fn random_uid<R: Rng>(vm: &mut Vm, rng: &mut R) -> Result<Uid, VmError> {
    vm.aligned("random_uid", |vm| {
        let id = vm.mid()?;
        let priority = vm.remember(|| rng.gen::<f64>())?;
        Ok(Uid {
            priority: *priority.get(),
            id,
        })
    })
}

/// One round of the competition for `uid`; returns the lead now followed.
pub fn breaking_using_uids(
    vm: &mut Vm,
    uid: Uid,
    area: f64,
    distances: &Field<f64>,
) -> Result<Uid, VmError> {
    vm.aligned("breaking_using_uids", |vm| {
        let mut lead = vm.remember(|| uid)?;
        let previous = *lead.get();
        let potential = distance_to(vm, previous == uid, distances)?;
        let next = distance_competition(vm, potential, area, uid, previous, distances)?;
        if next != previous {
            debug!(node = %uid.id, from = %previous.id, to = %next.id, "lead changed");
        }
        Ok(*lead.set(vm, next)?)
    })
}

/// Picks the lead for a node at `current_distance` from its leader.
///
/// Beyond `area` the node stands for itself; between half and the full area
/// it follows nobody; closer in it follows the smallest lead among
/// neighbors within half the area.
pub fn distance_competition(
    vm: &mut Vm,
    current_distance: f64,
    area: f64,
    uid: Uid,
    lead: Uid,
    distances: &Field<f64>,
) -> Result<Uid, VmError> {
    vm.aligned("distance_competition", |vm| {
        let none = Uid::none(uid.id);
        let leads = vm.nbr(lead)?;
        let reach = &vm.nbr(current_distance)? + distances;
        let close = reach.lt_scalar(&(0.5 * area));
        let best = min_with_default(leads.select(&close).into_iter().copied(), none);
        Ok(if current_distance > area {
            uid
        } else if current_distance >= 0.5 * area {
            none
        } else {
            best
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_orders_by_priority_then_id() {
        let a = Uid {
            priority: 0.2,
            id: NodeId(9),
        };
        let b = Uid {
            priority: 0.2,
            id: NodeId(3),
        };
        let c = Uid {
            priority: 0.1,
            id: NodeId(10),
        };
        assert!(c < b && b < a);
        assert!(a < Uid::none(NodeId(0)));
        assert!(!Uid::none(NodeId(0)).is_candidate());
    }
}

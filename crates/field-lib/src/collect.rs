// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Aggregation down a potential field.
//!
//! Each node picks as parent the aligned neighbor with the strictly lowest
//! potential and feeds it its partial result; partial results accumulate
//! towards the potential's minima (typically the sources of a gradient).

use field_core::{NodeId, Vm, VmError};
use serde::{de::DeserializeOwned, Serialize};
use tracing::trace;

/// Aligned node with the lowest potential, if strictly below our own.
pub fn find_parent(vm: &mut Vm, potential: f64) -> Result<Option<NodeId>, VmError> {
    vm.aligned("find_parent", |vm| {
        let potentials = vm.nbr(potential)?;
        Ok(potentials
            .min_by(f64::total_cmp)
            .and_then(|(id, p)| (*p < potential).then_some(id)))
    })
}

/// Folds `local` with the partial results of every child (neighbors whose
/// parent is this node) using `accumulate`.
///
/// Results lag by one round per hop; on a stable network the minima converge
/// to the accumulation over their whole catchment.
pub fn collect_with<T, F>(vm: &mut Vm, potential: f64, local: T, accumulate: F) -> Result<T, VmError>
where
    T: Clone + Serialize + DeserializeOwned,
    F: Fn(T, &T) -> T,
{
    vm.aligned("collect_with", |vm| {
        let me = vm.mid()?;
        let mut collected = vm.remember(|| local.clone())?;
        let partials = vm.nbr(collected.get().clone())?;
        let parent = find_parent(vm, potential)?;
        let parents = vm.nbr(parent)?;
        let children = parents.zip_with(&partials, |p, v| (*p, v.clone()));
        let mut count = 0_usize;
        let next = children
            .iter()
            .filter(|(_, (p, _))| *p == Some(me))
            .fold(local, |acc, (_, (_, v))| {
                count += 1;
                accumulate(acc, v)
            });
        trace!(node = %me, children = count, "collected");
        Ok(collected.set(vm, next)?.clone())
    })
}

/// Number of nodes draining into each minimum of `potential`.
pub fn count_nodes(vm: &mut Vm, potential: f64) -> Result<u64, VmError> {
    vm.aligned("count_nodes", |vm| {
        collect_with(vm, potential, 1_u64, |a, b| a + b)
    })
}

/// Sum of `local` over the nodes draining into each minimum.
pub fn sum_values(vm: &mut Vm, potential: f64, local: f64) -> Result<f64, VmError> {
    vm.aligned("sum_values", |vm| {
        collect_with(vm, potential, local, |a, b| a + b)
    })
}

/// `true` at a node when `local` holds on it or anywhere upstream of it.
pub fn collect_or(vm: &mut Vm, potential: f64, local: bool) -> Result<bool, VmError> {
    vm.aligned("collect_or", |vm| {
        collect_with(vm, potential, local, |a, b| a || *b)
    })
}

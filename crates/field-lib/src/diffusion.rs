// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Gradients and gradient-cast.

use field_core::{Field, Vm, VmError};
use serde::{de::DeserializeOwned, Serialize};

use crate::utils::min_with_default;

/// Self-healing distance to the nearest node where `source` holds.
///
/// `distances` must hold the metric to each aligned neighbor (as produced by
/// [`crate::neighbors_distances`]). Sources read 0; every other node reads the
/// minimum over neighbors of their last estimate plus the hop length, or
/// infinity when no neighbor has an estimate.
pub fn distance_to(vm: &mut Vm, source: bool, distances: &Field<f64>) -> Result<f64, VmError> {
    vm.aligned("distance_to", |vm| {
        let mut gradient = vm.remember(|| f64::INFINITY)?;
        let through = &vm.nbr(*gradient.get())? + distances;
        let next = if source {
            0.0
        } else {
            min_with_default(
                through.without_self().iter().map(|(_, d)| *d),
                f64::INFINITY,
            )
        };
        Ok(*gradient.set(vm, next)?)
    })
}

/// Spreads `data` from sources outwards along the gradient.
///
/// Sources publish `data`; every other node adopts the value held by the
/// aligned node (itself included) with the smallest gradient, the lowest id
/// winning ties.
pub fn cast_from<T>(vm: &mut Vm, source: bool, data: T, distances: &Field<f64>) -> Result<T, VmError>
where
    T: Clone + Serialize + DeserializeOwned,
{
    vm.aligned("cast_from", |vm| {
        let mut area = vm.remember(|| data.clone())?;
        let potential = distance_to(vm, source, distances)?;
        let values = vm.nbr(area.get().clone())?;
        let potentials = vm.nbr(potential)?;
        let nearest = potentials
            .zip_with(&values, |p, v| (*p, v.clone()))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, (_, v))| v.clone());
        let next = match nearest {
            Some(v) if !source => v,
            _ => data,
        };
        Ok(area.set(vm, next)?.clone())
    })
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Small helpers shared by the libraries.

use field_core::{Field, Vm, VmError};

/// Smallest of `default` and every item, by `<`; earlier items win ties.
pub fn min_with_default<T, I>(items: I, default: T) -> T
where
    T: PartialOrd,
    I: IntoIterator<Item = T>,
{
    items
        .into_iter()
        .fold(default, |best, item| if item < best { item } else { best })
}

/// Rounds this node has executed this code path without interruption,
/// starting at 1.
pub fn counter(vm: &mut Vm) -> Result<u64, VmError> {
    vm.aligned("counter", |vm| {
        let mut count = vm.remember(|| 0_u64)?;
        Ok(*count.update_with(vm, |n| n + 1)?)
    })
}

/// Euclidean distance from this node to every aligned neighbor (0 to itself).
pub fn neighbors_distances(vm: &mut Vm, position: (f64, f64)) -> Result<Field<f64>, VmError> {
    vm.aligned("neighbors_distances", |vm| {
        let (x, y) = position;
        Ok(vm.nbr(position)?.map(|&(nx, ny)| (x - nx).hypot(y - ny)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_core::{NodeId, RoundContext, StateSnapshot};

    #[test]
    fn min_with_default_includes_the_default() {
        assert_eq!(min_with_default([3.0, 1.0, 2.0], 5.0), 1.0);
        assert_eq!(min_with_default([3.0, 4.0], 0.5), 0.5);
        assert_eq!(min_with_default(Vec::<f64>::new(), f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn counter_starts_at_one() {
        let mut vm = Vm::new();
        let mut state = StateSnapshot::default();
        let mut seen = Vec::new();
        for _ in 0..3 {
            let (n, out) = vm
                .run_round(RoundContext::new(NodeId(0)), state, counter)
                .unwrap();
            seen.push(n);
            state = out.state;
        }
        assert_eq!(seen, [1, 2, 3]);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let mut vm = Vm::new();
        let (d, _) = vm
            .run_round(RoundContext::new(NodeId(0)), StateSnapshot::default(), |vm| {
                neighbors_distances(vm, (1.0, 2.0))
            })
            .unwrap();
        assert_eq!(d.local(), Some(&0.0));
        assert_eq!(d.len(), 1);
    }
}

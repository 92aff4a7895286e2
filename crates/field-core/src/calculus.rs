// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Field-calculus primitives built on the execution stack.
//!
//! Every primitive runs inside its own scope, so each call site (and each
//! repeated evaluation of one call site) gets a distinct [`Path`]. Closures
//! passed to a primitive run *inside* that scope and may call further
//! primitives.
//!
//! An error returned from inside a scope leaves it open; the round has to be
//! discarded, which [`Vm::run_round`] does.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::VmError;
use crate::field::Field;
use crate::ident::NodeId;
use crate::path::Path;
use crate::payload::Payload;
use crate::vm::Vm;

/// Scope tag of [`Vm::rep`].
pub const REP_TAG: &str = "rep";
/// Scope tag of [`Vm::nbr`].
pub const NBR_TAG: &str = "nbr";
/// Scope tag of [`Vm::remember`].
pub const REMEMBER_TAG: &str = "remember";
/// Prefix of the scope tag entered by [`Vm::branch`] and [`Vm::partition`].
pub const BRANCH_TAG_PREFIX: &str = "branch-";

impl Vm {
    /// Runs `body` inside a scope labelled `tag`.
    ///
    /// This is how library functions give themselves a stable place in the
    /// Path tree.
    pub fn aligned<T, F>(&mut self, tag: &str, body: F) -> Result<T, VmError>
    where
        F: FnOnce(&mut Self) -> Result<T, VmError>,
    {
        self.enter(tag)?;
        let out = body(self)?;
        self.exit()?;
        Ok(out)
    }

    /// Stateful carry-over.
    ///
    /// Returns `init()` the first time this point is reached (or after its
    /// state was swept), otherwise `update(previous)`; the result is stored
    /// for the next round.
    pub fn rep<T, I, U>(&mut self, init: I, update: U) -> Result<T, VmError>
    where
        T: Serialize + DeserializeOwned,
        I: FnOnce(&mut Self) -> Result<T, VmError>,
        U: FnOnce(&mut Self, T) -> Result<T, VmError>,
    {
        self.aligned(REP_TAG, |vm| {
            let path = vm.current_path()?.clone();
            let previous = vm.state_mut()?.read(&path).cloned();
            let next = match previous {
                Some(payload) => {
                    let value = payload.decode().map_err(|source| VmError::Payload {
                        path: path.clone(),
                        source,
                    })?;
                    update(vm, value)?
                }
                None => init(vm)?,
            };
            let encoded = vm.encode_here(&next)?;
            vm.state_mut()?.write(path, encoded);
            Ok(next)
        })
    }

    /// Broadcasts `value` to every neighbor and gathers what aligned
    /// neighbors sent at the same point, plus the local `value`.
    pub fn nbr<T>(&mut self, value: T) -> Result<Field<T>, VmError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.aligned(NBR_TAG, |vm| {
            let payload = vm.encode_here(&value)?;
            let targets: Vec<NodeId> = vm.neighbors()?.iter().copied().collect();
            for target in targets {
                vm.send_payload(target, payload.clone())?;
            }
            let me = vm.mid()?;
            let mut values: BTreeMap<NodeId, T> = vm.received()?;
            values.insert(me, value);
            let aligned = values.keys().copied().collect();
            Ok(Field::new(me, aligned, values))
        })
    }

    /// Domain restriction: runs `then` or `otherwise` inside a scope whose tag
    /// records which side was taken.
    ///
    /// Nodes that took different sides never align with each other inside
    /// the branch, and state kept on the untaken side is dropped at round end.
    pub fn branch<T, Th, El>(&mut self, condition: bool, then: Th, otherwise: El) -> Result<T, VmError>
    where
        Th: FnOnce(&mut Self) -> Result<T, VmError>,
        El: FnOnce(&mut Self) -> Result<T, VmError>,
    {
        let tag = format!("{BRANCH_TAG_PREFIX}{condition}");
        self.aligned(&tag, |vm| if condition { then(vm) } else { otherwise(vm) })
    }

    /// Generalized [`Vm::branch`]: nodes only align inside `body` with nodes
    /// that passed an equal `key`.
    pub fn partition<K, T, F>(&mut self, key: K, body: F) -> Result<T, VmError>
    where
        K: Display,
        F: FnOnce(&mut Self) -> Result<T, VmError>,
    {
        let tag = format!("{BRANCH_TAG_PREFIX}{key}");
        self.aligned(&tag, body)
    }

    /// Persistent local variable.
    ///
    /// Reads the state at this point, initializing it with `init()` when
    /// absent, and returns a handle for further reads and writes.
    pub fn remember<T, I>(&mut self, init: I) -> Result<StateHandle<T>, VmError>
    where
        T: Serialize + DeserializeOwned,
        I: FnOnce() -> T,
    {
        self.aligned(REMEMBER_TAG, |vm| {
            let path = vm.current_path()?.clone();
            let stored = vm.state_mut()?.read(&path).cloned();
            let value = match stored {
                Some(payload) => payload.decode().map_err(|source| VmError::Payload {
                    path: path.clone(),
                    source,
                })?,
                None => {
                    let value = init();
                    let encoded = vm.encode_here(&value)?;
                    vm.state_mut()?.write(path.clone(), encoded);
                    value
                }
            };
            Ok(StateHandle {
                path,
                value,
                epoch: vm.round_epoch()?,
            })
        })
    }
}

/// Typed handle on one [`crate::StateStore`] entry, obtained from
/// [`Vm::remember`].
///
/// The handle caches the current value and writes through to the store of
/// the round it was created in. Writing through it in any other round fails
/// with [`VmError::StaleHandle`].
#[derive(Clone, Debug, PartialEq)]
pub struct StateHandle<T> {
    path: Path,
    value: T,
    epoch: u64,
}

impl<T> StateHandle<T>
where
    T: Serialize,
{
    /// Current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Program point owning the state.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consumes the handle, returning the value.
    pub fn into_inner(self) -> T {
        self.value
    }

    fn check_round(&self, vm: &Vm) -> Result<(), VmError> {
        if vm.round_epoch()? == self.epoch {
            Ok(())
        } else {
            Err(VmError::StaleHandle {
                path: self.path.clone(),
            })
        }
    }

    /// Replaces the stored value.
    pub fn set(&mut self, vm: &mut Vm, value: T) -> Result<&T, VmError> {
        self.check_round(vm)?;
        let encoded = Payload::encode(&value).map_err(|source| VmError::Payload {
            path: self.path.clone(),
            source,
        })?;
        vm.state_mut()?.write(self.path.clone(), encoded);
        self.value = value;
        Ok(&self.value)
    }

    /// Replaces the stored value with `f(current)`.
    pub fn update_with<F>(&mut self, vm: &mut Vm, f: F) -> Result<&T, VmError>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value);
        self.set(vm, next)
    }

    /// Deletes the stored value; the next [`Vm::remember`] at this point
    /// starts again from `init`.
    pub fn forget(self, vm: &mut Vm) -> Result<T, VmError> {
        self.check_round(vm)?;
        vm.state_mut()?.forget(&self.path);
        Ok(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Export;
    use crate::path::Slot;
    use crate::round::RoundContext;
    use crate::state::StateSnapshot;

    #[test]
    fn rep_calls_init_once_then_update() {
        let mut vm = Vm::new();
        let mut state = StateSnapshot::default();
        let mut inits = 0;
        let mut updates = 0;
        for _ in 0..3 {
            let ctx = RoundContext::new(NodeId(1));
            let (_, out) = vm
                .run_round(ctx, state, |vm| {
                    vm.rep(
                        |_| {
                            inits += 1;
                            Ok("initial".to_owned())
                        },
                        |_, _| {
                            updates += 1;
                            Ok("updated".to_owned())
                        },
                    )
                })
                .unwrap();
            state = out.state;
        }
        assert_eq!(inits, 1);
        assert_eq!(updates, 2);
    }

    #[test]
    fn nbr_sends_to_every_neighbor_at_its_own_path() {
        let mut vm = Vm::new();
        let ctx = RoundContext::new(NodeId(1)).with_neighbors([NodeId(2), NodeId(3)]);
        let (_, out) = vm
            .run_round(ctx, StateSnapshot::default(), |vm| vm.nbr(5_u8))
            .unwrap();
        let at = Path::root().push(Slot::new(NBR_TAG, 0));
        for id in [NodeId(2), NodeId(3)] {
            assert_eq!(out.export_for(id).unwrap().get_as::<u8>(&at).unwrap(), Some(5));
        }
        assert!(out.export_for(NodeId(1)).is_none());
    }

    #[test]
    fn branch_tag_records_the_side_taken() {
        let mut vm = Vm::new();
        let ctx = RoundContext::new(NodeId(1)).with_neighbors([NodeId(2)]);
        let (_, out) = vm
            .run_round(ctx, StateSnapshot::default(), |vm| {
                vm.branch(false, |vm| vm.nbr(1_u8), |vm| vm.nbr(2_u8))
            })
            .unwrap();
        let at = Path::from_innermost([Slot::new(NBR_TAG, 0), Slot::new("branch-false", 0)]);
        assert_eq!(out.export_for(NodeId(2)).unwrap().get_as::<u8>(&at).unwrap(), Some(2));
    }

    #[test]
    fn partition_aligns_only_equal_keys() {
        let at = Path::from_innermost([Slot::new(NBR_TAG, 0), Slot::new("branch-blue", 0)]);
        let mut blue = Export::new();
        blue.put_value(at, &20_u8).unwrap();
        let ctx = RoundContext::new(NodeId(1))
            .with_neighbors([NodeId(2)])
            .with_export(NodeId(2), blue);

        let mut vm = Vm::new();
        let (field, _) = vm
            .run_round(ctx.clone(), StateSnapshot::default(), |vm| {
                vm.partition("blue", |vm| vm.nbr(10_u8))
            })
            .unwrap();
        assert_eq!(field.get(NodeId(2)), Some(&20));

        let (field, _) = vm
            .run_round(ctx, StateSnapshot::default(), |vm| {
                vm.partition("red", |vm| vm.nbr(10_u8))
            })
            .unwrap();
        assert_eq!(field.get(NodeId(2)), None);
    }

    #[test]
    fn remember_handle_writes_through() {
        let mut vm = Vm::new();
        let (first, out) = vm
            .run_round(RoundContext::new(NodeId(1)), StateSnapshot::default(), |vm| {
                let mut counter = vm.remember(|| 0_u32)?;
                Ok(*counter.update_with(vm, |n| n + 1)?)
            })
            .unwrap();
        assert_eq!(first, 1);

        let (second, out) = vm
            .run_round(RoundContext::new(NodeId(1)), out.state, |vm| {
                let mut counter = vm.remember(|| 0_u32)?;
                Ok(*counter.update_with(vm, |n| n + 1)?)
            })
            .unwrap();
        assert_eq!(second, 2);

        let (_, out) = vm
            .run_round(RoundContext::new(NodeId(1)), out.state, |vm| {
                let counter = vm.remember(|| 0_u32)?;
                counter.forget(vm)
            })
            .unwrap();
        assert!(out.state.is_empty());
    }

    #[test]
    fn payload_type_mismatch_is_reported() {
        let mut vm = Vm::new();
        let (_, out) = vm
            .run_round(RoundContext::new(NodeId(1)), StateSnapshot::default(), |vm| {
                vm.rep(|_| Ok("text".to_owned()), |_, s| Ok(s))
            })
            .unwrap();
        let err = vm
            .run_round(RoundContext::new(NodeId(1)), out.state, |vm| {
                vm.rep(|_| Ok(0_u32), |_, n| Ok(n))
            })
            .unwrap_err();
        assert!(matches!(err, VmError::Payload { .. }));
    }

    #[test]
    fn handles_do_not_outlive_their_round() {
        let mut vm = Vm::new();
        let (mut kept, out) = vm
            .run_round(RoundContext::new(NodeId(1)), StateSnapshot::default(), |vm| {
                vm.remember(|| 0_u32)
            })
            .unwrap();

        vm.begin_round(RoundContext::new(NodeId(1)), out.state).unwrap();
        assert!(matches!(kept.set(&mut vm, 5), Err(VmError::StaleHandle { .. })));
        assert!(matches!(
            kept.clone().forget(&mut vm),
            Err(VmError::StaleHandle { .. })
        ));
        let out = vm.end_round().unwrap();
        assert_eq!(out.state.len(), 0);

        vm.abort_round();
        assert!(matches!(kept.set(&mut vm, 5), Err(VmError::NoActiveRound)));
    }
}

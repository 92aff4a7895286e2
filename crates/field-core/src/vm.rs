// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The engine instance: round lifecycle, scopes, exports and alignment.

use std::collections::{BTreeMap, BTreeSet};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::VmError;
use crate::export::Export;
use crate::field::Field;
use crate::ident::NodeId;
use crate::path::Path;
use crate::payload::Payload;
use crate::round::{RoundContext, RoundOutput};
use crate::state::{StateSnapshot, StateStore};
use crate::status::VmStatus;

/// State that exists only while a round is open.
#[derive(Debug)]
struct ActiveRound {
    epoch: u64,
    context: RoundContext,
    status: VmStatus,
    outbound: BTreeMap<NodeId, Export>,
    state: StateStore,
}

/// Aggregate-program engine for one node.
///
/// A `Vm` is passed explicitly to every primitive. It holds nothing between
/// rounds: the Round Driver owns inbound Exports and the persisted
/// [`StateSnapshot`] and hands them in through [`Vm::begin_round`]. Several
/// `Vm`s (one per simulated node, or one reused sequentially) never share
/// state.
#[derive(Debug, Default)]
pub struct Vm {
    round: Option<ActiveRound>,
    rounds_started: u64,
    rounds_completed: u64,
}

impl Vm {
    /// Creates an idle engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a round is open.
    pub fn in_round(&self) -> bool {
        self.round.is_some()
    }

    /// Number of rounds this engine has completed successfully.
    pub fn rounds_completed(&self) -> u64 {
        self.rounds_completed
    }

    /// Opens a round: stack at root, state installed from `prior`, read
    /// tracking cleared, no outbound data.
    pub fn begin_round(&mut self, context: RoundContext, prior: StateSnapshot) -> Result<(), VmError> {
        if let Some(active) = &self.round {
            return Err(VmError::RoundInProgress(active.context.node_id()));
        }
        debug!(
            node = %context.node_id(),
            neighbors = context.neighbors().len(),
            state_entries = prior.len(),
            "round started"
        );
        self.rounds_started += 1;
        self.round = Some(ActiveRound {
            epoch: self.rounds_started,
            context,
            status: VmStatus::new(),
            outbound: BTreeMap::new(),
            state: StateStore::from_snapshot(prior),
        });
        Ok(())
    }

    /// Closes the round: sweeps unread state and returns outbound Exports and
    /// surviving state.
    ///
    /// Ending with open scopes fails with [`VmError::UnbalancedScopes`]; the
    /// round is discarded either way.
    pub fn end_round(&mut self) -> Result<RoundOutput, VmError> {
        let active = self.round.take().ok_or(VmError::NoActiveRound)?;
        if active.status.depth() != 0 {
            warn!(node = %active.context.node_id(), depth = active.status.depth(), "round ended inside a scope");
            return Err(VmError::UnbalancedScopes {
                depth: active.status.depth(),
                path: active.status.path().clone(),
            });
        }
        let node = active.context.node_id();
        let before = active.state.len();
        let state = active.state.into_snapshot();
        let dropped = before - state.len();
        self.rounds_completed += 1;
        debug!(
            node = %node,
            recipients = active.outbound.len(),
            state_entries = state.len(),
            dropped,
            "round finished"
        );
        Ok(RoundOutput {
            outbound: active.outbound,
            state,
        })
    }

    /// Discards the open round, if any, without producing output.
    pub fn abort_round(&mut self) {
        if let Some(active) = self.round.take() {
            warn!(node = %active.context.node_id(), "round aborted");
        }
    }

    /// Runs `program` as one complete round.
    ///
    /// On error the round is discarded and `prior` is consumed; the caller
    /// keeps whatever copy of the state it wants to retry from.
    pub fn run_round<T, F>(
        &mut self,
        context: RoundContext,
        prior: StateSnapshot,
        program: F,
    ) -> Result<(T, RoundOutput), VmError>
    where
        F: FnOnce(&mut Self) -> Result<T, VmError>,
    {
        self.begin_round(context, prior)?;
        match program(self) {
            Ok(value) => Ok((value, self.end_round()?)),
            Err(err) => {
                self.abort_round();
                Err(err)
            }
        }
    }

    fn active(&self) -> Result<&ActiveRound, VmError> {
        self.round.as_ref().ok_or(VmError::NoActiveRound)
    }

    fn active_mut(&mut self) -> Result<&mut ActiveRound, VmError> {
        self.round.as_mut().ok_or(VmError::NoActiveRound)
    }

    /// Identifies the open round among every round this engine began,
    /// failed ones included.
    pub(crate) fn round_epoch(&self) -> Result<u64, VmError> {
        Ok(self.active()?.epoch)
    }

    /// Local node id.
    pub fn mid(&self) -> Result<NodeId, VmError> {
        Ok(self.active()?.context.node_id())
    }

    /// Neighbor ids for this round.
    pub fn neighbors(&self) -> Result<&BTreeSet<NodeId>, VmError> {
        Ok(self.active()?.context.neighbors())
    }

    /// Current program point.
    pub fn current_path(&self) -> Result<&Path, VmError> {
        Ok(self.active()?.status.path())
    }

    /// Execution stack of the open round.
    pub fn status(&self) -> Result<&VmStatus, VmError> {
        Ok(&self.active()?.status)
    }

    /// Opens a scope labelled `tag`.
    pub fn enter(&mut self, tag: &str) -> Result<(), VmError> {
        self.active_mut()?.status.enter(tag);
        Ok(())
    }

    /// Closes the innermost scope.
    ///
    /// A stray exit means the stack can no longer be trusted: the round is
    /// discarded and [`VmError::UnbalancedExit`] returned.
    pub fn exit(&mut self) -> Result<(), VmError> {
        let result = self.active_mut()?.status.exit();
        if result.is_err() {
            self.abort_round();
        }
        result
    }

    /// Encodes `value` for the current Path.
    pub(crate) fn encode_here<T: Serialize + ?Sized>(&self, value: &T) -> Result<Payload, VmError> {
        Payload::encode(value).map_err(|source| VmError::Payload {
            path: self.current_path().cloned().unwrap_or_default(),
            source,
        })
    }

    /// Writes an already-encoded value into `target`'s outbound Export at the
    /// current Path.
    pub fn send_payload(&mut self, target: NodeId, value: Payload) -> Result<(), VmError> {
        let active = self.active_mut()?;
        let path = active.status.path().clone();
        active.outbound.entry(target).or_default().put(path, value);
        Ok(())
    }

    /// Writes `value` into `target`'s outbound Export at the current Path.
    pub fn send<T: Serialize + ?Sized>(&mut self, target: NodeId, value: &T) -> Result<(), VmError> {
        let payload = self.encode_here(value)?;
        self.send_payload(target, payload)
    }

    /// Sends `value` to the local node itself (read back next round through
    /// the self Export).
    pub fn store<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), VmError> {
        let me = self.mid()?;
        self.send(me, value)
    }

    /// Raw values received at the current Path, keyed by sender.
    ///
    /// Only senders whose Export holds an entry at exactly this Path appear.
    pub fn received_payloads(&self) -> Result<BTreeMap<NodeId, &Payload>, VmError> {
        let active = self.active()?;
        let path = active.status.path();
        Ok(active
            .context
            .exports()
            .filter_map(|(id, export)| export.get(path).map(|v| (id, v)))
            .collect())
    }

    /// Decoded values received at the current Path, keyed by sender.
    ///
    /// A sender whose value does not decode as `T` is treated as unaligned
    /// here: it is logged and left out, and the round goes on.
    pub fn received<T: DeserializeOwned>(&self) -> Result<BTreeMap<NodeId, T>, VmError> {
        let path = self.current_path()?;
        Ok(self
            .received_payloads()?
            .into_iter()
            .filter_map(|(id, payload)| match payload.decode() {
                Ok(value) => Some((id, value)),
                Err(err) => {
                    warn!(from = %id, %path, error = %err, "dropping undecodable neighbor value");
                    None
                }
            })
            .collect())
    }

    /// Ids aligned at the current Path.
    ///
    /// At the root the local id is always included: the root is visited by
    /// every node even though nothing is exported there yet.
    pub fn aligned_neighbor_ids(&self) -> Result<BTreeSet<NodeId>, VmError> {
        let mut ids: BTreeSet<NodeId> = self.received_payloads()?.into_keys().collect();
        if self.current_path()?.is_root() {
            ids.insert(self.mid()?);
        }
        Ok(ids)
    }

    /// Wraps caller-supplied values into a [`Field`] aligned as the current
    /// Path is.
    pub fn field<T>(&self, values: BTreeMap<NodeId, T>) -> Result<Field<T>, VmError> {
        Ok(Field::new(self.mid()?, self.aligned_neighbor_ids()?, values))
    }

    pub(crate) fn state_mut(&mut self) -> Result<&mut StateStore, VmError> {
        Ok(&mut self.active_mut()?.state)
    }

    /// State store of the open round.
    pub fn state(&self) -> Result<&StateStore, VmError> {
        Ok(&self.active()?.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Slot;

    fn ctx_with(exports: &[(u64, Export)]) -> RoundContext {
        let mut ctx = RoundContext::new(NodeId(1));
        for (id, export) in exports {
            ctx = ctx
                .with_neighbors([NodeId(*id)])
                .with_export(NodeId(*id), export.clone());
        }
        ctx
    }

    #[test]
    fn primitives_outside_a_round_are_rejected() {
        let mut vm = Vm::new();
        assert!(matches!(vm.enter("x"), Err(VmError::NoActiveRound)));
        assert!(matches!(vm.mid(), Err(VmError::NoActiveRound)));
        assert!(matches!(vm.end_round(), Err(VmError::NoActiveRound)));
    }

    #[test]
    fn begin_twice_is_rejected() {
        let mut vm = Vm::new();
        vm.begin_round(RoundContext::new(NodeId(1)), StateSnapshot::default())
            .unwrap();
        let err = vm
            .begin_round(RoundContext::new(NodeId(1)), StateSnapshot::default())
            .unwrap_err();
        assert!(matches!(err, VmError::RoundInProgress(NodeId(1))));
    }

    #[test]
    fn send_and_store_write_at_current_path() {
        let mut vm = Vm::new();
        vm.begin_round(RoundContext::new(NodeId(1)), StateSnapshot::default())
            .unwrap();
        vm.enter("tag").unwrap();
        vm.send(NodeId(2), "hello").unwrap();
        vm.store("local").unwrap();
        vm.exit().unwrap();
        let out = vm.end_round().unwrap();

        let at = Path::root().push(Slot::new("tag", 0));
        let to_two: Option<String> = out.export_for(NodeId(2)).unwrap().get_as(&at).unwrap();
        let to_me: Option<String> = out.export_for(NodeId(1)).unwrap().get_as(&at).unwrap();
        assert_eq!(to_two.as_deref(), Some("hello"));
        assert_eq!(to_me.as_deref(), Some("local"));
    }

    #[test]
    fn received_filters_by_exact_path() {
        let here = Path::root();
        let deeper = here.push(Slot::new("foo", 0));
        let mut e2 = Export::new();
        e2.put_value(here.clone(), &2_u8).unwrap();
        let mut e3 = Export::new();
        e3.put_value(deeper, &3_u8).unwrap();

        let mut vm = Vm::new();
        vm.begin_round(ctx_with(&[(2, e2), (3, e3)]), StateSnapshot::default())
            .unwrap();
        let got: BTreeMap<NodeId, u8> = vm.received().unwrap();
        assert_eq!(got, BTreeMap::from([(NodeId(2), 2)]));
    }

    #[test]
    fn root_alignment_always_includes_self() {
        let mut vm = Vm::new();
        vm.begin_round(ctx_with(&[(2, Export::new())]), StateSnapshot::default())
            .unwrap();
        assert_eq!(
            vm.aligned_neighbor_ids().unwrap(),
            BTreeSet::from([NodeId(1)])
        );
        vm.enter("inner").unwrap();
        assert!(vm.aligned_neighbor_ids().unwrap().is_empty());
    }

    #[test]
    fn stray_exit_aborts_the_round() {
        let mut vm = Vm::new();
        vm.begin_round(RoundContext::new(NodeId(1)), StateSnapshot::default())
            .unwrap();
        assert!(matches!(vm.exit(), Err(VmError::UnbalancedExit { .. })));
        assert!(!vm.in_round());
    }

    #[test]
    fn ending_inside_a_scope_is_rejected() {
        let mut vm = Vm::new();
        vm.begin_round(RoundContext::new(NodeId(1)), StateSnapshot::default())
            .unwrap();
        vm.enter("open").unwrap();
        let err = vm.end_round().unwrap_err();
        assert!(matches!(err, VmError::UnbalancedScopes { depth: 1, .. }));
        assert!(!vm.in_round());
    }

    #[test]
    fn failed_program_discards_the_round() {
        let mut vm = Vm::new();
        let result: Result<((), RoundOutput), VmError> = vm.run_round(
            RoundContext::new(NodeId(1)),
            StateSnapshot::default(),
            |vm| {
                vm.store(&1_u8)?;
                Err(VmError::NoActiveRound)
            },
        );
        assert!(result.is_err());
        assert!(!vm.in_round());
        assert_eq!(vm.rounds_completed(), 0);
    }

    #[test]
    fn undecodable_neighbor_values_are_left_out() {
        let at = Path::root().push(Slot::new(crate::calculus::NBR_TAG, 0));
        let mut good = Export::new();
        good.put_value(at.clone(), &20_i32).unwrap();
        let mut bad = Export::new();
        bad.put_value(at, "garbage").unwrap();

        let mut vm = Vm::new();
        let (field, _) = vm
            .run_round(ctx_with(&[(2, good), (3, bad)]), StateSnapshot::default(), |vm| {
                vm.nbr(10_i32)
            })
            .unwrap();
        assert_eq!(
            field.into_aligned(),
            BTreeMap::from([(NodeId(1), 10), (NodeId(2), 20)])
        );
    }
}

//! Delegation lifecycle tracking.
//!
//! Once a wrapped transaction is submitted and its delegation stored, the
//! question becomes: did the transaction actually exercise the delegation?
//! A [`LifecycleCoordinator`] watches that transaction's status events and,
//! on a terminal outcome, decides the stored entry's fate: confirmed means
//! the entry is deleted (and, when rotating, replaced), anything else
//! terminal means it is voided.
//!
//! The state machine itself ([`LifecycleState`]) is pure and synchronous so
//! it can be unit-tested without an event bus; [`track_delegation_lifecycle`]
//! is the side-effecting driver that owns the subscription handle.

use crate::delegation::DelegationEntry;
use crate::error::Result;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Status of a tracked transaction, as reported by the wallet's transaction
/// controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionStatus {
    Unapproved,
    Approved,
    Signed,
    Submitted,
    Confirmed,
    Dropped,
    Failed,
    Rejected,
}

/// Type of a tracked transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    ContractInteraction,
    Retry,
    Cancel,
    SimpleSend,
    /// Any type this coordinator has no transition for.
    #[serde(other)]
    Other,
}

/// Call parameters of a pending transaction: the fields the assembler wraps
/// into an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
}

/// A tracked transaction as delivered by the status event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    /// Id of the transaction that replaced this one, when dropped in favor
    /// of a speed-up or resubmission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by_id: Option<String>,
    #[serde(default)]
    pub tx_params: TxParams,
}

/// Terminal decision about the tracked delegation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The transaction confirmed: retire the entry (and persist the
    /// replacement when rotating).
    Delete,
    /// The transaction will never land: discard the tracking without
    /// touching the store.
    Void,
}

/// The pure per-delegation state machine: which transaction id is being
/// followed, and whether a terminal decision has been made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleState {
    tracked_id: String,
    done: bool,
}

impl LifecycleState {
    /// Start tracking a transaction id.
    pub fn new(tracked_id: impl Into<String>) -> Self {
        Self {
            tracked_id: tracked_id.into(),
            done: false,
        }
    }

    /// The transaction id currently being followed. Moves to the replacement
    /// id when the original is dropped in favor of one.
    pub fn tracked_id(&self) -> &str {
        &self.tracked_id
    }

    /// True once a terminal decision has been made; `observe` is inert from
    /// then on.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one status event through the transition function.
    ///
    /// Events for other transaction ids are ignored. A drop that names a
    /// replacement retargets the machine at the replacement and stays
    /// pending — the event source is trusted to deliver replacement before
    /// confirmation for a given id chain. Everything else either decides,
    /// or stays pending.
    pub fn observe(&mut self, meta: &TransactionMeta) -> Option<Disposition> {
        if self.done || meta.id != self.tracked_id {
            return None;
        }

        if meta.status == TransactionStatus::Dropped {
            if let Some(replacement) = &meta.replaced_by_id {
                debug!(
                    from = %self.tracked_id,
                    to = %replacement,
                    "tracked transaction replaced, following replacement"
                );
                self.tracked_id = replacement.clone();
                return None;
            }
        }

        let decision = match meta.transaction_type {
            TransactionType::ContractInteraction | TransactionType::Retry => match meta.status {
                TransactionStatus::Confirmed => Some(Disposition::Delete),
                TransactionStatus::Dropped
                | TransactionStatus::Failed
                | TransactionStatus::Rejected => Some(Disposition::Void),
                _ => None,
            },
            TransactionType::Cancel => Some(Disposition::Void),
            other => {
                warn!(
                    id = %meta.id,
                    transaction_type = ?other,
                    "unexpected transaction type for a tracked delegation"
                );
                None
            }
        };

        if decision.is_some() {
            self.done = true;
        }
        decision
    }
}

/// The external delegation store: persistence and lookup of
/// [`DelegationEntry`] records, keyed by delegation hash. The store
/// serializes its own writes.
///
/// The lifecycle coordinator only ever calls [`store`](Self::store) and
/// [`delete`](Self::delete); the read side exists for the surrounding
/// submission flow.
pub trait DelegationStore {
    fn store(&self, entry: DelegationEntry) -> Result<()>;
    fn delete(&self, hash: B256) -> Result<()>;
    fn retrieve(&self, hash: B256) -> Option<DelegationEntry>;
    fn chain(&self, hash: B256) -> Option<Vec<crate::delegation::Delegation>>;
    fn list(&self) -> Vec<DelegationEntry>;
}

impl<S: DelegationStore + ?Sized> DelegationStore for std::sync::Arc<S> {
    fn store(&self, entry: DelegationEntry) -> Result<()> {
        (**self).store(entry)
    }
    fn delete(&self, hash: B256) -> Result<()> {
        (**self).delete(hash)
    }
    fn retrieve(&self, hash: B256) -> Option<DelegationEntry> {
        (**self).retrieve(hash)
    }
    fn chain(&self, hash: B256) -> Option<Vec<crate::delegation::Delegation>> {
        (**self).chain(hash)
    }
    fn list(&self) -> Vec<DelegationEntry> {
        (**self).list()
    }
}

/// Handle to a live status-event subscription. [`track_delegation_lifecycle`]
/// calls [`unsubscribe`](Self::unsubscribe) exactly once when the machine
/// reaches a terminal state, and never otherwise.
pub trait StatusSubscription {
    fn unsubscribe(&mut self);
}

/// One delegation's lifecycle: the state machine plus the effects its
/// terminal decision triggers against the store.
///
/// A coordinator only ever mutates the one `hash` it was built with. Across
/// its lifetime it calls `delete` at most once and `store` at most once
/// (only paired with `delete`, when an entry to rotate in was supplied).
#[derive(Debug)]
pub struct LifecycleCoordinator<S: DelegationStore> {
    hash: B256,
    state: LifecycleState,
    entry_to_store: Option<DelegationEntry>,
    store: S,
}

impl<S: DelegationStore> LifecycleCoordinator<S> {
    /// Track `transaction`'s fate for the delegation stored under `hash`.
    ///
    /// Supplying `entry_to_store` turns deletion into rotation: retire the
    /// old entry and immediately persist the new one.
    pub fn new(
        hash: B256,
        transaction: &TransactionMeta,
        entry_to_store: Option<DelegationEntry>,
        store: S,
    ) -> Self {
        Self {
            hash,
            state: LifecycleState::new(transaction.id.clone()),
            entry_to_store,
            store,
        }
    }

    /// True once a terminal decision has been made (even if its store
    /// effects failed).
    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// Apply one status event; on a terminal decision, perform the store
    /// effects.
    ///
    /// Store failures are not caught or retried here: the machine is already
    /// done, and the error propagates to whoever owns the subscription. The
    /// worst case is a stale entry that some other path prunes later.
    pub fn handle_event(&mut self, meta: &TransactionMeta) -> Result<Option<Disposition>> {
        let Some(decision) = self.state.observe(meta) else {
            return Ok(None);
        };

        match decision {
            Disposition::Delete => {
                debug!(hash = %self.hash, "tracked transaction confirmed, retiring delegation entry");
                self.store.delete(self.hash)?;
                if let Some(entry) = self.entry_to_store.take() {
                    self.store.store(entry)?;
                }
            }
            Disposition::Void => {
                debug!(hash = %self.hash, "tracked transaction will not land, voiding");
            }
        }
        Ok(Some(decision))
    }
}

/// Drive a delegation's lifecycle to completion.
///
/// Owns the event feed and the subscription handle: events are applied in
/// arrival order (never concurrently for one coordinator), and on reaching a
/// terminal state the subscription is released exactly once — the only exit
/// from pending. Returns the terminal disposition, or `Ok(None)` if the
/// event feed closed without one (in which case nothing was unsubscribed or
/// mutated; a caller wanting a timeout must wrap this future itself).
pub async fn track_delegation_lifecycle<S, U>(
    mut coordinator: LifecycleCoordinator<S>,
    mut events: mpsc::Receiver<TransactionMeta>,
    mut subscription: U,
) -> Result<Option<Disposition>>
where
    S: DelegationStore,
    U: StatusSubscription,
{
    while let Some(meta) = events.recv().await {
        let outcome = coordinator.handle_event(&meta);
        if coordinator.is_done() {
            subscription.unsubscribe();
            return outcome;
        }
        outcome?;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(
        id: &str,
        transaction_type: TransactionType,
        status: TransactionStatus,
    ) -> TransactionMeta {
        TransactionMeta {
            id: id.into(),
            transaction_type,
            status,
            replaced_by_id: None,
            tx_params: TxParams::default(),
        }
    }

    #[test]
    fn unrelated_ids_are_ignored() {
        let mut state = LifecycleState::new("7");
        let decision = state.observe(&meta(
            "9",
            TransactionType::ContractInteraction,
            TransactionStatus::Confirmed,
        ));
        assert_eq!(decision, None);
        assert!(!state.is_done());
        assert_eq!(state.tracked_id(), "7");
    }

    #[test]
    fn confirmation_decides_delete() {
        let mut state = LifecycleState::new("7");
        assert_eq!(
            state.observe(&meta(
                "7",
                TransactionType::ContractInteraction,
                TransactionStatus::Submitted,
            )),
            None
        );
        assert_eq!(
            state.observe(&meta(
                "7",
                TransactionType::ContractInteraction,
                TransactionStatus::Confirmed,
            )),
            Some(Disposition::Delete)
        );
        assert!(state.is_done());
    }

    #[test]
    fn drop_with_replacement_retargets_and_stays_pending() {
        let mut state = LifecycleState::new("7");
        let mut dropped = meta(
            "7",
            TransactionType::ContractInteraction,
            TransactionStatus::Dropped,
        );
        dropped.replaced_by_id = Some("9".into());

        assert_eq!(state.observe(&dropped), None);
        assert!(!state.is_done());
        assert_eq!(state.tracked_id(), "9");

        assert_eq!(
            state.observe(&meta(
                "9",
                TransactionType::Retry,
                TransactionStatus::Confirmed,
            )),
            Some(Disposition::Delete)
        );
    }

    #[test]
    fn drop_without_replacement_voids() {
        let mut state = LifecycleState::new("7");
        assert_eq!(
            state.observe(&meta(
                "7",
                TransactionType::ContractInteraction,
                TransactionStatus::Dropped,
            )),
            Some(Disposition::Void)
        );
    }

    #[test]
    fn failed_and_rejected_void() {
        for status in [TransactionStatus::Failed, TransactionStatus::Rejected] {
            let mut state = LifecycleState::new("7");
            assert_eq!(
                state.observe(&meta("7", TransactionType::Retry, status)),
                Some(Disposition::Void)
            );
        }
    }

    #[test]
    fn cancel_voids_regardless_of_status() {
        for status in [
            TransactionStatus::Submitted,
            TransactionStatus::Confirmed,
            TransactionStatus::Failed,
        ] {
            let mut state = LifecycleState::new("7");
            assert_eq!(
                state.observe(&meta("7", TransactionType::Cancel, status)),
                Some(Disposition::Void)
            );
        }
    }

    #[test]
    fn unexpected_type_stays_pending() {
        let mut state = LifecycleState::new("7");
        assert_eq!(
            state.observe(&meta(
                "7",
                TransactionType::SimpleSend,
                TransactionStatus::Confirmed,
            )),
            None
        );
        assert!(!state.is_done());
    }

    #[test]
    fn observe_is_inert_after_a_decision() {
        let mut state = LifecycleState::new("7");
        state.observe(&meta(
            "7",
            TransactionType::Cancel,
            TransactionStatus::Submitted,
        ));
        assert!(state.is_done());
        assert_eq!(
            state.observe(&meta(
                "7",
                TransactionType::ContractInteraction,
                TransactionStatus::Confirmed,
            )),
            None
        );
    }
}

//! In-process round-store backend.
//!
//! Every mutation runs under a single document-table lock, which gives the
//! strict per-key write ordering the arbitration logic depends on: the order
//! in which `transact` calls acquire the lock *is* the store arrival order.
//! Change notifications are sent while the lock is held so watchers observe
//! values in write order too.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::watch;

use super::{RoundStore, StoreKey, StoreResult, TransactFn, TransactOutcome, apply_patch};

/// One document slot: its value plus the watch channel feeding subscribers.
///
/// The channel is created on first touch (write or subscribe) and lives for
/// the rest of the session; rounds produce few distinct keys.
struct DocumentSlot {
    value: Option<Value>,
    watch_tx: watch::Sender<Option<Value>>,
}

impl DocumentSlot {
    fn empty() -> Self {
        let (watch_tx, _) = watch::channel(None);
        Self {
            value: None,
            watch_tx,
        }
    }
}

/// Memory-backed [`RoundStore`] used for hosting and for tests.
#[derive(Clone)]
pub struct MemoryStore {
    slots: Arc<Mutex<BTreeMap<StoreKey, DocumentSlot>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    fn lock(slots: &Mutex<BTreeMap<StoreKey, DocumentSlot>>) -> MutexGuard<'_, BTreeMap<StoreKey, DocumentSlot>> {
        // A poisoned lock only means another writer panicked mid-mutation;
        // the table itself is still a consistent map of JSON values.
        slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(
        slots: &mut BTreeMap<StoreKey, DocumentSlot>,
        key: &StoreKey,
        value: Option<Value>,
    ) {
        let slot = slots.entry(key.clone()).or_insert_with(DocumentSlot::empty);
        slot.value = value.clone();
        let _ = slot.watch_tx.send(value);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> BoxFuture<'static, StoreResult<Option<Value>>> {
        let slots = Arc::clone(&self.slots);
        let key = key.clone();
        async move {
            let guard = Self::lock(&slots);
            Ok(guard.get(&key).and_then(|slot| slot.value.clone()))
        }
        .boxed()
    }

    fn set(&self, key: &StoreKey, value: Value) -> BoxFuture<'static, StoreResult<()>> {
        let slots = Arc::clone(&self.slots);
        let key = key.clone();
        async move {
            let mut guard = Self::lock(&slots);
            Self::write(&mut guard, &key, Some(value));
            Ok(())
        }
        .boxed()
    }

    fn update(&self, key: &StoreKey, patch: Value) -> BoxFuture<'static, StoreResult<()>> {
        let slots = Arc::clone(&self.slots);
        let key = key.clone();
        async move {
            let mut guard = Self::lock(&slots);
            let current = guard.get(&key).and_then(|slot| slot.value.clone());
            let merged = apply_patch(current, patch);
            Self::write(&mut guard, &key, Some(merged));
            Ok(())
        }
        .boxed()
    }

    fn remove(&self, key: &StoreKey) -> BoxFuture<'static, StoreResult<()>> {
        let slots = Arc::clone(&self.slots);
        let key = key.clone();
        async move {
            let mut guard = Self::lock(&slots);
            if guard.contains_key(&key) {
                Self::write(&mut guard, &key, None);
            }
            Ok(())
        }
        .boxed()
    }

    fn transact(
        &self,
        key: &StoreKey,
        apply: TransactFn,
    ) -> BoxFuture<'static, StoreResult<TransactOutcome>> {
        let slots = Arc::clone(&self.slots);
        let key = key.clone();
        async move {
            let mut guard = Self::lock(&slots);
            let before = guard.get(&key).and_then(|slot| slot.value.clone());
            let after = apply(before.clone())?;
            Self::write(&mut guard, &key, Some(after.clone()));
            Ok(TransactOutcome { before, after })
        }
        .boxed()
    }

    fn subscribe(
        &self,
        key: &StoreKey,
    ) -> BoxFuture<'static, StoreResult<watch::Receiver<Option<Value>>>> {
        let slots = Arc::clone(&self.slots);
        let key = key.clone();
        async move {
            let mut guard = Self::lock(&slots);
            let slot = guard.entry(key).or_insert_with(DocumentSlot::empty);
            Ok(slot.watch_tx.subscribe())
        }
        .boxed()
    }

    fn list_prefix(
        &self,
        prefix: &StoreKey,
    ) -> BoxFuture<'static, StoreResult<Vec<(StoreKey, Value)>>> {
        let slots = Arc::clone(&self.slots);
        let prefix = prefix.clone();
        async move {
            let guard = Self::lock(&slots);
            Ok(guard
                .iter()
                .filter(|(key, _)| key.is_under(&prefix))
                .filter_map(|(key, slot)| {
                    slot.value.clone().map(|value| (key.clone(), value))
                })
                .collect())
        }
        .boxed()
    }
}

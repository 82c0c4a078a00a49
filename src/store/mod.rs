//! Abstraction over the shared round store every client coordinates through.
//!
//! The store is a key-addressed document tree supporting plain reads/writes,
//! merge updates, change subscriptions, and per-key atomic transactions. The
//! engine only ever relies on the contract below; the concrete backend is an
//! in-process [`memory::MemoryStore`].

pub mod error;
pub mod keys;
pub mod memory;

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::watch;

pub use self::error::{StoreError, StoreResult};
pub use self::keys::StoreKey;

/// Closure applied atomically to a document inside [`RoundStore::transact`].
///
/// Receives the current value (absent when the document does not exist) and
/// returns the value to store. Returning an error aborts the transaction
/// without touching the document.
pub type TransactFn = Box<dyn FnOnce(Option<Value>) -> StoreResult<Value> + Send>;

/// Result of a transaction, exposing the value seen before it ran.
#[derive(Debug, Clone)]
pub struct TransactOutcome {
    /// Document value before the transaction, absent when it did not exist.
    pub before: Option<Value>,
    /// Document value after the transaction committed.
    pub after: Value,
}

impl TransactOutcome {
    /// Whether the transaction created the document.
    ///
    /// For create-if-absent writes this is the authoritative "did I win the
    /// race" signal: losers observe the earlier writer's value in `after`.
    pub fn created(&self) -> bool {
        self.before.is_none()
    }
}

/// Contract of the shared round store consumed by the round engine.
///
/// The store guarantees strict ordering of writes to the same key; nothing is
/// assumed across keys. Subscriptions deliver the latest value per key and
/// detach when the receiver is dropped.
pub trait RoundStore: Send + Sync {
    /// Read a single document.
    fn get(&self, key: &StoreKey) -> BoxFuture<'static, StoreResult<Option<Value>>>;
    /// Replace a document wholesale, creating it when absent.
    fn set(&self, key: &StoreKey, value: Value) -> BoxFuture<'static, StoreResult<()>>;
    /// Merge `patch` into a document field by field; `null` fields remove the
    /// target key. Creates the document when absent.
    fn update(&self, key: &StoreKey, patch: Value) -> BoxFuture<'static, StoreResult<()>>;
    /// Delete a document; deleting an absent document is a no-op.
    fn remove(&self, key: &StoreKey) -> BoxFuture<'static, StoreResult<()>>;
    /// Apply `apply` atomically relative to other transactions on `key`.
    fn transact(
        &self,
        key: &StoreKey,
        apply: TransactFn,
    ) -> BoxFuture<'static, StoreResult<TransactOutcome>>;
    /// Watch a document for changes; the receiver is seeded with the current
    /// value and dropping it detaches the watcher.
    fn subscribe(
        &self,
        key: &StoreKey,
    ) -> BoxFuture<'static, StoreResult<watch::Receiver<Option<Value>>>>;
    /// List every document strictly below `prefix`, ordered by key.
    fn list_prefix(
        &self,
        prefix: &StoreKey,
    ) -> BoxFuture<'static, StoreResult<Vec<(StoreKey, Value)>>>;
}

/// Conditionally create a document, adopting the existing value when present.
///
/// This is the single primitive both buzz writes build on: only the first
/// caller across all clients observes `created() == true`, and "first" is
/// defined by write arrival order at the store, never by compared timestamps.
pub async fn create_if_absent(
    store: &dyn RoundStore,
    key: &StoreKey,
    candidate: Value,
) -> StoreResult<TransactOutcome> {
    store
        .transact(key, Box::new(move |current| Ok(current.unwrap_or(candidate))))
        .await
}

/// Merge semantics used by [`RoundStore::update`].
///
/// Non-object patches replace the document. Object patches are merged one
/// level deep into the current object (or an empty one when the document is
/// absent or not an object); `null` patch fields remove the target field.
pub fn apply_patch(current: Option<Value>, patch: Value) -> Value {
    let Value::Object(patch_map) = patch else {
        return patch;
    };

    let mut base = match current {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    for (field, value) in patch_map {
        if value.is_null() {
            base.remove(&field);
        } else {
            base.insert(field, value);
        }
    }

    Value::Object(base)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn patch_merges_and_null_removes() {
        let current = json!({"phase": "countdown", "countdown_value": 3, "round_number": 2});
        let merged = apply_patch(
            Some(current),
            json!({"countdown_value": null, "phase": "suspense"}),
        );
        assert_eq!(merged, json!({"phase": "suspense", "round_number": 2}));
    }

    #[test]
    fn patch_creates_missing_document() {
        let merged = apply_patch(None, json!({"phase": "register"}));
        assert_eq!(merged, json!({"phase": "register"}));
    }

    #[test]
    fn non_object_patch_replaces() {
        let merged = apply_patch(Some(json!({"a": 1})), json!(42));
        assert_eq!(merged, json!(42));
    }
}

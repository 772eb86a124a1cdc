//! Values that survive process death between an app switch and the return URL.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Result type for key-value store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the host key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum StoreError {
    /// The platform store refused the operation.
    #[error("store error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for StoreError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

/// Small string store backed by the platform (`UserDefaults`, `SharedPreferences`).
#[uniffi::export(with_foreign)]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, key: String) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set(&self, key: String, value: String) -> StoreResult<()>;

    /// Removes the value stored under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn remove(&self, key: String) -> StoreResult<()>;
}

/// Process-local store for hosts that do not need persistence, and for tests.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_values<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> StoreResult<R> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store poisoned".to_string()))?;
        Ok(f(&mut values))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: String) -> StoreResult<Option<String>> {
        self.with_values(|values| values.get(&key).cloned())
    }

    fn set(&self, key: String, value: String) -> StoreResult<()> {
        self.with_values(|values| {
            values.insert(key, value);
        })
    }

    fn remove(&self, key: String) -> StoreResult<()> {
        self.with_values(|values| {
            values.remove(&key);
        })
    }
}

/// A JSON-encoded value kept in a `KeyValueStore` under a fixed key.
///
/// Reads never fail: a missing or unreadable entry yields the default value.
pub struct Persisted<T> {
    store: Arc<dyn KeyValueStore>,
    key: String,
    default_value: T,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Binds `key` in `store`, falling back to `default_value`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, default_value: T) -> Self {
        Self {
            store,
            key: key.into(),
            default_value,
        }
    }

    /// The stored value, or the default when absent or unreadable.
    #[must_use]
    pub fn get(&self) -> T {
        match self.store.get(self.key.clone()) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("discarding unreadable value for {}: {e}", self.key);
                self.default_value.clone()
            }),
            Ok(None) => self.default_value.clone(),
            Err(e) => {
                log::warn!("failed to read {}: {e}", self.key);
                self.default_value.clone()
            }
        }
    }

    /// Stores `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded or the store rejects it.
    pub fn set(&self, value: &T) -> StoreResult<()> {
        let raw =
            serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(self.key.clone(), raw)
    }

    /// Removes the stored value so that `get` yields the default again.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the removal.
    pub fn clear(&self) -> StoreResult<()> {
        self.store.remove(self.key.clone())
    }
}

impl<T> Persisted<Option<T>>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Reads the value and clears the entry.
    pub fn take(&self) -> Option<T> {
        let value = self.get();
        if let Err(e) = self.clear() {
            log::warn!("failed to clear {}: {e}", self.key);
        }
        value
    }
}

pub(crate) const PENDING_REDIRECT_KEY: &str = "checkoutkit.pending_redirect";

/// A redirect handed to an external app or browser, kept until the return URL arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRedirect {
    /// Correlation token of the redirect action.
    pub payment_data: Option<String>,
    /// Present for native redirects, which need a follow-up backend call.
    pub native_redirect_data: Option<String>,
}

pub(crate) fn pending_redirect(store: Arc<dyn KeyValueStore>) -> Persisted<Option<PendingRedirect>> {
    Persisted::new(store, PENDING_REDIRECT_KEY, None)
}

//! Key-value persistence for the calculator and profile stores.
//!
//! Backends implement [`KeyValueStorage`], a synchronous string-to-string
//! interface shaped like the browser `Storage` API. Stores never talk to a
//! backend directly; they go through [`Persistence`], which logs and
//! swallows every backend failure so that a broken medium degrades to
//! in-memory operation instead of an error.
//!
//! Backend handles are cheap to clone and clones share the same medium, so
//! one handle can be passed to both stores.

mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(not(target_arch = "wasm32"))]
mod sqlite;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod web;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StorageError;

pub use memory::MemoryStorage;
#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;
#[cfg(not(target_arch = "wasm32"))]
pub use sqlite::SqliteStorage;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use web::WebStorage;

/// Persisted key for the calculator values mapping.
pub const CALCULATOR_VALUES_KEY: &str = "m3dp-calculator-values";
/// Persisted key for the last visited page id.
pub const LAST_PAGE_KEY: &str = "m3dp-last-page";
/// Persisted key for the JSON array of user profiles.
pub const USER_PROFILES_KEY: &str = "m3dp-user-profiles";
/// Persisted key for the current profile id.
pub const ACTIVE_PROFILE_KEY: &str = "m3dp-active-profile";

/// A synchronous string key-value medium.
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Failure-containing wrapper around a storage backend.
///
/// Loads return `None` on any failure, saves return `false`. Both log the
/// cause at warn level.
#[derive(Debug, Clone)]
pub struct Persistence<S> {
    storage: S,
}

impl<S: KeyValueStorage> Persistence<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Read the raw string stored under `key`.
    pub fn load(&self, key: &str) -> Option<String> {
        match self.storage.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to load '{}' from storage: {}", key, e);
                None
            }
        }
    }

    /// Read and decode a JSON value stored under `key`.
    /// Absent keys and undecodable documents both yield `None`.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.load(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring malformed data under '{}': {}", key, e);
                None
            }
        }
    }

    /// Write a raw string under `key`.
    pub fn save(&self, key: &str, value: &str) -> bool {
        match self.storage.set_item(key, value) {
            Ok(()) => {
                debug!("Saved '{}' ({} bytes)", key, value.len());
                true
            }
            Err(e) => {
                warn!("Failed to save '{}' to storage: {}", key, e);
                false
            }
        }
    }

    /// Encode `value` as JSON and write it under `key`.
    pub fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.save(key, &json),
            Err(e) => {
                warn!("Failed to serialize '{}': {}", key, e);
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.storage.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove '{}' from storage: {}", key, e);
                false
            }
        }
    }
}

use super::KeyValueStorage;
use crate::error::StorageError;

/// Browser `window.localStorage`.
#[derive(Debug, Clone)]
pub struct WebStorage {
    storage: web_sys::Storage,
}

impl WebStorage {
    pub fn local() -> Result<Self, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStorage for WebStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Browsers throw QuotaExceededError here; nothing else is expected.
        self.storage
            .set_item(key, value)
            .map_err(|_| StorageError::QuotaExceeded(key.to_string()))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }
}

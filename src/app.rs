use crate::error::StorageError;
use crate::profiles::ProfileStore;
use crate::storage::{KeyValueStorage, MemoryStorage};
#[cfg(not(target_arch = "wasm32"))]
use crate::storage::{FileStorage, SqliteStorage};
use crate::values::CalculatorStore;

#[cfg(not(target_arch = "wasm32"))]
use crate::config::{AppConfig, Backend};
#[cfg(not(target_arch = "wasm32"))]
use tracing::info;

/// Storage backend selected at runtime from [`AppConfig`].
#[derive(Debug, Clone)]
pub enum AnyStorage {
    Memory(MemoryStorage),
    #[cfg(not(target_arch = "wasm32"))]
    File(FileStorage),
    #[cfg(not(target_arch = "wasm32"))]
    Sqlite(SqliteStorage),
}

impl KeyValueStorage for AnyStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            AnyStorage::Memory(s) => s.get_item(key),
            #[cfg(not(target_arch = "wasm32"))]
            AnyStorage::File(s) => s.get_item(key),
            #[cfg(not(target_arch = "wasm32"))]
            AnyStorage::Sqlite(s) => s.get_item(key),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            AnyStorage::Memory(s) => s.set_item(key, value),
            #[cfg(not(target_arch = "wasm32"))]
            AnyStorage::File(s) => s.set_item(key, value),
            #[cfg(not(target_arch = "wasm32"))]
            AnyStorage::Sqlite(s) => s.set_item(key, value),
        }
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match self {
            AnyStorage::Memory(s) => s.remove_item(key),
            #[cfg(not(target_arch = "wasm32"))]
            AnyStorage::File(s) => s.remove_item(key),
            #[cfg(not(target_arch = "wasm32"))]
            AnyStorage::Sqlite(s) => s.remove_item(key),
        }
    }
}

/// Everything the calculators need, built once at start-up and passed by
/// reference. Both stores share one storage handle.
pub struct AppState<S> {
    pub values: CalculatorStore<S>,
    pub profiles: ProfileStore<S>,
}

impl<S: KeyValueStorage + Clone> AppState<S> {
    pub fn with_storage(storage: S) -> Self {
        Self {
            values: CalculatorStore::load(storage.clone()),
            profiles: ProfileStore::load(storage),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AppState<AnyStorage> {
    /// Open the configured backend and load both stores from it.
    ///
    /// Only failing to open the medium is an error; unreadable contents
    /// degrade to empty stores.
    pub fn open(config: &AppConfig) -> Result<Self, StorageError> {
        let storage = match config.backend {
            Backend::Memory => AnyStorage::Memory(MemoryStorage::new()),
            Backend::File => AnyStorage::File(FileStorage::open(&config.storage_file())?),
            Backend::Sqlite => AnyStorage::Sqlite(SqliteStorage::new(&config.database_file())?),
        };
        info!("Opening app state with {:?} backend", config.backend);
        Ok(Self::with_storage(storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::FieldValue;
    use tempfile::TempDir;

    fn config_for(backend: Backend, dir: &TempDir) -> AppConfig {
        AppConfig {
            backend,
            data_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_stores_share_storage() {
        let storage = MemoryStorage::new();
        let mut state = AppState::with_storage(storage.clone());
        state.values.set_value("extruder", "eSteps", 415);

        // Default profile list + active id + values + last page
        assert_eq!(storage.len(), 4);
        assert_eq!(state.profiles.profiles().len(), 1);
    }

    #[test]
    fn test_file_backend_survives_restart() {
        let dir = TempDir::new().unwrap();
        let config = config_for(Backend::File, &dir);

        let profile_id = {
            let mut state = AppState::open(&config).unwrap();
            state.values.set_value("pressure-advance", "start", 0.0);
            state.values.set_last_visited_page("pressure-advance");
            state.profiles.create_profile("Second").id
        };

        let state = AppState::open(&config).unwrap();
        assert_eq!(state.values.last_visited_page(), "pressure-advance");
        assert_eq!(
            state.values.get_value("pressure-advance", "start", FieldValue::from(1)),
            FieldValue::Number(0.0)
        );
        assert!(state.profiles.profile(&profile_id).is_some());
        assert_eq!(state.profiles.profiles().len(), 2);
    }

    #[test]
    fn test_sqlite_backend_survives_restart() {
        let dir = TempDir::new().unwrap();
        let config = config_for(Backend::Sqlite, &dir);

        let current = {
            let state = AppState::open(&config).unwrap();
            state.profiles.current_profile_id().unwrap().to_string()
        };

        let state = AppState::open(&config).unwrap();
        assert_eq!(state.profiles.current_profile_id(), Some(current.as_str()));
    }

    #[test]
    fn test_corrupt_storage_file_still_opens() {
        let dir = TempDir::new().unwrap();
        let config = config_for(Backend::File, &dir);
        std::fs::write(config.storage_file(), "{ truncated").unwrap();

        let state = AppState::open(&config).unwrap();
        assert_eq!(state.profiles.profiles().len(), 1);
        assert_eq!(state.values.last_visited_page(), "home");
    }
}

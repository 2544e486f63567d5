use thiserror::Error;

/// Failure reported by a storage backend.
///
/// None of these escape the stores: the persistence adapter logs them and
/// the caller continues with its in-memory state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded while writing '{0}'")]
    QuotaExceeded(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed storage document: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(not(target_arch = "wasm32"))]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Why an import payload was rejected.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported export version '{0}' (expected \"{expected}\")", expected = crate::transfer::EXPORT_VERSION)]
    UnsupportedVersion(String),

    #[error("Payload has no '{0}' section")]
    MissingSection(&'static str),
}

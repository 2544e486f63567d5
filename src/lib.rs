pub mod app;
pub mod binding;
pub mod config;
mod error;
pub mod formulas;
pub mod profiles;
pub mod storage;
pub mod transfer;
pub mod values;

pub use app::{AnyStorage, AppState};
pub use binding::{PersistedCalculator, ValuesGuard};
pub use config::{AppConfig, Backend};
pub use error::{ImportError, StorageError};
pub use profiles::{ProfileStore, UserProfile};
pub use values::{CalculatorStore, FieldValue, FieldValues};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Calling this more than once is
/// harmless; later calls are ignored.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .try_init();
}

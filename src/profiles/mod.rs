//! User profiles: printers, filaments, active selections and preferences.

mod id;
mod patch;
mod store;
mod types;

pub use id::generate_id;
pub use patch::{FilamentUpdate, PrinterUpdate, ProfileUpdate};
pub use store::{ProfileStore, DEFAULT_PROFILE_NAME};
pub use types::*;

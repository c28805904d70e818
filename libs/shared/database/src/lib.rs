pub mod store;

pub use store::{ClinicStore, SlotCandidate, SlotUpdate, StoreError};

use shared_config::AppConfig;

/// Shared application state handed to every router.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: ClinicStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: ClinicStore::new(),
        }
    }
}

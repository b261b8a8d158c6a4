//! Application state and shared resources.

use std::path::PathBuf;

use crime_common::CrimeResult;
use storage::CrimeStore;

/// Shared application state.
pub struct AppState {
    pub store: CrimeStore,
    /// Directory where the mapping endpoint writes its per-period output.
    pub processed_dir: PathBuf,
}

impl AppState {
    pub async fn new(database_url: &str, processed_dir: PathBuf) -> CrimeResult<Self> {
        let store = CrimeStore::connect(database_url).await?;
        Ok(Self {
            store,
            processed_dir,
        })
    }
}

//! Shared handler state.

use std::sync::Arc;
use vitrine_core::Config;
use vitrine_db::RecordStore;
use vitrine_services::Pipeline;
use vitrine_storage::Storage;

/// Everything handlers need: the synchronous units plus the stores checked by `/health`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Pipeline,
    pub records: Arc<dyn RecordStore>,
    pub storage: Arc<dyn Storage>,
}

use std::sync::Arc;

use common::storage::ObjectStore;

use crate::config::AppConfig;
use crate::records::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub config: AppConfig,
}

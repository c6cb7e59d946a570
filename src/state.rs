use std::sync::Arc;

use crate::store::ContributionStore;

/// Shared handler state. The store is built once in `main` and cloned into
/// every worker.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContributionStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ContributionStore>) -> Self {
        Self { store }
    }
}

pub mod cache;
pub mod capacity;
pub mod config;
pub mod dashboard;
pub mod decode;
pub mod error;
pub mod models;
pub mod oracle;
pub mod refresh;
pub mod routes;
pub mod sui;
pub mod tx;

use std::sync::Arc;

use dashboard::Dashboard;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
}

// Application state (AppState)

use crate::core::config::Config;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state of the static file server
#[derive(Clone)]
pub struct AppState {
    /// Built frontend assets
    pub dist_dir: PathBuf,

    /// SPA entry point inside `dist_dir`
    pub index_html: PathBuf,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, index_html: PathBuf) -> Self {
        Self {
            dist_dir: config.server.dist_dir.clone(),
            index_html,
            config: Arc::new(config),
        }
    }
}

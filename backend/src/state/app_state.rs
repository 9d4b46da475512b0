// Application state shared by every handler
// Holds cheap-to-clone handles; no per-request data lives here

use crate::config::Config;
use crate::db::Database;
use crate::error::AppError;
use crate::storage::MediaStore;
use std::sync::Arc;

/// State passed to handlers through axum `State`
#[derive(Clone)]
pub struct AppState {
    /// Table store
    pub db: Database,
    /// Media bucket, `None` when no bucket is configured
    pub media: Option<MediaStore>,
    /// Loaded configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create state from its parts
    pub fn new(db: Database, media: Option<MediaStore>, config: Config) -> Self {
        Self {
            db,
            media,
            config: Arc::new(config),
        }
    }

    /// The media bucket, or a configuration error if none is set up
    pub fn media(&self) -> Result<&MediaStore, AppError> {
        self.media.as_ref().ok_or_else(|| {
            AppError::Configuration("MEDIA_BUCKET env variable not set".to_string())
        })
    }
}

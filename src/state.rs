use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::db::{DbError, TestimonialDb};
use crate::error::ServiceError;
use crate::types::Config;

/// Shared server state. Cloned into every request; nothing else is shared
/// between requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    db: Arc<Mutex<TestimonialDb>>,
}

impl AppState {
    /// Open the store named by `config` and wrap it for the handlers.
    pub fn open(config: Config) -> Result<Self, DbError> {
        let db = TestimonialDb::open(config.db_path.clone())?;
        Ok(Self::new(config, db))
    }

    pub fn new(config: Config, db: TestimonialDb) -> Self {
        Self {
            config: Arc::new(config),
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Run blocking store work off the async runtime.
    ///
    /// The connection is held for the whole closure, so each request's reads
    /// and writes are serialized against every other request's.
    pub async fn with_db<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&TestimonialDb) -> Result<T, ServiceError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock();
            f(&guard)
        })
        .await
        .map_err(|e| ServiceError::Task(e.to_string()))?
    }
}

/// Load configuration from `~/.testimonials/config.json`, then apply
/// `TESTIMONIALS_*` environment overrides. A missing file means defaults.
pub fn load_config() -> Result<Config, String> {
    let mut config = match config_path() {
        Some(path) if path.exists() => {
            let content = fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read config: {}", e))?;
            serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?
        }
        _ => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".testimonials").join("config.json"))
}

/// Overlay environment variables onto a loaded config. Blank values are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(bind) = var("TESTIMONIALS_BIND") {
        config.bind = bind;
    }
    if let Some(path) = var("TESTIMONIALS_DB_PATH") {
        config.db_path = Some(PathBuf::from(path));
    }
    if let Some(origin) = var("TESTIMONIALS_ALLOWED_ORIGIN") {
        config.allowed_origin = Some(origin);
    }
}

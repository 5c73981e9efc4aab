use anyhow::Context;
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    pub db_path: PathBuf,
    /// Compare-and-swap attempts per approve/disapprove before giving up.
    pub max_update_attempts: u32,
    pub log_filter: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("form_approval.db"),
            max_update_attempts: 5,
            log_filter: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env if present

        let defaults = Self::default();
        let max_update_attempts = match env::var("FORM_APPROVAL_MAX_UPDATE_ATTEMPTS") {
            Ok(v) => v
                .parse::<u32>()
                .context("FORM_APPROVAL_MAX_UPDATE_ATTEMPTS must be a positive integer")?
                .max(1),
            Err(_) => defaults.max_update_attempts,
        };

        Ok(Self {
            db_path: env::var("FORM_APPROVAL_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            max_update_attempts,
            log_filter: env::var("RUST_LOG").unwrap_or(defaults.log_filter),
        })
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }
}

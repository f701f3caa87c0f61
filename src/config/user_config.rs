//! User-level configuration for impactlens
//!
//! Supports loading store credentials from:
//! - Environment variables
//! - ~/.config/impactlens/config.toml

use serde::Deserialize;
use std::path::PathBuf;

use super::ImpactConfig;

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub store: StoreCredentials,
    #[serde(default)]
    pub projects_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreCredentials {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl UserConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. User config (~/.config/impactlens/config.toml)
    pub fn load() -> Self {
        let mut config = Self::user_config_path()
            .filter(|p| p.exists())
            .and_then(|p| std::fs::read_to_string(&p).ok())
            .and_then(|content| toml::from_str::<UserConfig>(&content).ok())
            .unwrap_or_default();

        config.merge_env(|key| std::env::var(key).ok());
        config
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("impactlens").join("config.toml"))
    }

    fn merge_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("IMPACTLENS_STORE_URL") {
            self.store.url = Some(url);
        }
        if let Some(user) = var("IMPACTLENS_STORE_USER") {
            self.store.username = Some(user);
        }
        if let Some(password) = var("IMPACTLENS_STORE_PASSWORD") {
            self.store.password = Some(password);
        }
        if let Some(file) = var("IMPACTLENS_PROJECTS_FILE") {
            self.projects_file = Some(PathBuf::from(file));
        }
    }

    /// Overlay these settings on an engine configuration
    pub fn apply(&self, config: &mut ImpactConfig) {
        if let Some(url) = &self.store.url {
            config.store.url = url.clone();
        }
        if self.store.username.is_some() {
            config.store.username = self.store.username.clone();
        }
        if self.store.password.is_some() {
            config.store.password = self.store.password.clone();
        }
        if let Some(file) = &self.projects_file {
            config.projects.file = file.clone();
        }
    }
}

//! Configuration management for snipvault.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Built-in defaults
//! 2. Config file: `snipvault.json` in the working directory, or an explicit path
//! 3. Environment overrides: `GITHUB_*`, `SNIPPETS_PATH`, `ALLOWED_GITHUB_USERS`,
//!    `SNIPVAULT_HOST`, `SNIPVAULT_PORT`

use crate::error::{ConfigError, CoreResult};
use crate::repository::Layout;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "snipvault.json";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote repository settings.
    pub github: GitHubConfig,

    /// Who may write and see private snippets.
    pub auth: AuthConfig,

    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Remote repository settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub snippets_path: String,

    /// Server-side token used for reads that carry no credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            snippets_path: "snippets".to_string(),
            token: None,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

/// Allow-list of usernames. Empty means everyone is authorized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthConfig {
    pub allowed_users: Vec<String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// With `path`, that file must exist. Without it, `snipvault.json` in the
    /// working directory is used if present.
    pub async fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_file(path).await?,
            None => {
                let default = Path::new(CONFIG_FILE);
                if tokio::fs::try_exists(default).await.unwrap_or(false) {
                    Self::load_file(default).await?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> CoreResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Unreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let config = Self::parse(&content, &path.display().to_string())?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration JSON.
    pub fn parse(content: &str, source: &str) -> CoreResult<Self> {
        serde_json::from_str(content).map_err(|e| {
            ConfigError::InvalidJson {
                path: source.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, name: &str| {
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                *target = value.trim().to_string();
            }
        };

        set(&mut self.github.owner, "GITHUB_OWNER");
        set(&mut self.github.repo, "GITHUB_REPO");
        set(&mut self.github.branch, "GITHUB_BRANCH");
        set(&mut self.github.snippets_path, "SNIPPETS_PATH");
        set(&mut self.github.api_url, "GITHUB_API_URL");
        set(&mut self.server.host, "SNIPVAULT_HOST");

        if let Some(token) = lookup("GITHUB_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.github.token = Some(token.trim().to_string());
        }
        if let Some(users) = lookup("ALLOWED_GITHUB_USERS") {
            self.auth.allowed_users = parse_list(&users);
        }
        if let Some(port) = lookup("SNIPVAULT_PORT").filter(|v| !v.trim().is_empty()) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "SNIPVAULT_PORT".to_string(),
                value: port.clone(),
            })?;
        }
        Ok(())
    }

    /// Check that the settings needed to reach the remote store are present.
    pub fn validate(&self) -> CoreResult<()> {
        if self.github.owner.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "github.owner (GITHUB_OWNER)".to_string(),
            }
            .into());
        }
        if self.github.repo.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "github.repo (GITHUB_REPO)".to_string(),
            }
            .into());
        }
        if self.github.branch.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "github.branch".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Where snippets live in the configured repository.
    pub fn layout(&self) -> Layout {
        Layout::new(&self.github.branch, &self.github.snippets_path)
    }
}

//! Configuration management for revu.
//!
//! Handles loading and saving configuration from TOML files. Config files
//! are stored in platform-specific locations:
//!
//! - **macOS/Linux**: `~/.config/revu/config.toml`
//! - **Windows**: `%APPDATA%\revu\config.toml`
//!
//! Tokens are never written to disk; they are resolved from the
//! `REVU_<PROVIDER>_TOKEN` environment variables when a runtime
//! [`ProviderConfig`] is assembled.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{ApiError, ProviderKind, Result};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "revu";

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitHub configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubConfig>,

    /// GitLab configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<GitLabConfig>,

    /// Bitbucket configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitbucket: Option<BitbucketConfig>,

    /// Azure DevOps configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureConfig>,

    /// Gitea configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitea: Option<GiteaConfig>,
}

/// GitHub provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// REST API base URL (for GitHub Enterprise, ends in `/api/v3`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// GitLab provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabConfig {
    /// GitLab instance URL
    #[serde(default = "default_gitlab_url")]
    pub url: String,
    /// Namespace the project lives under (group or user)
    pub owner: String,
    /// Project name
    pub repo: String,
}

/// Bitbucket Cloud provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BitbucketConfig {
    /// Workspace the repository lives in
    pub workspace: String,
    /// Repository slug
    pub repo: String,
}

/// Azure DevOps provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Organization name
    pub organization: String,
    /// Project name
    pub project: String,
    /// Repository name
    pub repo: String,
}

/// Gitea provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GiteaConfig {
    /// Gitea instance URL
    pub url: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
}

fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

// =============================================================================
// Runtime provider context
// =============================================================================

/// Immutable per-repository context passed into adapter construction.
///
/// For Azure DevOps `owner` carries `organization/project`; for Bitbucket it
/// carries the workspace.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Instance base URL; `None` selects the public host.
    pub base_url: Option<String>,
    pub token: String,
    pub owner: String,
    pub repo: String,
}

/// Environment variable holding the token for a provider.
pub fn token_env_var(kind: ProviderKind) -> String {
    format!("REVU_{}_TOKEN", kind.as_str().to_uppercase())
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| ApiError::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ApiError::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| ApiError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| ApiError::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Get a list of configured provider names.
    pub fn configured_providers(&self) -> Vec<ProviderKind> {
        let mut providers = Vec::new();
        if self.github.is_some() {
            providers.push(ProviderKind::GitHub);
        }
        if self.gitlab.is_some() {
            providers.push(ProviderKind::GitLab);
        }
        if self.bitbucket.is_some() {
            providers.push(ProviderKind::Bitbucket);
        }
        if self.azure.is_some() {
            providers.push(ProviderKind::AzureDevOps);
        }
        if self.gitea.is_some() {
            providers.push(ProviderKind::Gitea);
        }
        providers
    }

    /// Check if any provider is configured.
    pub fn has_any_provider(&self) -> bool {
        !self.configured_providers().is_empty()
    }

    /// Assemble the runtime context for a configured provider, resolving the
    /// token from its environment variable.
    pub fn provider_config(&self, kind: ProviderKind) -> Result<ProviderConfig> {
        let env_var = token_env_var(kind);
        let token = std::env::var(&env_var)
            .map_err(|_| ApiError::Auth(format!("{} is not set", env_var)))?;

        let (base_url, owner, repo) = match kind {
            ProviderKind::GitHub => {
                let c = self.github.as_ref().ok_or_else(|| not_configured(kind))?;
                (c.base_url.clone(), c.owner.clone(), c.repo.clone())
            }
            ProviderKind::GitLab => {
                let c = self.gitlab.as_ref().ok_or_else(|| not_configured(kind))?;
                (Some(c.url.clone()), c.owner.clone(), c.repo.clone())
            }
            ProviderKind::Bitbucket => {
                let c = self
                    .bitbucket
                    .as_ref()
                    .ok_or_else(|| not_configured(kind))?;
                (None, c.workspace.clone(), c.repo.clone())
            }
            ProviderKind::AzureDevOps => {
                let c = self.azure.as_ref().ok_or_else(|| not_configured(kind))?;
                (
                    None,
                    format!("{}/{}", c.organization, c.project),
                    c.repo.clone(),
                )
            }
            ProviderKind::Gitea => {
                let c = self.gitea.as_ref().ok_or_else(|| not_configured(kind))?;
                (Some(c.url.clone()), c.owner.clone(), c.repo.clone())
            }
        };

        Ok(ProviderConfig {
            kind,
            base_url,
            token,
            owner,
            repo,
        })
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `provider.field` (e.g. `github.owner`, `gitlab.url`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (provider, field) = split_key(key)?;

        match provider {
            "github" => {
                let config = self.github.get_or_insert_with(GitHubConfig::default);
                match field {
                    "owner" => config.owner = value.to_string(),
                    "repo" => config.repo = value.to_string(),
                    "base_url" | "url" => config.base_url = Some(value.to_string()),
                    _ => return Err(unknown_field("GitHub", field)),
                }
            }
            "gitlab" => {
                let config = self.gitlab.get_or_insert_with(|| GitLabConfig {
                    url: default_gitlab_url(),
                    owner: String::new(),
                    repo: String::new(),
                });
                match field {
                    "url" => config.url = value.to_string(),
                    "owner" => config.owner = value.to_string(),
                    "repo" => config.repo = value.to_string(),
                    _ => return Err(unknown_field("GitLab", field)),
                }
            }
            "bitbucket" => {
                let config = self.bitbucket.get_or_insert_with(BitbucketConfig::default);
                match field {
                    "workspace" => config.workspace = value.to_string(),
                    "repo" => config.repo = value.to_string(),
                    _ => return Err(unknown_field("Bitbucket", field)),
                }
            }
            "azure" => {
                let config = self.azure.get_or_insert_with(AzureConfig::default);
                match field {
                    "organization" | "org" => config.organization = value.to_string(),
                    "project" => config.project = value.to_string(),
                    "repo" => config.repo = value.to_string(),
                    _ => return Err(unknown_field("Azure DevOps", field)),
                }
            }
            "gitea" => {
                let config = self.gitea.get_or_insert_with(GiteaConfig::default);
                match field {
                    "url" => config.url = value.to_string(),
                    "owner" => config.owner = value.to_string(),
                    "repo" => config.repo = value.to_string(),
                    _ => return Err(unknown_field("Gitea", field)),
                }
            }
            _ => {
                return Err(ApiError::Config(format!(
                    "Unknown provider: {}",
                    provider
                )));
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `provider.field` (e.g. `github.owner`, `gitlab.url`).
    /// Returns `Ok(None)` when the provider table is absent.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (provider, field) = split_key(key)?;

        match provider {
            "github" => {
                let Some(config) = &self.github else {
                    return Ok(None);
                };
                match field {
                    "owner" => Ok(Some(config.owner.clone())),
                    "repo" => Ok(Some(config.repo.clone())),
                    "base_url" | "url" => Ok(config.base_url.clone()),
                    _ => Err(unknown_field("GitHub", field)),
                }
            }
            "gitlab" => {
                let Some(config) = &self.gitlab else {
                    return Ok(None);
                };
                match field {
                    "url" => Ok(Some(config.url.clone())),
                    "owner" => Ok(Some(config.owner.clone())),
                    "repo" => Ok(Some(config.repo.clone())),
                    _ => Err(unknown_field("GitLab", field)),
                }
            }
            "bitbucket" => {
                let Some(config) = &self.bitbucket else {
                    return Ok(None);
                };
                match field {
                    "workspace" => Ok(Some(config.workspace.clone())),
                    "repo" => Ok(Some(config.repo.clone())),
                    _ => Err(unknown_field("Bitbucket", field)),
                }
            }
            "azure" => {
                let Some(config) = &self.azure else {
                    return Ok(None);
                };
                match field {
                    "organization" | "org" => Ok(Some(config.organization.clone())),
                    "project" => Ok(Some(config.project.clone())),
                    "repo" => Ok(Some(config.repo.clone())),
                    _ => Err(unknown_field("Azure DevOps", field)),
                }
            }
            "gitea" => {
                let Some(config) = &self.gitea else {
                    return Ok(None);
                };
                match field {
                    "url" => Ok(Some(config.url.clone())),
                    "owner" => Ok(Some(config.owner.clone())),
                    "repo" => Ok(Some(config.repo.clone())),
                    _ => Err(unknown_field("Gitea", field)),
                }
            }
            _ => Err(ApiError::Config(format!("Unknown provider: {}", provider))),
        }
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() != 2 {
        return Err(ApiError::Config(format!(
            "Invalid config key '{}'. Expected format: provider.field",
            key
        )));
    }
    Ok((parts[0], parts[1]))
}

fn unknown_field(provider: &str, field: &str) -> ApiError {
    ApiError::Config(format!("Unknown {} config field: {}", provider, field))
}

fn not_configured(kind: ProviderKind) -> ApiError {
    ApiError::Config(format!("Provider '{}' is not configured", kind))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.is_none());
        assert!(config.gitlab.is_none());
        assert!(!config.has_any_provider());
        assert!(config.configured_providers().is_empty());
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();

        config.set("github.owner", "test-owner").unwrap();
        config.set("github.repo", "test-repo").unwrap();

        assert_eq!(
            config.get("github.owner").unwrap(),
            Some("test-owner".to_string())
        );
        assert_eq!(
            config.get("github.repo").unwrap(),
            Some("test-repo".to_string())
        );

        config
            .set("gitlab.url", "https://gitlab.example.com")
            .unwrap();
        config.set("gitlab.owner", "group").unwrap();
        config.set("gitlab.repo", "project").unwrap();

        assert_eq!(
            config.get("gitlab.url").unwrap(),
            Some("https://gitlab.example.com".to_string())
        );

        config.set("azure.org", "contoso").unwrap();
        assert_eq!(
            config.get("azure.organization").unwrap(),
            Some("contoso".to_string())
        );

        assert!(config.has_any_provider());
        let providers = config.configured_providers();
        assert!(providers.contains(&ProviderKind::GitHub));
        assert!(providers.contains(&ProviderKind::GitLab));
        assert!(providers.contains(&ProviderKind::AzureDevOps));
    }

    #[test]
    fn test_invalid_key() {
        let mut config = Config::default();

        assert!(config.set("invalid", "value").is_err());
        assert!(config.set("too.many.parts", "value").is_err());
        assert!(config.set("unknown.field", "value").is_err());

        // Absent provider table reads as None
        assert_eq!(config.get("github.owner").unwrap(), None);

        // Unknown field on a configured provider errors
        config.set("github.owner", "test").unwrap();
        assert!(config.get("github.unknown_field").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.github = Some(GitHubConfig {
            owner: "test-owner".to_string(),
            repo: "test-repo".to_string(),
            base_url: None,
        });

        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        config.save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("owner = \"test-owner\""));
        assert!(contents.contains("repo = \"test-repo\""));

        let loaded = Config::load_from(&path).unwrap();
        let gh = loaded.github.unwrap();
        assert_eq!(gh.owner, "test-owner");
        assert_eq!(gh.repo, "test-repo");
    }

    #[test]
    fn test_load_nonexistent() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(config.github.is_none());
    }

    #[test]
    fn test_toml_serialization() {
        let config = Config {
            github: Some(GitHubConfig {
                owner: "owner".to_string(),
                repo: "repo".to_string(),
                base_url: Some("https://github.example.com/api/v3".to_string()),
            }),
            gitlab: Some(GitLabConfig {
                url: "https://gitlab.example.com".to_string(),
                owner: "group".to_string(),
                repo: "project".to_string(),
            }),
            bitbucket: None,
            azure: None,
            gitea: None,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[github]"));
        assert!(toml_str.contains("[gitlab]"));
        assert!(!toml_str.contains("[bitbucket]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert!(parsed.github.is_some());
        assert!(parsed.gitlab.is_some());
    }

    #[test]
    fn test_token_env_var_names() {
        assert_eq!(token_env_var(ProviderKind::GitHub), "REVU_GITHUB_TOKEN");
        assert_eq!(token_env_var(ProviderKind::AzureDevOps), "REVU_AZURE_TOKEN");
    }
}

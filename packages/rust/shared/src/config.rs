//! Application configuration for SocialSync.
//!
//! User config lives at `~/.socialsync/socialsync.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file; only the names of the env vars holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SocialSyncError};
use crate::types::{Credentials, MergeMode, Owner, Platform};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "socialsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".socialsync";

// ---------------------------------------------------------------------------
// Config structs (matching socialsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Destination store.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Global defaults for sync runs.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Identity stamped on ingested posts.
    #[serde(default)]
    pub owner: OwnerConfig,

    /// Per-platform API settings.
    #[serde(default)]
    pub platforms: PlatformsConfig,

    /// OpenRouter settings for reports.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file. A leading `~/` is expanded.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.socialsync/socialsync.db".into()
}

impl DatabaseConfig {
    /// Resolve the configured path, expanding `~/` to the home directory.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        expand_home(&self.path)
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Posts to pull per sync run.
    #[serde(default = "default_limit")]
    pub post_limit: u32,

    /// Comments kept per post.
    #[serde(default = "default_limit")]
    pub comment_limit: u32,

    /// How merges commit their delete and insert phases.
    #[serde(default)]
    pub merge_mode: MergeMode,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            post_limit: default_limit(),
            comment_limit: default_limit(),
            merge_mode: MergeMode::default(),
        }
    }
}

/// Default post and comment limit when the caller gives none.
pub fn default_limit() -> u32 {
    5
}

/// `[owner]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerConfig {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    #[serde(default = "default_agent_id")]
    pub agent_id: i64,
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            agent_id: default_agent_id(),
        }
    }
}

fn default_user_id() -> i64 {
    1
}
fn default_agent_id() -> i64 {
    3
}

impl From<&OwnerConfig> for Owner {
    fn from(config: &OwnerConfig) -> Self {
        Self {
            user_id: config.user_id,
            agent_id: config.agent_id,
        }
    }
}

/// `[platforms]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformsConfig {
    #[serde(default = "default_facebook")]
    pub facebook: PlatformConfig,
    #[serde(default = "default_instagram")]
    pub instagram: PlatformConfig,
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            facebook: default_facebook(),
            instagram: default_instagram(),
        }
    }
}

impl PlatformsConfig {
    /// Settings for one platform.
    pub fn get(&self, platform: Platform) -> &PlatformConfig {
        match platform {
            Platform::Facebook => &self.facebook,
            Platform::Instagram => &self.instagram,
        }
    }
}

/// `[platforms.<name>]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the platform's Graph API.
    pub api_base: String,
    /// Name of the env var holding the access token.
    pub token_env: String,
}

impl PlatformConfig {
    /// Look up this platform's access token in the environment.
    pub fn credentials(&self) -> Credentials {
        Credentials::from_env(&self.token_env)
    }
}

fn default_facebook() -> PlatformConfig {
    PlatformConfig {
        api_base: "https://graph.facebook.com/v22.0".into(),
        token_env: "FACEBOOK_ACCESS_TOKEN".into(),
    }
}

fn default_instagram() -> PlatformConfig {
    PlatformConfig {
        api_base: "https://graph.instagram.com".into(),
        token_env: "INSTAGRAM_ACCESS_TOKEN".into(),
    }
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Base URL of the OpenRouter API.
    #[serde(default = "default_openrouter_base")]
    pub api_base: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for sentiment reports.
    #[serde(default = "default_sentiment_model")]
    pub sentiment_model: String,

    /// Model used for competitor analysis.
    #[serde(default = "default_competitor_model")]
    pub competitor_model: String,

    /// Completion token ceiling for report calls.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_base: default_openrouter_base(),
            api_key_env: default_api_key_env(),
            sentiment_model: default_sentiment_model(),
            competitor_model: default_competitor_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_openrouter_base() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_sentiment_model() -> String {
    "openai/gpt-4.1-mini".into()
}
fn default_competitor_model() -> String {
    "perplexity/sonar-reasoning".into()
}
fn default_max_tokens() -> u32 {
    6000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.socialsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SocialSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.socialsync/socialsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SocialSyncError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SocialSyncError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SocialSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SocialSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SocialSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the OpenRouter API key from the configured env var.
pub fn openrouter_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(SocialSyncError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| SocialSyncError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

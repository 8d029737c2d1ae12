//! Configuration loading and path resolution
//!
//! Resolution follows the same priority order everywhere:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and compiled
//! defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "APT_CONFIG";

/// Environment variable naming the SQLite database file
pub const DATABASE_ENV_VAR: &str = "APT_DATABASE_PATH";

/// Environment variable carrying the generative service API key
pub const AI_API_KEY_ENV_VAR: &str = "APT_AI_API_KEY";

/// Directory name used under the platform config/data dirs
const APP_DIR: &str = "apt";

// ============================================================================
// TOML schema
// ============================================================================

/// Top-level TOML configuration
///
/// Every section and field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// SQLite database file (overridden by CLI / `APT_DATABASE_PATH`)
    pub database_path: Option<String>,
    pub logging: LoggingConfig,
    pub batch: BatchSection,
    pub rebalancer: RebalancerSection,
    pub derivation: DerivationSection,
    pub ai: AiSection,
    pub enrichment: EnrichmentSection,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (e.g. "info", "apt_classifier=debug")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[batch]` section: work selection and sub-batch pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    /// Maximum records selected per run
    pub limit: usize,
    /// Records per sub-batch
    pub sub_batch_size: usize,
    /// Concurrent evaluations within a sub-batch
    pub max_concurrency: usize,
    /// Pause between sub-batches (milliseconds)
    pub pause_between_sub_batches_ms: u64,
    /// Profiles below this confidence are re-selected
    pub confidence_threshold: u8,
    /// Profiles older than this are re-selected
    pub max_profile_age_days: i64,
    /// Bounded attempts for persistence writes
    pub persistence_max_attempts: u32,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            limit: 500,
            sub_batch_size: 8,
            max_concurrency: 8,
            pause_between_sub_batches_ms: 1000,
            confidence_threshold: 60,
            max_profile_age_days: 180,
            persistence_max_attempts: 4,
        }
    }
}

/// `[rebalancer]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalancerSection {
    pub enabled: bool,
    /// Maximum share of primary types any single code may hold (0.0-1.0)
    pub ceiling_share: f64,
    /// Only assignments below this confidence may be redrawn
    pub confidence_floor: u8,
    /// Seed for reproducible redraws
    pub seed: u64,
}

impl Default for RebalancerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            ceiling_share: 0.20,
            confidence_floor: 60,
            seed: 0x4150_5442,
        }
    }
}

/// `[derivation]` section: multi-type weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivationSection {
    pub primary_weight: f64,
    pub secondary_weight: f64,
    pub tertiary_weight: f64,
}

impl Default for DerivationSection {
    fn default() -> Self {
        Self {
            primary_weight: 0.6,
            secondary_weight: 0.25,
            tertiary_weight: 0.15,
        }
    }
}

/// `[ai]` section: OpenAI-compatible generative scoring service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSection {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Prefer `APT_AI_API_KEY`; kept here for single-user setups
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 30,
            requests_per_second: 2,
        }
    }
}

/// `[enrichment]` section: reference lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSection {
    pub enabled: bool,
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
}

impl Default for EnrichmentSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://en.wikipedia.org/api/rest_v1".to_string(),
            user_agent: format!(
                "apt-classifier/{} (artist persona classification batch)",
                env!("CARGO_PKG_VERSION")
            ),
            timeout_secs: 10,
            requests_per_second: 1,
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Default config file location (`~/.config/apt/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Resolve which config file to read, if any
///
/// CLI path and `APT_CONFIG` are returned even when the file does not
/// exist so that the caller can warn about it. The platform default is
/// only returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Load TOML configuration with graceful degradation
///
/// - `None` or a missing file: warning + defaults
/// - Unreadable or malformed file: `Error::Config`
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file not found: {}. Using compiled defaults.",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve the SQLite database path: CLI → ENV → TOML → platform default
pub fn resolve_database_path(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_config.database_path.as_deref() {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    default_database_path()
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./apt_data"))
        .join("apt.db")
}

/// Resolve the generative service API key: ENV → TOML
///
/// Returns `None` when neither source has a usable key; callers then run
/// without AI-assisted scoring.
pub fn resolve_ai_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(AI_API_KEY_ENV_VAR)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config.ai.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("AI API key found in multiple sources: environment, TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("AI API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("AI API key loaded from TOML config");
        return Some(key);
    }

    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

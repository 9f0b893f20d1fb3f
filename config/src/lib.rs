//! AION Configuration
//!
//! Shared configuration crate for the AION service and CLI.
//!
//! Handles loading configuration from:
//! 1. AION_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.aion/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::{env, fmt, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<AionConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".aion";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_API_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_PATH: &str = "./aion-db";
const DEFAULT_RPC_URL: &str = "http://127.0.0.1:5050/rpc";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_QUEUE_CAPACITY: usize = 64;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AionConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub hash: HashConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_API_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl ApiConfig {
    /// `host:port` as accepted by a TCP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.into(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

/// Which ledger the service talks to
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// In-process ledger, for tests and dev mode
    #[default]
    Memory,
    /// JSON-RPC gateway in front of the deployed contract
    Rpc,
}

/// Ledger connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Bearer token presented to the signing gateway on root writes
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Memory,
            rpc_url: DEFAULT_RPC_URL.into(),
            auth_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.into()
}
fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Hash variant for TOML config
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HashVariantToml {
    #[default]
    OnElements,
    Unpadded,
}

/// Hash adapter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HashConfig {
    #[serde(default)]
    pub variant: HashVariantToml,
    /// JSON file of known input/output pairs from the verifying ledger
    #[serde(default)]
    pub conformance_vectors: Option<String>,
    /// Refuse to synchronize unless the vectors are present and pass
    #[serde(default)]
    pub require_conformance: bool,
}

/// When deposits and proof lookups observe a synchronized root
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyMode {
    /// Trigger a pass and return immediately
    #[default]
    Eventual,
    /// Wait for a completed pass first
    Strict,
}

impl FromStr for LedgerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rpc" => Ok(Self::Rpc),
            other => Err(format!("unknown ledger backend '{}' (expected memory|rpc)", other)),
        }
    }
}

impl FromStr for HashVariantToml {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on-elements" | "poseidon" => Ok(Self::OnElements),
            "unpadded" | "poseidon-unpadded" => Ok(Self::Unpadded),
            other => Err(format!(
                "unknown hash variant '{}' (expected on-elements|unpadded)",
                other
            )),
        }
    }
}

impl FromStr for ConsistencyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eventual" => Ok(Self::Eventual),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown consistency mode '{}' (expected eventual|strict)",
                other
            )),
        }
    }
}

/// Sync service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub consistency: ConsistencyMode,
    /// Periodic pass interval; `None` disables the timer
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            consistency: ConsistencyMode::Eventual,
            interval_secs: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

/// Feature flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default)]
    pub dev_mode: bool,
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

/// Set an enum field from env var; unrecognised values keep the current one
fn env_choice<T>(key: &str, field: &mut T)
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(e) => log::warn!("Ignoring {}={:?}: {}", key, v, e),
        }
    }
}

/// Set Option<T> from env var if present and parseable
fn env_parse_option<T: FromStr>(key: &str, field: &mut Option<T>) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = Some(parsed);
        }
    }
}

/// Check if env var is set to a truthy value ("1" or "true")
fn env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Implementation
// ============================================================================

impl AionConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check AION_CONFIG env var
        if let Ok(path) = env::var("AION_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.aion/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // API
        env_string("AION_API_HOST", &mut self.api.host);
        env_parse("AION_API_PORT", &mut self.api.port);

        // Database
        env_string("AION_DB_PATH", &mut self.database.path);

        // Ledger
        env_choice("AION_LEDGER", &mut self.ledger.backend);
        env_string("AION_RPC_URL", &mut self.ledger.rpc_url);
        env_option_string("AION_AUTH_TOKEN", &mut self.ledger.auth_token);
        env_parse(
            "AION_REQUEST_TIMEOUT_SECS",
            &mut self.ledger.request_timeout_secs,
        );

        // Hash
        env_choice("AION_HASH_VARIANT", &mut self.hash.variant);
        env_option_string("AION_HASH_VECTORS", &mut self.hash.conformance_vectors);
        if let Some(v) = env_bool("AION_REQUIRE_CONFORMANCE") {
            self.hash.require_conformance = v;
        }

        // Sync
        env_choice("AION_CONSISTENCY", &mut self.sync.consistency);
        env_parse_option("AION_SYNC_INTERVAL_SECS", &mut self.sync.interval_secs);
        env_parse("AION_SYNC_QUEUE", &mut self.sync.queue_capacity);

        // Features
        if let Some(v) = env_bool("DEV_MODE") {
            self.features.dev_mode = v;
        }
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.features.dev_mode = true;
        sample.hash.conformance_vectors = Some("./hash-vectors.json".into());
        sample.sync.interval_secs = Some(60);
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static AionConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: AionConfig) -> Result<(), AionConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

use crate::error::{Result, SnapError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "snap";

// ============================================================================
// Configuration
// ============================================================================

/// User configuration for snap.
///
/// Every field has a serde default, so a partial file (or an empty one) is
/// valid. Command-line flags override the values loaded here.
///
/// # Example
///
/// ```toml
/// ollama_url = "http://localhost:11434"
/// model = "phi4"
/// seed = 42
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Ollama server.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Model used to draft commit messages.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature passed to the model.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Default seed; `snap save --seed` overrides it.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Seconds to wait for a single Ollama request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Diffs longer than this many bytes are summarised per file first.
    #[serde(default = "default_chunk_threshold")]
    pub chunk_threshold: usize,

    /// Default number of commits shown by `snap stack`.
    #[serde(default = "default_stack_limit")]
    pub stack_limit: usize,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "phi4".to_string()
}

fn default_temperature() -> f64 {
    0.3
}

fn default_seed() -> u64 {
    42
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_chunk_threshold() -> usize {
    2000
}

fn default_stack_limit() -> usize {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: default_ollama_url(),
            model: default_model(),
            temperature: default_temperature(),
            seed: default_seed(),
            request_timeout_secs: default_request_timeout_secs(),
            chunk_threshold: default_chunk_threshold(),
            stack_limit: default_stack_limit(),
        }
    }
}

/// Keys accepted by `snap config set`.
pub const CONFIG_KEYS: &[&str] = &[
    "ollama_url",
    "model",
    "temperature",
    "seed",
    "request_timeout_secs",
    "chunk_threshold",
    "stack_limit",
];

impl Config {
    /// Set one key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value.parse().map_err(|_| {
                SnapError::Config(format!("invalid value '{}' for '{}'", value, key))
            })
        }

        match key {
            "ollama_url" => self.ollama_url = value.to_string(),
            "model" => self.model = value.to_string(),
            "temperature" => self.temperature = parse(key, value)?,
            "seed" => self.seed = parse(key, value)?,
            "request_timeout_secs" => self.request_timeout_secs = parse(key, value)?,
            "chunk_threshold" => self.chunk_threshold = parse(key, value)?,
            "stack_limit" => self.stack_limit = parse(key, value)?,
            _ => {
                return Err(SnapError::Config(format!(
                    "unknown key '{}'. Valid keys: {}",
                    key,
                    CONFIG_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

// ============================================================================
// Config Validation
// ============================================================================

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `ollama_url` is not an http(s) URL.
    InvalidUrl(String),
    /// `temperature` outside `[0, 2]`.
    TemperatureOutOfRange(f64),
    /// `stack_limit = 0` would never show anything.
    ZeroStackLimit,
    ZeroTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidUrl(url) => write!(
                f,
                "ollama_url must start with http:// or https:// (got '{}')",
                url
            ),
            ConfigError::TemperatureOutOfRange(t) => {
                write!(f, "temperature must be between 0 and 2 (got {})", t)
            }
            ConfigError::ZeroStackLimit => write!(f, "stack_limit must be at least 1"),
            ConfigError::ZeroTimeout => write!(f, "request_timeout_secs must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a configuration before it is used.
pub fn validate_config(config: &Config) -> std::result::Result<(), ConfigError> {
    if !(config.ollama_url.starts_with("http://") || config.ollama_url.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl(config.ollama_url.clone()));
    }
    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::TemperatureOutOfRange(config.temperature));
    }
    if config.stack_limit == 0 {
        return Err(ConfigError::ZeroStackLimit);
    }
    if config.request_timeout_secs == 0 {
        return Err(ConfigError::ZeroTimeout);
    }
    Ok(())
}

// ============================================================================
// Config File Management
// ============================================================================

/// The filename for the configuration file.
const CONFIG_FILENAME: &str = "config.toml";

/// Written when no config file exists yet.
const DEFAULT_CONFIG_WITH_COMMENTS: &str = r#"# snap configuration

# Ollama server used to draft commit messages
ollama_url = "http://localhost:11434"

# Model name as known to Ollama
model = "phi4"

# Sampling temperature (0 = deterministic, 2 = very creative)
temperature = 0.3

# Default seed for reproducible messages (override with `snap save --seed N`)
seed = 42

# Seconds to wait for one Ollama request
request_timeout_secs = 120

# Diffs larger than this many bytes are summarised file by file first
chunk_threshold = 2000

# Number of commits shown by `snap stack` (override with `--limit N`)
stack_limit = 20
"#;

/// Get the snap config directory path (~/.config/snap/).
///
/// Returns the path to the config directory. Does not create the directory.
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SnapError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Ensure the snap config directory exists, reporting whether it was created.
pub fn ensure_config_dir() -> Result<(PathBuf, bool)> {
    let dir = config_dir()?;
    let created = !dir.exists();
    fs::create_dir_all(&dir)?;
    Ok((dir, created))
}

/// Path of `~/.config/snap/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

/// Load `~/.config/snap/config.toml`, creating it with commented defaults
/// when it does not exist.
pub fn load_config() -> Result<Config> {
    let (dir, _) = ensure_config_dir()?;
    load_config_at(&dir)
}

/// Save the configuration, replacing the existing file and its comments.
pub fn save_config(config: &Config) -> Result<()> {
    let (dir, _) = ensure_config_dir()?;
    save_config_at(&dir, config)
}

fn load_config_at(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILENAME);
    if !path.exists() {
        fs::write(&path, DEFAULT_CONFIG_WITH_COMMENTS)?;
        tracing::info!(path = %path.display(), "created default config");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;
    let config: Config = toml::from_str(&content).map_err(|e| {
        SnapError::Config(format!("Failed to parse config file at {:?}: {}", path, e))
    })?;
    validate_config(&config).map_err(|e| {
        SnapError::Config(format!("{} in {}", e, path.display()))
    })?;
    tracing::debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

fn save_config_at(dir: &Path, config: &Config) -> Result<()> {
    validate_config(config).map_err(|e| SnapError::Config(e.to_string()))?;
    let content = toml::to_string(config)
        .map_err(|e| SnapError::Config(format!("Failed to serialize config: {}", e)))?;
    fs::write(
        dir.join(CONFIG_FILENAME),
        format!("# snap configuration\n\n{}", content),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_dir_returns_path_ending_with_snap() {
        let result = config_dir().unwrap();
        assert!(result.ends_with("snap"));
        assert!(result.parent().unwrap().ends_with(".config"));
    }

    #[test]
    fn test_default_config_matches_commented_file() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_WITH_COMMENTS).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("model = \"llama3\"\nseed = 7\n").unwrap();
        assert_eq!(parsed.model, "llama3");
        assert_eq!(parsed.seed, 7);
        assert_eq!(parsed.ollama_url, "http://localhost:11434");
        assert_eq!(parsed.stack_limit, 20);
    }

    #[test]
    fn test_load_creates_file_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config_at(temp_dir.path()).unwrap();
        assert_eq!(config, Config::default());
        let written = fs::read_to_string(temp_dir.path().join(CONFIG_FILENAME)).unwrap();
        assert!(written.contains("# snap configuration"));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.set("model", "mistral").unwrap();
        config.set("temperature", "0.7").unwrap();
        save_config_at(temp_dir.path(), &config).unwrap();
        assert_eq!(load_config_at(temp_dir.path()).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILENAME), "seed = [").unwrap();
        let err = load_config_at(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILENAME), "temperature = 5.0").unwrap();
        let err = load_config_at(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_validate_config() {
        assert!(validate_config(&Config::default()).is_ok());

        let bad_url = Config {
            ollama_url: "localhost:11434".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&bad_url),
            Err(ConfigError::InvalidUrl(_))
        ));

        let zero_limit = Config {
            stack_limit: 0,
            ..Default::default()
        };
        assert_eq!(validate_config(&zero_limit), Err(ConfigError::ZeroStackLimit));

        let zero_timeout = Config {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(validate_config(&zero_timeout), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn test_set_rejects_unknown_key_and_bad_value() {
        let mut config = Config::default();
        let err = config.set("colour", "red").unwrap_err().to_string();
        assert!(err.contains("unknown key"));
        assert!(err.contains("stack_limit"));
        assert!(config.set("seed", "abc").is_err());
        assert_eq!(config, Config::default());
    }
}

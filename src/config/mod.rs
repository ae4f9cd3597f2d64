//! Configuration management for freshet.
//!
//! Configuration is read from `~/.config/freshet/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::aggregate::{DEFAULT_MAX_CONCURRENT, DEFAULT_WINDOW_CAPACITY};
use crate::fetcher::{CachePolicy, DEFAULT_CONDITIONAL_HEADER};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub aggregate: AggregateConfig,
    pub github: GitHubConfig,
    pub eonet: EonetConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Request header carrying the last seen version marker
    pub conditional_header: String,
    pub cache_policy: CachePolicy,
    pub use_system_proxy: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("freshet/{}", env!("CARGO_PKG_VERSION")),
            conditional_header: DEFAULT_CONDITIONAL_HEADER.to_string(),
            cache_policy: CachePolicy::PreferCache,
            use_system_proxy: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub max_concurrent: usize,
    pub window_capacity: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_base: String,
    /// Language used to pick the most popular repositories
    pub language: String,
    pub per_page: u32,
    /// Follow a single repository instead of searching
    pub repo: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            language: "swift".to_string(),
            per_page: 5,
            repo: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EonetConfig {
    pub api_base: String,
    pub days: u32,
}

impl Default for EonetConfig {
    fn default() -> Self {
        Self {
            api_base: "https://eonet.gsfc.nasa.gov/api/v2.1".to_string(),
            days: 360,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/freshet/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("freshet").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# freshet configuration

[http]
# Whole-request timeout in seconds
timeout_secs = 30

# Header used to send the last seen Last-Modified value back to the server
conditional_header = "If-Modified-Since"

# prefer_cache: a cached body answers repeat requests without a network call
# revalidate: always ask the server, sending the known version
cache_policy = "prefer_cache"

# Honour HTTP_PROXY / HTTPS_PROXY / NO_PROXY
use_system_proxy = true

[aggregate]
# Requests in flight at once during a fan-out
max_concurrent = 2

# Newest items kept in the activity window
window_capacity = 50

[github]
api_base = "https://api.github.com"
language = "swift"
per_page = 5
# repo = "ReactiveX/RxSwift"

[eonet]
api_base = "https://eonet.gsfc.nasa.gov/api/v2.1"
days = 360
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let config: Config = toml::from_str(Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.conditional_header, "If-Modified-Since");
        assert_eq!(config.http.cache_policy, CachePolicy::PreferCache);
        assert_eq!(config.aggregate.max_concurrent, 2);
        assert_eq!(config.aggregate.window_capacity, 50);
        assert_eq!(config.github.repo, None);
        assert_eq!(config.eonet.days, 360);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[http]
cache_policy = "revalidate"

[github]
repo = "ReactiveX/RxSwift"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.http.cache_policy, CachePolicy::Revalidate);
        assert_eq!(config.github.repo.as_deref(), Some("ReactiveX/RxSwift"));
        // Defaults fill the rest
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.github.per_page, 5);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.aggregate.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.github.api_base, "https://api.github.com");
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[aggregate]\nmax_concurrent = \"many\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_create_default_config_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::create_default_config(&path).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.eonet.api_base, "https://eonet.gsfc.nasa.gov/api/v2.1");
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::SessionCookie;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to write config file: {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("No config directory available on this platform")]
    NoConfigDir,
    #[error("Failed to serialize config")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid session ttl `{value}`")]
    InvalidTtl {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("Session ttl `{0}` is out of range")]
    TtlOutOfRange(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// SQLite database file
    #[serde(default = "default_database")]
    database: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS origins for release builds
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Token lifetime, e.g. "24h" or "90m"
    #[serde(default = "default_ttl")]
    pub ttl: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_secure_cookie")]
    pub secure_cookie: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

fn default_database() -> String {
    "~/.local/share/promo-cms/promo-cms.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_ttl() -> String {
    "24h".to_string()
}

fn default_cookie_name() -> String {
    "token".to_string()
}

fn default_secure_cookie() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            server: ServerConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            cookie_name: default_cookie_name(),
            secure_cookie: default_secure_cookie(),
            secret: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("promo-cms").join("config.toml"))
    }

    /// An explicit path must exist. Without one, a missing default file means
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the default config to the default path, refusing to overwrite.
    pub fn create_default() -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path));
        }
        let contents = toml::to_string_pretty(&Self::default())?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, contents).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get expanded database path
    pub fn database_path(&self) -> PathBuf {
        self.expand_path(&self.database)
    }

    pub fn session_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        let ttl = humantime::parse_duration(&self.session.ttl).map_err(|source| {
            ConfigError::InvalidTtl {
                value: self.session.ttl.clone(),
                source,
            }
        })?;
        chrono::Duration::from_std(ttl)
            .ok()
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .ok_or_else(|| ConfigError::TtlOutOfRange(self.session.ttl.clone()))
    }

    /// The command-line/environment secret wins over the file.
    pub fn session_secret<'a>(&'a self, override_secret: Option<&'a str>) -> Option<&'a str> {
        override_secret.or(self.session.secret.as_deref())
    }

    pub fn session_cookie(&self) -> SessionCookie {
        SessionCookie {
            name: self.session.cookie_name.clone(),
            secure: self.session.secure_cookie,
        }
    }
}

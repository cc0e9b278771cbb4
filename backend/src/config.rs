use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_PIPELINE_PATH: &str = "artifacts/pipeline.json";
pub const DEFAULT_CONFIG_PATH: &str = "config/service.yaml";
pub const DEFAULT_PAYLOAD_LIMIT: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Optional overrides read from `config/service.yaml`.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub pipeline_path: Option<PathBuf>,
    pub payload_limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub pipeline_path: PathBuf,
    pub payload_limit: usize,
}

/// Directory relative paths are resolved against: the workspace root when
/// started through cargo, the working directory otherwise.
pub fn deployment_root() -> PathBuf {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        return Path::new(&manifest_dir).join("..");
    }
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

impl AppConfig {
    /// Defaults, then the YAML file, then environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let root = deployment_root();
        let file = match env::var("SERVICE_CONFIG") {
            Ok(path) => Some(FileConfig::load(&resolve(&root, Path::new(&path)))?),
            Err(_) => {
                let default_path = root.join(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Some(FileConfig::load(&default_path)?)
                } else {
                    None
                }
            }
        };
        Self::from_sources(&root, file.unwrap_or_default(), |key| env::var(key).ok())
    }

    pub fn from_sources(
        root: &Path,
        file: FileConfig,
        env_var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let host = env_var("HOST")
            .or(file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match env_var("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue { key: "PORT", value })?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let pipeline_path = env_var("PIPELINE_PATH")
            .map(PathBuf::from)
            .or(file.pipeline_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PIPELINE_PATH));

        let payload_limit = match env_var("PAYLOAD_LIMIT") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "PAYLOAD_LIMIT",
                    value,
                })?,
            None => file.payload_limit.unwrap_or(DEFAULT_PAYLOAD_LIMIT),
        };
        if payload_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PAYLOAD_LIMIT",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            pipeline_path: resolve(root, &pipeline_path),
            payload_limit,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        // An empty document is a valid "no overrides" file.
        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(config_str)?)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

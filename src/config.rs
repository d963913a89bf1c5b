use std::env;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must not be empty")]
    Empty { name: &'static str },

    #[error("{name} must be a positive integer (got {value:?})")]
    NotANumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub registry_dir: PathBuf,
    pub model_name: String,
    pub model_version: String,
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str, default: &str| -> Result<String, ConfigError> {
            let value = lookup(name).unwrap_or_else(|| default.to_string());
            if value.trim().is_empty() {
                return Err(ConfigError::Empty { name });
            }
            Ok(value)
        };

        let port = var("PORT", "8080")?;
        let port = match port.parse::<u16>() {
            Ok(p) if p > 0 => p,
            _ => return Err(ConfigError::NotANumber { name: "PORT", value: port }),
        };

        let workers = match lookup("WORKERS") {
            None => None,
            Some(w) => match w.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => return Err(ConfigError::NotANumber { name: "WORKERS", value: w }),
            },
        };

        Ok(Config {
            registry_dir: PathBuf::from(var("MODEL_REGISTRY_DIR", "./registry")?),
            model_name: var("MODEL_NAME", "iris-classifier")?,
            model_version: var("MODEL_VERSION", "1")?,
            host: var("HOST", "127.0.0.1")?,
            port,
            workers,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

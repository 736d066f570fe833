use anyhow::{bail, Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL_PATH: &str = "models/modelo_demencia.json";
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:8000", "http://127.0.0.1:8000"];

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelConfig {
    /// Path to the exported model artifact (JSON)
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CorsConfig {
    /// Origins allowed to issue cross-origin requests
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_origins() -> Vec<String> {
    DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect()
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("PREDICTOR_CONFIG").unwrap_or_else(|_| "predictor.toml".to_string());

        if Path::new(&config_path).exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            Self::from_toml(&content)
        } else {
            Self::from_env()
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().context("Invalid PORT")?,
            None => DEFAULT_PORT,
        };

        let host = var("HOST").unwrap_or_else(default_host);
        let model_path = var("MODEL_PATH").unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());

        let allowed_origins = match var("CORS_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            None => default_origins(),
        };

        let config = Config {
            server: ServerConfig { host, port },
            model: ModelConfig { path: model_path },
            cors: CorsConfig { allowed_origins },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let path = Path::new(&self.model.path);
        let escapes = path.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes {
            bail!(
                "Model path '{}' must not traverse outside the deployment directory",
                self.model.path
            );
        }
        Ok(())
    }

    /// Model location under `base`. Loading rejects absolute and `..` paths,
    /// so the result never leaves `base`.
    pub fn model_path(&self, base: &Path) -> PathBuf {
        base.join(&self.model.path)
    }
}

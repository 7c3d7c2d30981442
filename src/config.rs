use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::session::FileCredentialStore;

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "FORUM_API_URL";

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to data directory (holds the stored token)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Forum API base URL
    #[arg(long)]
    pub api_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub proxy: ProxyConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub token_path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ProxyConfig {
    pub listen: String,
    pub prefix: String,
    pub target: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3000".to_string(),
            prefix: "/api".to_string(),
            target: "https://mern-stack-zhce.onrender.com".to_string(),
        }
    }
}

impl Config {
    pub fn load(args: &ConfigArgs) -> anyhow::Result<Self> {
        Self::load_with_env(args, std::env::var(API_URL_ENV).ok())
    }

    /// Same as [`Config::load`], with the environment override passed in.
    pub fn load_with_env(args: &ConfigArgs, env_api_url: Option<String>) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(args);
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // Environment, then CLI
        if let Some(url) = env_api_url.filter(|u| !u.is_empty()) {
            config.api.base_url = url;
        }
        if let Some(ref url) = args.api_url {
            config.api.base_url = url.clone();
        }

        Url::parse(&config.api.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid API URL {:?}: {}", config.api.base_url, e))?;

        if config.storage.token_path.is_none() {
            config.storage.token_path = Some(data_dir.join(FileCredentialStore::FILE_NAME));
        }

        Ok(config)
    }

    pub fn data_dir(args: &ConfigArgs) -> PathBuf {
        args.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".forum-client")
        })
    }

    pub fn token_path(&self) -> PathBuf {
        self.storage
            .token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(FileCredentialStore::FILE_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

//! Service configuration
//!
//! Layers, lowest priority first: built-in defaults, the YAML file, then
//! `ALERTSRV_` environment variables with `__` separating nested keys
//! (e.g. `ALERTSRV_TELEGRAM__BOT_TOKEN`).

use alert_engine::MessageTemplate;
use anyhow::{bail, Context, Result};
use common::LogConfig;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/alertsrv.yaml";
pub const ENV_PREFIX: &str = "ALERTSRV_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub tick_interval_secs: u64,
    /// Admin API listen address
    pub bind: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "alertsrv".to_string(),
            tick_interval_secs: 15,
            bind: "127.0.0.1:6010".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/alertsrv.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Alert feed URLs in priority order
    pub urls: Vec<String>,
    pub fetch_timeout_ms: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            fetch_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
    /// Chat that receives map uploads
    pub upload_chat_id: i64,
    pub request_timeout_ms: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            upload_chat_id: 0,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub concurrency: usize,
    pub send_timeout_ms: u64,
    pub templates: MessageTemplate,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            concurrency: alert_engine::DEFAULT_CONCURRENCY,
            send_timeout_ms: 10_000,
            templates: MessageTemplate::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
    pub template_path: PathBuf,
    pub rasterizer: String,
    pub width: u32,
    pub work_dir: PathBuf,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("assets/map.svg"),
            rasterizer: alert_engine::maps::DEFAULT_PROGRAM.to_string(),
            width: alert_engine::maps::DEFAULT_WIDTH,
            work_dir: std::env::temp_dir().join("alertsrv"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub logging: LogConfig,
    pub providers: ProvidersConfig,
    pub telegram: TelegramConfig,
    pub notifications: NotificationsConfig,
    pub maps: MapsConfig,
}

impl AppConfig {
    /// Load from `path` (a missing file is allowed) and the environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: AppConfig = Self::figment(path)
            .extract()
            .with_context(|| format!("Failed to load configuration from {:?}", path))?;

        config.validate()?;
        Ok(config)
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.providers.urls.is_empty() {
            bail!("providers.urls must list at least one alert feed");
        }
        if self.service.tick_interval_secs == 0 {
            bail!("service.tick_interval_secs must be greater than zero");
        }
        if self.notifications.concurrency == 0 {
            bail!("notifications.concurrency must be greater than zero");
        }
        if self.telegram.bot_token.trim().is_empty() {
            bail!("telegram.bot_token is required");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.service.tick_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.providers.fetch_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.notifications.send_timeout_ms)
    }

    pub fn telegram_timeout(&self) -> Duration {
        Duration::from_millis(self.telegram.request_timeout_ms)
    }
}

// config/mod.rs
use config::{Config, ConfigError, Environment, FileFormat, Source};
use serde::Deserialize;

use crate::{models::LightId, show::Finale};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub bridge: BridgeSettings,
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub show: ShowSettings,
    #[serde(default)]
    pub midi: MidiSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeSettings {
    /// Bridge address, with or without a scheme.
    pub host: String,
    /// Whitelisted API username issued by the bridge.
    pub username: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShowSettings {
    pub gateway_url: String,
    pub lights: Vec<ShowLight>,
    pub baseline_brightness: i64,
    pub worker_timeout_secs: Option<u64>,
    pub finale: Finale,
}

impl Default for ShowSettings {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:9010".to_string(),
            lights: [1, 2, 5]
                .into_iter()
                .map(|id| ShowLight {
                    id: LightId::from(id),
                    variant: None,
                })
                .collect(),
            baseline_brightness: 100,
            worker_timeout_secs: None,
            finale: Finale::default(),
        }
    }
}

/// One light in a show, optionally pinned to a named animation variant.
#[derive(Debug, Clone, Deserialize)]
pub struct ShowLight {
    pub id: LightId,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MidiSettings {
    pub light: LightId,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            light: LightId::from(5),
        }
    }
}

fn default_timeout_ms() -> u64 {
    5000
}

/// `APP_BRIDGE__HOST` overrides `bridge.host`.
fn environment() -> Environment {
    Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::layered(config::File::with_name("config/config"), environment())
    }

    fn layered<S>(file: S, env: Environment) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

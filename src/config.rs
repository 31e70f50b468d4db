use motion::ActuatorConfig;
use network::SyncConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use wifi::Credentials;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub device: DeviceConfig,
    pub wifi: WifiConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Plain device name; escaped when building the endpoint URL
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_ms: u64,
}

fn default_country() -> String {
    "AU".to_string()
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_request_timeout() -> u64 {
    5_000
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // Try external file first
        let config: Config = if Path::new("config.toml").exists() {
            let config_content = fs::read_to_string("config.toml")?;
            log::info!("Loaded configuration from file");
            toml::from_str(&config_content)?
        } else {
            // Fallback to embedded defaults
            log::warn!("Using embedded default configuration");
            toml::from_str(include_str!("../config.toml.example"))?
        };

        config.actuator.validate()?;
        Ok(config)
    }
}

// Helper functions for easy access
impl Config {
    pub fn device_url(&self) -> String {
        protocol::device_url(&self.server.url, &self.device.name)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.timeout_ms)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            ssid: self.wifi.ssid.clone(),
            password: self.wifi.password.clone(),
            country: self.wifi.country.clone(),
            connect_timeout: Duration::from_millis(self.wifi.connect_timeout_ms),
        }
    }
}

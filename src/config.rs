use rumqttc::QoS;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn, Level};

use crate::mqtt::address::DEFAULT_PORT;
use crate::mqtt::BrokerAddress;

pub const DEFAULT_PUB_TOPIC: &str = "ring_doorbell";
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "smartdoorbell";
pub const DEFAULT_SWITCH_PIN: u8 = 10;
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No [{0}] section in configuration")]
    MissingSection(&'static str),

    #[error("No host in [mqtt.broker] section")]
    MissingHost,

    #[error("Invalid QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    #[error("Unknown log level '{0}'")]
    InvalidLogLevel(String),

    #[error("Unknown log format '{0}', expected pretty, compact or full")]
    InvalidLogFormat(String),
}

/// Raw config file; every section and key is optional
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Config {
    pub logging: Option<LoggingConfig>,
    pub mqtt: Option<MqttConfig>,
    pub gpio: Option<GpioConfig>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

/// Output layout of the fmt subscriber
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Full,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct MqttConfig {
    pub pub_topic: Option<String>,
    pub qos: Option<u8>,
    pub client_id_prefix: Option<String>,
    pub use_websockets: Option<bool>,
    pub broker: Option<BrokerConfig>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct BrokerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub passwd: Option<String>,
    pub tls_cert_path: Option<PathBuf>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct GpioConfig {
    pub switch_pin: Option<u8>,
    pub debounce_ms: Option<u64>,
}

/// Everything the doorbell needs to build its MQTT session
#[derive(Clone, Debug)]
pub struct MqttSettings {
    pub address: BrokerAddress,
    pub pub_topic: String,
    pub qos: QoS,
    pub client_id_prefix: String,
    pub use_websockets: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpioSettings {
    pub switch_pin: u8,
    pub debounce: Duration,
}

impl Config {
    /// `<config dir>/smartdoorbell/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("smartdoorbell").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Max log level; `info` when the section or key is absent
    pub fn log_level(&self) -> Result<Level, ConfigError> {
        let Some(level) = self.logging.as_ref().and_then(|l| l.level.as_deref()) else {
            return Ok(Level::INFO);
        };
        match level.to_lowercase().as_str() {
            "error" => Ok(Level::ERROR),
            "warning" | "warn" => Ok(Level::WARN),
            "info" => Ok(Level::INFO),
            "debug" => Ok(Level::DEBUG),
            "trace" => Ok(Level::TRACE),
            _ => Err(ConfigError::InvalidLogLevel(level.to_owned())),
        }
    }

    /// Log layout; `pretty` when the section or key is absent
    pub fn log_format(&self) -> Result<LogFormat, ConfigError> {
        let Some(format) = self.logging.as_ref().and_then(|l| l.format.as_deref()) else {
            return Ok(LogFormat::default());
        };
        match format.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            _ => Err(ConfigError::InvalidLogFormat(format.to_owned())),
        }
    }

    pub fn mqtt_settings(&self) -> Result<MqttSettings, ConfigError> {
        let mqtt = self
            .mqtt
            .as_ref()
            .ok_or(ConfigError::MissingSection("mqtt"))?;
        let broker = mqtt
            .broker
            .as_ref()
            .ok_or(ConfigError::MissingSection("mqtt.broker"))?;
        let host = broker
            .host
            .as_deref()
            .filter(|host| !host.trim().is_empty())
            .ok_or(ConfigError::MissingHost)?;

        let port = broker.port.unwrap_or_else(|| {
            debug!("No broker port configured, using {}", DEFAULT_PORT);
            DEFAULT_PORT
        });
        if broker.user.is_none() {
            warn!("No MQTT user in configuration, connecting without credentials");
        }
        if broker.passwd.is_none() {
            warn!("No MQTT password in configuration, connecting without credentials");
        }

        let scheme = if broker.tls_cert_path.is_some() {
            "mqtts"
        } else {
            "mqtt"
        };
        let mut address = BrokerAddress::new(scheme, host, port)
            .with_credentials(broker.user.clone(), broker.passwd.clone());
        if let Some(path) = &broker.tls_cert_path {
            address = address.with_tls_cert(path);
        }

        let pub_topic = mqtt.pub_topic.clone().unwrap_or_else(|| {
            warn!("No MQTT pub_topic in configuration, using '{DEFAULT_PUB_TOPIC}'");
            DEFAULT_PUB_TOPIC.to_owned()
        });

        Ok(MqttSettings {
            address,
            pub_topic,
            qos: qos_from_level(mqtt.qos.unwrap_or(0))?,
            client_id_prefix: mqtt
                .client_id_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_CLIENT_ID_PREFIX.to_owned()),
            use_websockets: mqtt.use_websockets.unwrap_or(false),
        })
    }

    pub fn gpio_settings(&self) -> GpioSettings {
        let gpio = self.gpio.clone().unwrap_or_else(|| {
            warn!("No gpio section in configuration, using switch pin {DEFAULT_SWITCH_PIN}");
            GpioConfig::default()
        });
        let switch_pin = gpio.switch_pin.unwrap_or_else(|| {
            if self.gpio.is_some() {
                warn!("No gpio switch_pin in configuration, using {DEFAULT_SWITCH_PIN}");
            }
            DEFAULT_SWITCH_PIN
        });

        GpioSettings {
            switch_pin,
            debounce: Duration::from_millis(gpio.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
        }
    }
}

fn qos_from_level(level: u8) -> Result<QoS, ConfigError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(ConfigError::InvalidQos(other)),
    }
}

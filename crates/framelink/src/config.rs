//! TOML configuration for the receiver harness.
//!
//! ```toml
//! version = 1
//!
//! [receiver]
//! server = "Test Pattern"
//! path = "cpu"
//! backend = "software"
//! poll_interval = "16ms"
//! frames = 120
//!
//! [producer]
//! app_name = "framelink"
//! server_name = "Test Pattern"
//! width = 640
//! height = 360
//!
//! [export]
//! path = "captures"
//! ```
//!
//! Every section and key is optional except `version`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Largest producer texture edge accepted from configuration.
pub const MAX_DIMENSION: u32 = 16_384;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which copy path the receiver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyPath {
    #[default]
    Gpu,
    Cpu,
}

/// Which render host backs the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Wgpu,
    Software,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FramelinkConfig {
    pub version: u32,
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Server or application name to bind to. Defaults to the producer's
    /// server name.
    pub server: Option<String>,
    pub path: CopyPath,
    pub backend: Backend,
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub poll_interval: Duration,
    pub frames: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            server: None,
            path: CopyPath::default(),
            backend: Backend::default(),
            poll_interval: Duration::from_millis(16),
            frames: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub app_name: String,
    pub server_name: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            app_name: "framelink".into(),
            server_name: "Test Pattern".into(),
            width: 640,
            height: 360,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    /// PNG file, or a directory that receives a timestamped file.
    pub path: Option<PathBuf>,
}

impl Default for FramelinkConfig {
    fn default() -> Self {
        Self {
            version: 1,
            receiver: ReceiverConfig::default(),
            producer: ProducerConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl FramelinkConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FramelinkConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Name the receiver binds to.
    pub fn target_server(&self) -> &str {
        self.receiver
            .server
            .as_deref()
            .unwrap_or(&self.producer.server_name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }
        if let Some(server) = &self.receiver.server {
            if server.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "receiver.server may not be empty".into(),
                ));
            }
        }
        if self.receiver.frames == 0 {
            return Err(ConfigError::Invalid(
                "receiver.frames must be greater than zero".into(),
            ));
        }
        if self.receiver.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "receiver.poll_interval must be greater than zero".into(),
            ));
        }
        if self.producer.app_name.trim().is_empty() && self.producer.server_name.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "producer needs an app_name or a server_name".into(),
            ));
        }
        let (width, height) = (self.producer.width, self.producer.height);
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ConfigError::Invalid(format!(
                "producer size {width}x{height} must be within 1..={MAX_DIMENSION} on each edge"
            )));
        }
        if let Some(path) = &self.export.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("export.path may not be empty".into()));
            }
            let has_other_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| !ext.eq_ignore_ascii_case("png"));
            if has_other_extension && !path.is_dir() {
                return Err(ConfigError::Invalid(format!(
                    "export.path '{}' must be a directory or a .png file",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v} seconds: {err}")))
        }
    }
    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

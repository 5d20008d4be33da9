//! Settings for the control link, loadable from a TOML file.
//!
//! ```toml
//! simulator_host = "127.0.0.1:18083"
//! connect_timeout_ms = 1000
//! request_timeout_ms = 10000
//! pool_size = 1
//! telemetry_log = "telemetry.log"
//! truncate_log_on_start = false
//!
//! [scales]
//! forward = 0.3789
//! ascend = 0.2667
//!
//! [commander]
//! default_height = 2.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::channels::ConversionScales;
use crate::{DEFAULT_SIMULATOR_HOST, LinkError};

/// Configuration settings for [ControlLink](crate::ControlLink).
///
/// The defaults target a simulator running on the local machine:
///
/// ```rust
/// use realflight_link::Configuration;
/// use std::time::Duration;
///
/// let config = Configuration::default();
/// assert_eq!(config.simulator_host, "127.0.0.1:18083");
/// assert_eq!(config.request_timeout, Duration::from_secs(10));
/// ```
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Address of the RealFlight Link server, in the format "host:port".
    pub simulator_host: String,

    /// Maximum time to wait when establishing a new TCP connection.
    pub connect_timeout: Duration,

    /// Upper bound for one request/response round trip, including the wait for a
    /// pooled connection.
    pub request_timeout: Duration,

    /// Number of connections the pool keeps open ahead of time.
    ///
    /// RealFlight serves a single request per connection, so the pool hides
    /// connection setup latency. One is enough for a sequential control loop.
    pub pool_size: usize,

    /// Tuning constants for the motion-to-channel conversion.
    pub scales: ConversionScales,

    /// File receiving accepted telemetry records. `None` disables file logging.
    pub telemetry_log: Option<PathBuf>,

    /// Clear the telemetry log when the link is created and on every reset.
    pub truncate_log_on_start: bool,

    /// Defaults for the motion-sequencing layer built on top of the link.
    pub commander: CommanderDefaults,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            simulator_host: DEFAULT_SIMULATOR_HOST.to_string(),
            connect_timeout: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(10),
            pool_size: 1,
            scales: ConversionScales::default(),
            telemetry_log: Some(PathBuf::from("telemetry.log")),
            truncate_log_on_start: false,
            commander: CommanderDefaults::default(),
        }
    }
}

/// Take-off height and cruise velocity used by higher level commands.
///
/// The link itself never reads these values.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommanderDefaults {
    /// Height in meters.
    pub default_height: f32,
    /// Velocity in m/s.
    pub default_velocity: f32,
}

impl Default for CommanderDefaults {
    fn default() -> Self {
        CommanderDefaults {
            default_height: 2.0,
            default_velocity: 1.0,
        }
    }
}

/// On-disk layout. Durations are whole milliseconds.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigurationFile {
    simulator_host: Option<String>,
    connect_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    pool_size: Option<usize>,
    #[serde(default)]
    scales: ConversionScales,
    telemetry_log: Option<PathBuf>,
    #[serde(default)]
    disable_telemetry_log: bool,
    #[serde(default)]
    truncate_log_on_start: bool,
    #[serde(default)]
    commander: CommanderDefaults,
}

impl Configuration {
    /// Loads a configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| LinkError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Parses a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, LinkError> {
        let file: ConfigurationFile =
            toml::from_str(contents).map_err(|e| LinkError::Config(e.to_string()))?;

        let defaults = Configuration::default();
        let config = Configuration {
            simulator_host: file.simulator_host.unwrap_or(defaults.simulator_host),
            connect_timeout: file
                .connect_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            request_timeout: file
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            pool_size: file.pool_size.unwrap_or(defaults.pool_size),
            scales: file.scales,
            telemetry_log: if file.disable_telemetry_log {
                None
            } else {
                file.telemetry_log.or(defaults.telemetry_log)
            },
            truncate_log_on_start: file.truncate_log_on_start,
            commander: file.commander,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), LinkError> {
        if self.pool_size == 0 {
            return Err(LinkError::Config("pool_size must be at least 1".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(LinkError::Config("request_timeout_ms must be positive".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(LinkError::Config("connect_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

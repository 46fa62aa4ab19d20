//! Streamer configuration.
//!
//! Configuration is loaded from environment variables. The conference
//! password is redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Slot names used when `STREAMER_SLOT_NAMES` is unset.
pub const DEFAULT_SLOT_NAMES: [&str; 6] = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];

/// Upper bound on the number of on-screen slots.
pub const MAX_SLOT_COUNT: usize = 16;

/// Initial playback volume of every slot.
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Controller numbers at or above this value belong to the second fader bank.
pub const DEFAULT_MIDI_BANK_OFFSET: u8 = 8;

/// Display name the streamer uses inside the conference.
pub const DEFAULT_DISPLAY_NAME: &str = "Streamer";

/// Default instance ID prefix.
pub const DEFAULT_INSTANCE_ID_PREFIX: &str = "streamer";

/// Streamer configuration.
#[derive(Clone)]
pub struct Config {
    /// Initial slot names, lowercased, one entry per slot.
    pub slot_names: Vec<String>,

    /// Room joined automatically once the connection is established.
    pub room: Option<String>,

    /// Password for `room`.
    /// Protected by `SecretString` to prevent accidental logging.
    pub room_password: Option<SecretString>,

    /// Display name of the streamer itself (default: "Streamer").
    pub display_name: String,

    /// Location of the persisted slot-name table, if persistence is enabled.
    pub slot_names_file: Option<PathBuf>,

    /// Initial per-slot playback volume in [0, 1] (default: 0.7).
    pub default_volume: f32,

    /// MIDI controller bank offset (default: 8).
    pub midi_bank_offset: u8,

    /// Whether MIDI control-change messages are honored.
    pub midi_enabled: bool,

    /// Prometheus scrape listener address.
    pub metrics_bind_address: Option<SocketAddr>,

    /// Emit JSON-formatted logs.
    pub log_json: bool,

    /// Unique identifier for this streamer instance.
    pub instance_id: String,
}

/// Custom Debug implementation that redacts the room password.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("slot_names", &self.slot_names)
            .field("room", &self.room)
            .field(
                "room_password",
                &self.room_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("display_name", &self.display_name)
            .field("slot_names_file", &self.slot_names_file)
            .field("default_volume", &self.default_volume)
            .field("midi_bank_offset", &self.midi_bank_offset)
            .field("midi_enabled", &self.midi_enabled)
            .field("metrics_bind_address", &self.metrics_bind_address)
            .field("log_json", &self.log_json)
            .field("instance_id", &self.instance_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut slot_names: Vec<String> = match vars.get("STREAMER_SLOT_NAMES") {
            Some(raw) => raw.split(',').map(|s| s.trim().to_lowercase()).collect(),
            None => DEFAULT_SLOT_NAMES.iter().map(|s| (*s).to_string()).collect(),
        };

        if let Some(raw) = vars.get("STREAMER_SLOT_COUNT") {
            let count: usize = raw.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("STREAMER_SLOT_COUNT must be a number, got {raw}"))
            })?;
            if count < slot_names.len() {
                return Err(ConfigError::InvalidValue(format!(
                    "STREAMER_SLOT_COUNT ({count}) is smaller than the number of slot names ({})",
                    slot_names.len()
                )));
            }
            slot_names.resize(count, String::new());
        }

        if slot_names.is_empty() || slot_names.len() > MAX_SLOT_COUNT {
            return Err(ConfigError::InvalidValue(format!(
                "slot count must be between 1 and {MAX_SLOT_COUNT}, got {}",
                slot_names.len()
            )));
        }

        let room = vars.get("STREAMER_ROOM").filter(|r| !r.is_empty()).cloned();

        let room_password = vars
            .get("STREAMER_ROOM_PASSWORD")
            .filter(|p| !p.is_empty())
            .map(|p| SecretString::from(p.clone()));

        let display_name = vars
            .get("STREAMER_DISPLAY_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

        let slot_names_file = vars.get("STREAMER_SLOT_NAMES_FILE").map(PathBuf::from);

        let default_volume = match vars.get("STREAMER_DEFAULT_VOLUME") {
            Some(raw) => {
                let volume: f32 = raw.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!(
                        "STREAMER_DEFAULT_VOLUME must be a number, got {raw}"
                    ))
                })?;
                if !volume.is_finite() {
                    return Err(ConfigError::InvalidValue(format!(
                        "STREAMER_DEFAULT_VOLUME must be finite, got {raw}"
                    )));
                }
                volume.clamp(0.0, 1.0)
            }
            None => DEFAULT_VOLUME,
        };

        let midi_bank_offset = match vars.get("STREAMER_MIDI_BANK_OFFSET") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "STREAMER_MIDI_BANK_OFFSET must be 0-255, got {raw}"
                ))
            })?,
            None => DEFAULT_MIDI_BANK_OFFSET,
        };

        let midi_enabled = parse_bool(vars, "STREAMER_MIDI_ENABLED", true)?;
        let log_json = parse_bool(vars, "STREAMER_LOG_JSON", false)?;

        let metrics_bind_address = vars
            .get("STREAMER_METRICS_BIND_ADDRESS")
            .map(|raw| {
                raw.parse::<SocketAddr>().map_err(|_| {
                    ConfigError::InvalidValue(format!(
                        "STREAMER_METRICS_BIND_ADDRESS must be host:port, got {raw}"
                    ))
                })
            })
            .transpose()?;

        // Generate instance ID
        let instance_id = vars.get("STREAMER_INSTANCE_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_INSTANCE_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            slot_names,
            room,
            room_password,
            display_name,
            slot_names_file,
            default_volume,
            midi_bank_offset,
            midi_enabled,
            metrics_bind_address,
            log_json,
            instance_id,
        })
    }
}

fn parse_bool(
    vars: &HashMap<String, String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(v) if v == "false" || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue(format!(
            "{key} must be true or false, got {v}"
        ))),
    }
}

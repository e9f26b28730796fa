//! Runtime settings and well-known transport routes.
//!
//! `Settings` is deserialized from TOML (camelCase keys, every field
//! optional) and can be changed one key at a time at runtime through
//! `set_value`. Durations are expressed in seconds.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest accepted `postOpenPollWindow`.
pub const MAX_POLL_WINDOW: Duration = Duration::from_secs(3600);

use tether_contracts::{
    error::{TetherError, TetherResult},
    policy::{PolicyConfig, SelectionMode},
};

/// Every tunable of the command layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Log successful dispatches at info instead of debug.
    pub verbose: bool,
    /// Try the native buffer utility before the generic primitive.
    pub prefer_native_encoder: bool,
    /// Multiplier for the radius fallback when a container has no oriented box.
    pub container_search_radius_multiplier: f64,
    #[serde(with = "seconds")]
    pub post_open_poll_window: Duration,
    #[serde(with = "seconds")]
    pub poll_interval: Duration,
    #[serde(with = "seconds")]
    pub inter_pickup_delay: Duration,
    #[serde(with = "seconds")]
    pub open_cooldown: Duration,
    #[serde(with = "seconds")]
    pub pickup_cooldown: Duration,
    pub selection_policy: SelectionMode,
    pub rarity_threshold: String,
    pub whitelist: BTreeSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbose: false,
            prefer_native_encoder: true,
            container_search_radius_multiplier: 1.5,
            post_open_poll_window: Duration::from_secs(6),
            poll_interval: Duration::from_millis(250),
            inter_pickup_delay: Duration::from_millis(100),
            open_cooldown: Duration::from_secs(2),
            pickup_cooldown: Duration::from_secs(1),
            selection_policy: SelectionMode::All,
            rarity_threshold: "Rare".to_string(),
            whitelist: BTreeSet::new(),
        }
    }
}

impl Settings {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> TetherResult<Self> {
        let settings: Settings = toml::from_str(s).map_err(|e| TetherError::ConfigError {
            reason: format!("failed to parse settings TOML: {}", e),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// The policy snapshot a scan reads.
    pub fn policy_config(&self) -> PolicyConfig {
        PolicyConfig {
            mode: self.selection_policy,
            rarity_threshold: self.rarity_threshold.clone(),
            whitelist: self.whitelist.clone(),
        }
    }

    /// Set one key. Keys are accepted in camelCase or snake_case.
    ///
    /// Returns `ConfigError` for unknown keys, mistyped values, and values
    /// that fail validation. On error the settings are left unchanged.
    pub fn set_value(&mut self, key: &str, value: toml::Value) -> TetherResult<()> {
        let mut next = self.clone();
        let normalized: String = key
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "verbose" => next.verbose = as_bool(key, &value)?,
            "prefernativeencoder" => next.prefer_native_encoder = as_bool(key, &value)?,
            "containersearchradiusmultiplier" => {
                next.container_search_radius_multiplier = as_f64(key, &value)?
            }
            "postopenpollwindow" => next.post_open_poll_window = as_seconds(key, &value)?,
            "pollinterval" => next.poll_interval = as_seconds(key, &value)?,
            "interpickupdelay" => next.inter_pickup_delay = as_seconds(key, &value)?,
            "opencooldown" => next.open_cooldown = as_seconds(key, &value)?,
            "pickupcooldown" => next.pickup_cooldown = as_seconds(key, &value)?,
            "selectionpolicy" => {
                next.selection_policy = as_str(key, &value)?
                    .parse()
                    .map_err(|reason| TetherError::ConfigError { reason })?
            }
            "raritythreshold" => next.rarity_threshold = as_str(key, &value)?.to_string(),
            "whitelist" => next.whitelist = as_string_set(key, &value)?,
            _ => {
                return Err(TetherError::ConfigError {
                    reason: format!("unknown configuration key '{}'", key),
                })
            }
        }

        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Apply every entry of `overrides`. All-or-nothing.
    pub fn apply_overrides(&mut self, overrides: &toml::Table) -> TetherResult<()> {
        let mut next = self.clone();
        for (key, value) in overrides {
            next.set_value(key, value.clone())?;
        }
        *self = next;
        Ok(())
    }

    fn validate(&self) -> TetherResult<()> {
        let m = self.container_search_radius_multiplier;
        if !m.is_finite() || m < 0.0 {
            return Err(TetherError::ConfigError {
                reason: format!("containerSearchRadiusMultiplier must be a non-negative number, got {}", m),
            });
        }
        if self.post_open_poll_window > MAX_POLL_WINDOW {
            return Err(TetherError::ConfigError {
                reason: format!(
                    "postOpenPollWindow must be at most {} s, got {} s",
                    MAX_POLL_WINDOW.as_secs(),
                    self.post_open_poll_window.as_secs_f64()
                ),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(TetherError::ConfigError {
                reason: "pollInterval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn type_error(key: &str, expected: &str, value: &toml::Value) -> TetherError {
    TetherError::ConfigError {
        reason: format!("'{}' expects {}, got {}", key, expected, value.type_str()),
    }
}

fn as_bool(key: &str, value: &toml::Value) -> TetherResult<bool> {
    value.as_bool().ok_or_else(|| type_error(key, "a boolean", value))
}

fn as_f64(key: &str, value: &toml::Value) -> TetherResult<f64> {
    match value {
        toml::Value::Integer(i) => Ok(*i as f64),
        toml::Value::Float(f) => Ok(*f),
        other => Err(type_error(key, "a number", other)),
    }
}

fn as_seconds(key: &str, value: &toml::Value) -> TetherResult<Duration> {
    let secs = as_f64(key, value)?;
    Duration::try_from_secs_f64(secs).map_err(|_| TetherError::ConfigError {
        reason: format!("'{}' must be a finite, non-negative number of seconds, got {}", key, secs),
    })
}

fn as_str<'v>(key: &str, value: &'v toml::Value) -> TetherResult<&'v str> {
    value.as_str().ok_or_else(|| type_error(key, "a string", value))
}

/// Accepts an array of strings or a single comma-separated string.
fn as_string_set(key: &str, value: &toml::Value) -> TetherResult<BTreeSet<String>> {
    match value {
        toml::Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| as_str(key, item).map(str::to_string))
            .collect(),
        other => Err(type_error(key, "a list of strings", other)),
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

/// Where the dispatcher looks for transport endpoints, tier by tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Routes {
    /// Node holding named sub-channels (the structured handle).
    pub structured_path: Vec<String>,
    /// Sub-channel names tried on the structured handle, in order.
    pub structured_channels: Vec<String>,
    /// A single directly addressed channel.
    pub direct_path: Vec<String>,
    /// Locations searched for well-known channel names.
    pub search_roots: Vec<Vec<String>>,
    pub channel_names: Vec<String>,
    /// Names of channels accepting the generic request message.
    pub request_names: Vec<String>,
    /// Every channel below this node receives the last-resort broadcast.
    pub broadcast_root: Vec<String>,
}

impl Default for Routes {
    fn default() -> Self {
        fn path(segments: &[&str]) -> Vec<String> {
            segments.iter().map(|s| s.to_string()).collect()
        }
        Self {
            structured_path: path(&["Shared", "Net"]),
            structured_channels: path(&["Command", "Send"]),
            direct_path: path(&["Shared", "Remote"]),
            search_roots: vec![path(&["Shared"]), path(&["Shared", "Remotes"])],
            channel_names: path(&["RemoteEvent", "Remote", "Network", "Packet"]),
            request_names: path(&["Request", "RequestEvent", "ActionRequest"]),
            broadcast_root: path(&["Shared"]),
        }
    }
}

/// Borrow a stored path as the `&[&str]` form `WorldTree::lookup` takes.
pub(crate) fn segments(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

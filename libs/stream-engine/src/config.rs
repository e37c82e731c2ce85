use std::time::Duration;

use serde::Deserialize;

use stream_api::ReplayPreset;

use crate::error::EngineError;

/// Root configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Config file format version.
    #[serde(default)]
    pub version: String,

    /// Unfilled template shipped with the distribution; refused at startup.
    #[serde(default)]
    pub is_template: bool,

    pub event_stream: EventStreamConfig,

    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventStreamConfig {
    /// Name reported alongside every forwarded event batch.
    #[serde(default)]
    pub integration_name: String,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// OAuth token endpoint.
    #[serde(default)]
    pub token_url: String,
    pub user_pass: UserPassConfig,
}

/// Username/password flow parameters.
#[derive(Clone, Default, Deserialize)]
pub struct UserPassConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for UserPassConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPassConfig")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Subscription settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    /// Topic names, e.g. `/event/LoginEventStream`.
    #[serde(default)]
    pub topics: Vec<String>,

    /// Starting point for topics without a checkpoint.
    #[serde(default)]
    pub replay_preset: ReplayPreset,

    /// Base64 replay id; required iff `replay_preset = "custom"`.
    #[serde(default)]
    pub replay_id: Option<String>,

    /// Events requested per flow-control round.
    #[serde(default = "default_num_requested")]
    pub num_requested: u32,

    /// Capacity of the channel all workers feed into.
    #[serde(default = "default_fan_in_capacity")]
    pub fan_in_capacity: usize,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            replay_preset: ReplayPreset::default(),
            replay_id: None,
            num_requested: default_num_requested(),
            fan_in_capacity: default_fan_in_capacity(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

fn default_num_requested() -> u32 {
    1
}
fn default_fan_in_capacity() -> usize {
    1
}

/// Exponential backoff applied between failed stream segments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Randomize each delay by ±25%.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_jitter() -> bool {
    true
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.initial_delay_ms == 0 {
            return Err("initial_delay_ms must be positive".into());
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(format!(
                "max_delay_ms ({}) is below initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(format!("multiplier must be >= 1.0, got {}", self.multiplier));
        }
        Ok(())
    }
}

impl StreamConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }
}

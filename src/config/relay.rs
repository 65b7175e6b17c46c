//! Streaming relay limits

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Streaming relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Maximum wait for the next upstream unit, in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Maximum total duration of one relayed stream, in seconds
    #[serde(default = "default_max_stream_duration")]
    pub max_stream_duration_secs: u64,

    /// Capacity of the producer -> transport event channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl RelayConfig {
    /// Idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Maximum stream duration as Duration
    pub fn max_stream_duration(&self) -> Duration {
        Duration::from_secs(self.max_stream_duration_secs)
    }

    /// Validate relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.idle_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("relay.idle_timeout_secs"));
        }
        if self.max_stream_duration_secs < self.idle_timeout_secs {
            return Err(ValidationError::InvalidTimeout(
                "relay.max_stream_duration_secs must be >= relay.idle_timeout_secs",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            max_stream_duration_secs: default_max_stream_duration(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    120
}

fn default_max_stream_duration() -> u64 {
    900
}

fn default_channel_capacity() -> usize {
    32
}

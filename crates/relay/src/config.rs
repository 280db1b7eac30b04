use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound on a relayed call.
pub const DEFAULT_RELAY_TIMEOUT_MS: u64 = 8000;

/// Session-wide relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// How long a requester waits for the arbiter before reporting
    /// `PeerUnavailable`.
    pub relay_timeout_ms: u64,
    /// Emit events to every participant instead of the arbiter only.
    pub public_log: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relay_timeout_ms: DEFAULT_RELAY_TIMEOUT_MS,
            public_log: false,
        }
    }
}

impl RelayConfig {
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: RelayConfig = serde_json::from_str(r#"{"public_log": true}"#).unwrap();
        assert_eq!(cfg.relay_timeout_ms, 8000);
        assert!(cfg.public_log);
        assert_eq!(cfg.relay_timeout(), Duration::from_secs(8));
    }
}

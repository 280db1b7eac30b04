//! Notifications emitted after a mutation is logged.
//!
//! Broadcasting is fire-and-forget: a failed broadcast is logged and never
//! changes the outcome of the mutation that triggered it.

use serde::{Deserialize, Serialize};
use strike_ledger::{AuditEntry, StaminaSnapshot};
use tokio::sync::broadcast;

/// Who may see an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Public,
    ArbiterOnly,
}

impl Audience {
    pub fn from_public_log(public_log: bool) -> Self {
        if public_log {
            Audience::Public
        } else {
            Audience::ArbiterOnly
        }
    }
}

/// A logged mutation or undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StrikeEvent {
    #[serde(rename_all = "camelCase")]
    Applied {
        correlation_id: String,
        audience: Audience,
        entry: AuditEntry,
    },
    #[serde(rename_all = "camelCase")]
    Undone {
        correlation_id: String,
        audience: Audience,
        restored: StaminaSnapshot,
        entry: AuditEntry,
    },
}

impl StrikeEvent {
    pub fn correlation_id(&self) -> &str {
        match self {
            StrikeEvent::Applied { correlation_id, .. }
            | StrikeEvent::Undone { correlation_id, .. } => correlation_id,
        }
    }

    pub fn audience(&self) -> Audience {
        match self {
            StrikeEvent::Applied { audience, .. } | StrikeEvent::Undone { audience, .. } => {
                *audience
            }
        }
    }
}

/// Delivers events to interested parties.
pub trait EventBroadcaster: Send + Sync {
    fn broadcast(&self, event: StrikeEvent) -> Result<(), String>;
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBroadcaster;

impl EventBroadcaster for NullBroadcaster {
    fn broadcast(&self, _event: StrikeEvent) -> Result<(), String> {
        Ok(())
    }
}

/// Broadcaster backed by a `tokio::sync::broadcast` channel.
///
/// Sending with no live subscriber is reported as a failure.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<StrikeEvent>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StrikeEvent> {
        self.sender.subscribe()
    }
}

impl EventBroadcaster for ChannelBroadcaster {
    fn broadcast(&self, event: StrikeEvent) -> Result<(), String> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|e| format!("no subscribers for event {}", e.0.correlation_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strike_ledger::conformance::make_entry;

    fn applied() -> StrikeEvent {
        StrikeEvent::Applied {
            correlation_id: "damage-1-x".to_string(),
            audience: Audience::ArbiterOnly,
            entry: make_entry("damage-1-x", "goblin-1"),
        }
    }

    #[tokio::test]
    async fn channel_delivers_to_subscribers() {
        let b = ChannelBroadcaster::new(8);
        let mut rx = b.subscribe();
        b.broadcast(applied()).unwrap();
        let got = rx.recv().await.unwrap();
        assert_eq!(got.correlation_id(), "damage-1-x");
        assert_eq!(got.audience(), Audience::ArbiterOnly);
    }

    #[test]
    fn channel_without_subscribers_fails() {
        let b = ChannelBroadcaster::new(8);
        assert!(b.broadcast(applied()).is_err());
    }

    #[test]
    fn event_serializes_with_tag() {
        let json = serde_json::to_value(applied()).unwrap();
        assert_eq!(json["event"], "applied");
        assert_eq!(json["correlationId"], "damage-1-x");
        assert_eq!(json["audience"], "arbiter_only");
    }

    #[test]
    fn audience_follows_public_log() {
        assert_eq!(Audience::from_public_log(true), Audience::Public);
        assert_eq!(Audience::from_public_log(false), Audience::ArbiterOnly);
    }
}

//! Permission-mediated mutation relay.
//!
//! Requesters fire damage, healing, status and resource actions at shared
//! entities. Targets the requester owns are mutated locally; everything else
//! is forwarded to the single arbiter, who applies it with elevated
//! authority. Every mutation is clamped, persisted through the host, recorded
//! once in the audit log under its correlation id, and can be undone by the
//! arbiter.
//!
//! The entry points are [`RelayDispatcher::dispatch`] on the requester side
//! and [`ElevatedExecutor::apply`] / [`ElevatedExecutor::undo`] on the
//! arbiter side. Both share one [`Session`].

pub mod amount;
pub mod bounds;
pub mod config;
pub mod confirm;
pub mod dispatch;
pub mod elevated;
mod error;
pub mod events;
pub mod executor;
pub mod gate;
pub mod host;
pub mod memory;
pub mod peer;
pub mod request;
pub mod session;
pub mod snapshot;
pub mod stamp;
pub mod types;

pub use amount::Amount;
pub use config::RelayConfig;
pub use confirm::{
    CallbackConfirmation, ConfirmationChannel, FixedConfirmation, SelfTargetPrompt,
    StdinConfirmation,
};
pub use dispatch::{DispatchOutcome, RelayDispatcher, StrikeAction, TargetOutcome};
pub use elevated::ElevatedExecutor;
pub use error::RelayError;
pub use events::{Audience, ChannelBroadcaster, EventBroadcaster, NullBroadcaster, StrikeEvent};
pub use gate::Route;
pub use host::{DamageRule, EntityHost, StandardDamageRule, StatWrite};
pub use memory::MemoryHost;
pub use peer::{ArbiterPeer, InProcessPeer, OfflinePeer};
pub use request::{ApplyResult, MutationRequest, UndoRequest, UndoResult};
pub use session::{EntityLocks, Session};
pub use types::{
    ConditionInstance, ConditionSpec, Entity, EntityClass, Principal, ResourceKind, Role,
    Stamina, StatusDuration,
};

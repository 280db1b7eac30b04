//! Authorization gate: decides whether a requester may mutate a target
//! directly or must go through the arbiter.

use serde::Serialize;

use crate::error::RelayError;
use crate::types::{Entity, Principal};

/// How a mutation against one target will be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// The requester holds write authority; run the executors locally.
    Direct,
    /// Forward to the arbiter.
    Relay,
}

/// Route one target. The arbiter owns everything.
pub fn route(entity: &Entity, requester: &Principal) -> Route {
    if requester.is_arbiter() || entity.is_owned_by(&requester.id) {
        Route::Direct
    } else {
        Route::Relay
    }
}

/// Split targets into those the requester owns and those it does not,
/// preserving order within each half.
pub fn partition<'a>(
    targets: &'a [Entity],
    requester: &Principal,
) -> (Vec<&'a Entity>, Vec<&'a Entity>) {
    targets
        .iter()
        .partition(|e| route(e, requester) == Route::Direct)
}

/// First statement of every elevated handler.
pub fn require_arbiter(caller: &Principal) -> Result<(), RelayError> {
    if caller.is_arbiter() {
        Ok(())
    } else {
        Err(RelayError::unauthorized(format!(
            "'{}' is not the arbiter",
            caller.id
        )))
    }
}

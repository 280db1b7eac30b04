//! Wire shapes for the relay: the versioned mutation request and the
//! structured results every public operation returns.

use serde::{Deserialize, Serialize};
use strike_ledger::{MutationKind, StaminaSnapshot};

use crate::amount::Amount;
use crate::error::RelayError;
use crate::types::ConditionSpec;

/// Current request schema version.
pub const REQUEST_VERSION: u32 = 1;

/// One mutation against one target.
///
/// Every field is always present on the wire; optional ones are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRequest {
    pub version: u32,
    pub target_entity_id: String,
    pub kind: MutationKind,
    pub amount: Option<Amount>,
    pub damage_kind: String,
    pub ignored_immunities: Vec<String>,
    pub temporary: bool,
    pub condition: Option<ConditionSpec>,
    pub resource_kind: Option<String>,
    pub source_actor_id: Option<String>,
    pub source_actor_name: String,
    pub source_item_ref: Option<String>,
    pub source_player_name: String,
    pub correlation_id: String,
}

impl MutationRequest {
    /// A request with every optional field empty.
    pub fn new(kind: MutationKind, target_entity_id: &str, correlation_id: &str) -> Self {
        Self {
            version: REQUEST_VERSION,
            target_entity_id: target_entity_id.to_string(),
            kind,
            amount: None,
            damage_kind: "untyped".to_string(),
            ignored_immunities: Vec::new(),
            temporary: false,
            condition: None,
            resource_kind: None,
            source_actor_id: None,
            source_actor_name: String::new(),
            source_item_ref: None,
            source_player_name: String::new(),
            correlation_id: correlation_id.to_string(),
        }
    }

    /// Check the fields this request's kind needs are present.
    ///
    /// Amount coercion is left to the executors.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.version != REQUEST_VERSION {
            return Err(RelayError::invalid_request(format!(
                "unsupported request version {}",
                self.version
            )));
        }
        if self.target_entity_id.is_empty() {
            return Err(RelayError::invalid_request("targetEntityId is empty"));
        }
        if self.correlation_id.is_empty() {
            return Err(RelayError::invalid_request("correlationId is empty"));
        }
        match self.kind {
            MutationKind::ApplyStatus | MutationKind::RemoveStatus if self.condition.is_none() => {
                Err(RelayError::invalid_request(format!(
                    "{} requires a condition",
                    self.kind
                )))
            }
            MutationKind::ResourceGain if self.resource_kind.is_none() => Err(
                RelayError::invalid_request("resource_gain requires a resourceKind"),
            ),
            _ => Ok(()),
        }
    }
}

/// Undo one earlier mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoRequest {
    pub target_entity_id: String,
    /// Informational; the ledger's own snapshot is authoritative.
    #[serde(default)]
    pub before_snapshot: Option<StaminaSnapshot>,
    pub correlation_id: String,
}

/// Result of one apply, success or failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_applied: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healing_applied: Option<i64>,
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApplyResult {
    pub fn failure(correlation_id: &str, err: &RelayError) -> Self {
        Self {
            success: false,
            correlation_id: correlation_id.to_string(),
            error: Some(err.code().to_string()),
            message: Some(err.to_string()),
            ..Self::default()
        }
    }

    /// The taxonomy code, if this is a failure.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Result of one undo, success or failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_stamina: Option<StaminaSnapshot>,
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UndoResult {
    pub fn failure(correlation_id: &str, err: &RelayError) -> Self {
        Self {
            success: false,
            correlation_id: correlation_id.to_string(),
            error: Some(err.code().to_string()),
            message: Some(err.to_string()),
            ..Self::default()
        }
    }
}

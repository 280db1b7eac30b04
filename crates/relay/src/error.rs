use strike_ledger::LedgerError;

/// Errors raised anywhere in the relay.
///
/// Public operations never return these directly to a remote caller; they are
/// folded into a structured result whose `error` field is [`RelayError::code`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The caller may not perform this operation.
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// No entity with this id exists in the host.
    #[error("entity not found: {entity_id}")]
    EntityNotFound { entity_id: String },

    /// The amount was missing, not numeric, or not finite after parsing.
    #[error("invalid amount: {raw}")]
    InvalidAmount { raw: String },

    /// The resource kind is not one of the enumerated pools.
    #[error("unknown resource kind: {kind}")]
    UnknownResourceKind { kind: String },

    /// No matching status condition on the entity.
    #[error("status '{condition}' not found on entity {entity_id}")]
    StatusNotFound {
        entity_id: String,
        condition: String,
    },

    /// The arbiter could not be reached or did not answer in time.
    #[error("arbiter unavailable: {reason}")]
    PeerUnavailable { reason: String },

    /// The host failed to write an entity field.
    #[error("persistence error on entity {entity_id}: {message}")]
    Persistence { entity_id: String, message: String },

    /// The request is structurally wrong for its kind (missing condition,
    /// mismatched undo target, ...).
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The audit ledger rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl RelayError {
    /// Stable taxonomy code reported in structured results.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Unauthorized { .. } => "Unauthorized",
            RelayError::EntityNotFound { .. } => "EntityNotFound",
            RelayError::InvalidAmount { .. } => "InvalidAmount",
            RelayError::UnknownResourceKind { .. } => "UnknownResourceKind",
            RelayError::StatusNotFound { .. } => "StatusNotFound",
            RelayError::PeerUnavailable { .. } => "PeerUnavailable",
            RelayError::Persistence { .. } => "PersistenceError",
            RelayError::InvalidRequest { .. } => "InvalidRequest",
            RelayError::Ledger(LedgerError::EntryNotFound { .. }) => "EntryNotFound",
            RelayError::Ledger(LedgerError::AlreadyUndone { .. }) => "AlreadyUndone",
            RelayError::Ledger(LedgerError::DuplicateCorrelation { .. }) => "DuplicateCorrelation",
            RelayError::Ledger(LedgerError::Backend(_)) => "LedgerError",
        }
    }

    pub(crate) fn unauthorized(reason: impl Into<String>) -> Self {
        RelayError::Unauthorized {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        RelayError::InvalidRequest {
            message: message.into(),
        }
    }
}

//! Self-target confirmation gate.
//!
//! A damage batch that includes the requester's own character is held until
//! the requester confirms it. Cancelling aborts the whole batch; nothing is
//! dispatched. The wait has no timeout and no automatic answer.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use serde::Serialize;
use strike_ledger::MutationKind;

use crate::types::{Entity, Principal};

/// What the requester is asked to confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfTargetPrompt {
    pub requester_name: String,
    pub character_name: String,
    pub amount: i64,
    pub damage_kind: String,
}

/// A channel through which a self-targeting batch is put to the requester.
///
/// Implementations can be interactive (stdin) or programmatic (callback,
/// fixed answer).
#[async_trait]
pub trait ConfirmationChannel: Send + Sync {
    /// Wait for a yes/no decision. `true` proceeds with the batch.
    async fn confirm(&self, prompt: &SelfTargetPrompt) -> bool;
}

/// Build the prompt for a batch, or `None` if the gate does not apply.
///
/// Only damage batches are gated, and only when some target is the
/// requester's bound character.
pub fn self_target_prompt(
    kind: MutationKind,
    requester: &Principal,
    targets: &[Entity],
    amount: i64,
    damage_kind: &str,
) -> Option<SelfTargetPrompt> {
    if kind != MutationKind::Damage {
        return None;
    }
    let character = requester.character.as_deref()?;
    let own = targets.iter().find(|t| t.id == character)?;
    Some(SelfTargetPrompt {
        requester_name: requester.name.clone(),
        character_name: own.name.clone(),
        amount,
        damage_kind: damage_kind.to_string(),
    })
}

/// Always answers the same way. `--yes` / `--no` in the CLI.
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmation(pub bool);

#[async_trait]
impl ConfirmationChannel for FixedConfirmation {
    async fn confirm(&self, _prompt: &SelfTargetPrompt) -> bool {
        self.0
    }
}

type ConfirmCallback = Box<dyn Fn(&SelfTargetPrompt) -> bool + Send + Sync>;

/// Programmatic confirmation that delegates to a callback.
pub struct CallbackConfirmation {
    callback: ConfirmCallback,
}

impl CallbackConfirmation {
    pub fn new(callback: impl Fn(&SelfTargetPrompt) -> bool + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl ConfirmationChannel for CallbackConfirmation {
    async fn confirm(&self, prompt: &SelfTargetPrompt) -> bool {
        (self.callback)(prompt)
    }
}

/// Interactive terminal confirmation. Anything but `y`/`yes` cancels,
/// including end of input.
pub struct StdinConfirmation;

#[async_trait]
impl ConfirmationChannel for StdinConfirmation {
    async fn confirm(&self, prompt: &SelfTargetPrompt) -> bool {
        let stderr = io::stderr();
        let mut out = stderr.lock();
        let _ = write!(
            out,
            "{} is about to take {} {} damage. Apply to your own character? [y/N] ",
            prompt.character_name, prompt.amount, prompt.damage_kind
        );
        let _ = out.flush();

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input).is_err() {
            return false;
        }
        matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

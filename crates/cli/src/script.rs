//! Session scripts: the entities at the table, who is playing, and the
//! sequence of actions to run.

use std::path::Path;

use serde::Deserialize;
use strike_relay::{Entity, Principal, RelayConfig, StrikeAction};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScript {
    #[serde(default)]
    pub config: Option<RelayConfig>,
    #[serde(default = "default_arbiter")]
    pub arbiter: Principal,
    #[serde(default)]
    pub principals: Vec<Principal>,
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_arbiter() -> Principal {
    Principal::arbiter("gm", "Game Master")
}

/// One scripted step.
///
/// An `undo` value of `"last"` refers to the most recent successful target
/// outcome of the script.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Action {
        #[serde(rename = "as")]
        actor: String,
        action: StrikeAction,
    },
    Undo {
        #[serde(rename = "as", default)]
        actor: Option<String>,
        undo: String,
    },
    Arbiter {
        #[serde(rename = "arbiterOnline")]
        online: bool,
    },
}

impl SessionScript {
    /// Look up a principal by id. The arbiter is always known.
    pub fn principal(&self, id: &str) -> Option<&Principal> {
        if self.arbiter.id == id {
            return Some(&self.arbiter);
        }
        self.principals.iter().find(|p| p.id == id)
    }

    /// Check every step names a known principal.
    pub fn check_principals(&self) -> Result<(), String> {
        for (i, step) in self.steps.iter().enumerate() {
            let actor = match step {
                Step::Action { actor, .. } => Some(actor),
                Step::Undo { actor, .. } => actor.as_ref(),
                Step::Arbiter { .. } => None,
            };
            if let Some(id) = actor {
                if self.principal(id).is_none() {
                    return Err(format!("step {}: unknown principal '{}'", i + 1, id));
                }
            }
        }
        Ok(())
    }
}

pub fn load(path: &Path) -> Result<SessionScript, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|_| format!("error: session file not found: {}", path.display()))?;
    let script: SessionScript = serde_json::from_str(&text)
        .map_err(|e| format!("error: invalid session script {}: {}", path.display(), e))?;
    script
        .check_principals()
        .map_err(|e| format!("error: {}: {}", path.display(), e))?;
    Ok(script)
}

pub fn load_config(path: &Path) -> Result<RelayConfig, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|_| format!("error: config file not found: {}", path.display()))?;
    toml::from_str(&text).map_err(|e| format!("error: invalid config {}: {}", path.display(), e))
}

use serde::{Deserialize, Serialize};

/// Per-Action live state. Transitions are one-way and audited by the
/// engine's status publishes; see `engine.rs` in the application crate for
/// the driving logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionState {
    Idle,
    Running,
    Success,
    Error,
}

impl ActionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// `idle -> running` on an IF match.
    pub fn to_running(&self) -> Result<Self, &'static str> {
        match self {
            Self::Idle => Ok(Self::Running),
            _ => Err("can only start running from idle"),
        }
    }

    /// `running -> success` on a matched success branch, a branch-less THEN,
    /// or an unmatched result with no error branch defined.
    pub fn to_success(&self) -> Result<Self, &'static str> {
        match self {
            Self::Running => Ok(Self::Success),
            _ => Err("can only succeed from running"),
        }
    }

    /// `running -> error` on a matched error branch or a timeout with an
    /// error branch present.
    pub fn to_error(&self) -> Result<Self, &'static str> {
        match self {
            Self::Running => Ok(Self::Error),
            _ => Err("can only error from running"),
        }
    }

    /// `success|error -> idle`, always the final step of THEN execution.
    pub fn to_idle(&self) -> Self {
        Self::Idle
    }
}

impl Default for ActionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// The engine's per-Action live state: the current state, the raw payload
/// that last triggered it, and the scalar extracted from that payload for
/// comparisons. Kept separate so `$IF` substitution can use the raw form
/// while matching uses the extracted one.
#[derive(Debug, Clone, Default)]
pub struct ActionRuntime {
    pub state: ActionState,
    pub if_payload: Option<String>,
    pub if_extracted: Option<String>,
}

impl ActionRuntime {
    pub fn trigger(&mut self, raw_payload: String, extracted: String) {
        self.state = self
            .state
            .to_running()
            .expect("trigger is only called from idle");
        self.if_payload = Some(raw_payload);
        self.if_extracted = Some(extracted);
    }

    pub fn finish(&mut self, outcome: ActionState) {
        debug_assert!(matches!(outcome, ActionState::Success | ActionState::Error));
        self.state = outcome;
    }

    pub fn reset_to_idle(&mut self) {
        self.state = self.state.to_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(ActionState::default(), ActionState::Idle);
    }

    #[test]
    fn full_success_cycle() {
        let mut runtime = ActionRuntime::default();
        runtime.trigger("payload".into(), "S".into());
        assert_eq!(runtime.state, ActionState::Running);
        runtime.finish(ActionState::Success);
        assert_eq!(runtime.state, ActionState::Success);
        runtime.reset_to_idle();
        assert_eq!(runtime.state, ActionState::Idle);
    }

    #[test]
    fn cannot_trigger_while_running() {
        let running = ActionState::Running;
        assert!(running.to_running().is_err());
    }
}

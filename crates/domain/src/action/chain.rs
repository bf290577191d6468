use crate::device::Comparator;
use crate::device::TimeUnit;
use serde::{Deserialize, Serialize};

/// The IF node of an Action's chain. Always has `source == "io"` — the only
/// trigger kind the core currently supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfNode {
    pub device_id: i64,
    #[serde(default = "default_source")]
    pub source: String,
    pub topic: String,
    pub cmp: Comparator,
    #[serde(rename = "match")]
    pub match_value: serde_json::Value,
    #[serde(default)]
    pub poll_topic: Option<String>,
    #[serde(default)]
    pub poll_payload: Option<String>,
}

fn default_source() -> String {
    "io".to_string()
}

/// A literal THEN command value of `"$IF"` forwards the triggering IF
/// payload verbatim instead of the literal string.
pub const FORWARD_IF_PAYLOAD: &str = "$IF";

/// The THEN node of an Action's chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThenNode {
    pub device_id: i64,
    pub topic: String,
    pub command: String,
    #[serde(default)]
    pub ignore_input: bool,
    #[serde(default)]
    pub result_topic: Option<String>,
    #[serde(default)]
    pub result_payload: Option<serde_json::Value>,
    pub timeout: u64,
    pub timeout_unit: TimeUnit,
}

impl ThenNode {
    pub fn resolved_command(&self, if_payload: &str) -> String {
        if self.command == FORWARD_IF_PAYLOAD {
            if_payload.to_string()
        } else {
            self.command.clone()
        }
    }

    pub fn timeout_seconds(&self) -> f64 {
        self.timeout_unit.to_seconds(self.timeout as f64)
    }
}

/// Which side of the THEN/EVALUATE pair a branch node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    Success,
    Error,
}

impl BranchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// A success or error branch appended to an Action's chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchNode {
    pub branch: BranchKind,
    pub device_id: i64,
    pub topic: String,
    pub command: String,
    #[serde(default)]
    pub ignore_input: bool,
    #[serde(default)]
    pub result_topic: Option<String>,
    #[serde(default)]
    pub result_payload: Option<serde_json::Value>,
    pub cmp: Comparator,
    #[serde(rename = "match")]
    pub match_value: serde_json::Value,
    pub timeout: u64,
    pub timeout_unit: TimeUnit,
}

impl BranchNode {
    /// The topic awaited for this branch's match: its own `result_topic`
    /// when set, falling back to the command-publish `topic` otherwise.
    pub fn wait_topic(&self) -> &str {
        self.result_topic.as_deref().unwrap_or(&self.topic)
    }

    pub fn timeout_seconds(&self) -> f64 {
        self.timeout_unit.to_seconds(self.timeout as f64)
    }
}

/// Ordered list of nodes composing an Action: one IF, one THEN, and zero or
/// one of each branch kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionChain {
    pub if_node: IfNode,
    pub then_node: ThenNode,
    #[serde(default)]
    pub success_branch: Option<BranchNode>,
    #[serde(default)]
    pub error_branch: Option<BranchNode>,
}

impl ActionChain {
    pub fn has_branches(&self) -> bool {
        self.success_branch.is_some() || self.error_branch.is_some()
    }

    /// Minimum of the THEN timeout and any defined branch timeout, per the
    /// wait-timeout computation mandated for THEN execution.
    pub fn wait_timeout_seconds(&self) -> f64 {
        let mut candidates = vec![self.then_node.timeout_seconds()];
        if let Some(b) = &self.success_branch {
            candidates.push(b.timeout_seconds());
        }
        if let Some(b) = &self.error_branch {
            candidates.push(b.timeout_seconds());
        }
        candidates.into_iter().fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn then_node(timeout: u64) -> ThenNode {
        ThenNode {
            device_id: 1,
            topic: "relay/0/command".into(),
            command: "on".into(),
            ignore_input: false,
            result_topic: None,
            result_payload: None,
            timeout,
            timeout_unit: TimeUnit::Sec,
        }
    }

    #[test]
    fn forward_if_substitutes_raw_payload() {
        let then = ThenNode {
            command: FORWARD_IF_PAYLOAD.into(),
            ..then_node(5)
        };
        assert_eq!(then.resolved_command("S"), "S");
        assert_eq!(then_node(5).resolved_command("S"), "on");
    }

    #[test]
    fn wait_timeout_is_the_minimum_across_then_and_branches() {
        let chain = ActionChain {
            if_node: IfNode {
                device_id: 1,
                source: "io".into(),
                topic: "input_event/1".into(),
                cmp: Comparator::Eq,
                match_value: serde_json::json!("S"),
                poll_topic: None,
                poll_payload: None,
            },
            then_node: then_node(20),
            success_branch: Some(BranchNode {
                branch: BranchKind::Success,
                device_id: 1,
                topic: "file/created".into(),
                command: "".into(),
                ignore_input: false,
                result_topic: None,
                result_payload: None,
                cmp: Comparator::Eq,
                match_value: serde_json::json!("success"),
                timeout: 10,
                timeout_unit: TimeUnit::Sec,
            }),
            error_branch: None,
        };
        assert_eq!(chain.wait_timeout_seconds(), 10.0);
    }
}

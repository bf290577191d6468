use super::action::Action;
use std::collections::HashSet;

/// Derived set of trigger and result topics the Action Engine cares about,
/// rebuilt from the Action list whenever the rule set changes.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionIndex {
    trigger_topics: HashSet<String>,
    result_topics: HashSet<String>,
}

impl SubscriptionIndex {
    pub fn build(actions: &[Action], devices_fq_topic: impl Fn(i64, &str) -> Option<String>) -> Self {
        let mut trigger_topics = HashSet::new();
        let mut result_topics = HashSet::new();

        for action in actions {
            if !action.enabled {
                continue;
            }
            let chain = &action.chain;
            if let Some(fq) = devices_fq_topic(chain.if_node.device_id, &chain.if_node.topic) {
                trigger_topics.insert(fq);
            }
            if let Some(result_topic) = &chain.then_node.result_topic {
                if let Some(fq) = devices_fq_topic(chain.then_node.device_id, result_topic) {
                    result_topics.insert(fq);
                }
            }
            for branch in [&chain.success_branch, &chain.error_branch]
                .into_iter()
                .flatten()
            {
                if let Some(fq) = devices_fq_topic(branch.device_id, branch.wait_topic()) {
                    result_topics.insert(fq);
                }
            }
        }

        Self {
            trigger_topics,
            result_topics,
        }
    }

    pub fn is_trigger_topic(&self, topic: &str) -> bool {
        self.trigger_topics.contains(topic)
    }

    pub fn is_result_topic(&self, topic: &str) -> bool {
        self.result_topics.contains(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::chain::{ActionChain, BranchKind, BranchNode, IfNode, ThenNode};
    use crate::device::{Comparator, TimeUnit};

    fn sample_action() -> Action {
        Action {
            id: 1,
            name: "TurnOn".into(),
            description: "".into(),
            enabled: true,
            chain: ActionChain {
                if_node: IfNode {
                    device_id: 1,
                    source: "io".into(),
                    topic: "input_event/1".into(),
                    cmp: Comparator::Eq,
                    match_value: serde_json::json!("S"),
                    poll_topic: None,
                    poll_payload: None,
                },
                then_node: ThenNode {
                    device_id: 1,
                    topic: "relay/0/command".into(),
                    command: "on".into(),
                    ignore_input: false,
                    result_topic: Some("file/created".into()),
                    result_payload: None,
                    timeout: 20,
                    timeout_unit: TimeUnit::Sec,
                },
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
            },
        }
    }

    #[test]
    fn builds_trigger_and_result_sets_from_fq_topics() {
        let actions = vec![sample_action()];
        let index = SubscriptionIndex::build(&actions, |_device_id, topic| {
            Some(format!("shellies/sw1/{topic}"))
        });
        assert!(index.is_trigger_topic("shellies/sw1/input_event/1"));
        assert!(index.is_result_topic("shellies/sw1/file/created"));
        assert!(!index.is_trigger_topic("shellies/sw1/file/created"));
    }

    #[test]
    fn disabled_actions_are_excluded() {
        let mut action = sample_action();
        action.enabled = false;
        let index = SubscriptionIndex::build(&[action], |_id, topic| Some(topic.to_string()));
        assert!(!index.is_trigger_topic("input_event/1"));
    }
}

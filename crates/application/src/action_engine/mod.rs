mod pending_wait;

pub use pending_wait::{BranchWait, PendingWait, PendingWaits};

use crate::worker_pool::{BoundedQueue, QueueItem};
use domain::action::{Action, BranchKind, SubscriptionIndex};
use domain::device::{Comparator, Device, DeviceRepository};
use domain::{ActionRepository, ActionRuntime, ActionState, DomainError, DomainEvent, EventPublisher};
use infrastructure::MqttClient;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

const STATUS_DIGEST_INTERVAL: Duration = Duration::from_secs(30);
/// Beyond this multiple of the status interval with no heartbeat advance,
/// the watchdog treats the engine as stuck per spec.md §5.
const WATCHDOG_STALE_MULTIPLE: i64 = 2;

/// Immutable view of the enabled rule set plus the devices its chains
/// reference, rebuilt wholesale on every hot-reload. In-flight THEN
/// workers keep the snapshot they started with (captured as an `Arc`) so
/// a concurrent reload never mutates state out from under them.
struct Snapshot {
    actions: Vec<Action>,
    devices: HashMap<i64, Device>,
    index: SubscriptionIndex,
}

impl Snapshot {
    fn action(&self, id: i64) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }
}

/// Drives every enabled Action through its IF → THEN → {success|error}
/// state machine. Grounded on `controllers/actions_handler.py`'s
/// `ActionManager`.
pub struct ActionEngine {
    client: MqttClient,
    devices: Arc<dyn DeviceRepository>,
    actions_repo: Arc<dyn ActionRepository>,
    publisher: Arc<dyn EventPublisher>,
    snapshot: RwLock<Arc<Snapshot>>,
    runtimes: Mutex<HashMap<i64, ActionRuntime>>,
    pending: Arc<PendingWaits>,
    actions_queue: BoundedQueue,
    camera_queue: BoundedQueue,
    storage_queue: BoundedQueue,
    /// Unix millis of the last successful status digest tick; the watchdog
    /// treats a gap beyond `WATCHDOG_STALE_MULTIPLE` status intervals as a
    /// stuck engine.
    last_heartbeat: AtomicI64,
}

impl ActionEngine {
    pub fn new(
        client: MqttClient,
        devices: Arc<dyn DeviceRepository>,
        actions_repo: Arc<dyn ActionRepository>,
        publisher: Arc<dyn EventPublisher>,
        actions_queue: BoundedQueue,
        camera_queue: BoundedQueue,
        storage_queue: BoundedQueue,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            devices,
            actions_repo,
            publisher,
            snapshot: RwLock::new(Arc::new(Snapshot {
                actions: Vec::new(),
                devices: HashMap::new(),
                index: SubscriptionIndex::default(),
            })),
            runtimes: Mutex::new(HashMap::new()),
            pending: Arc::new(PendingWaits::default()),
            actions_queue,
            camera_queue,
            storage_queue,
            last_heartbeat: AtomicI64::new(chrono::Utc::now().timestamp_millis()),
        })
    }

    /// Initial load, identical in effect to a hot-reload from empty.
    pub async fn load(&self) -> anyhow::Result<()> {
        self.reload().await
    }

    /// Rebuilds the Action snapshot and swaps the pointer. Runtimes for
    /// Actions that no longer exist are dropped; everything else keeps its
    /// live state (including any in-flight pending-wait).
    pub async fn reload(&self) -> anyhow::Result<()> {
        let actions = self.actions_repo.find_enabled().await?;

        let mut device_ids = HashSet::new();
        for action in &actions {
            device_ids.insert(action.chain.if_node.device_id);
            device_ids.insert(action.chain.then_node.device_id);
            if let Some(b) = &action.chain.success_branch {
                device_ids.insert(b.device_id);
            }
            if let Some(b) = &action.chain.error_branch {
                device_ids.insert(b.device_id);
            }
        }
        let mut devices = HashMap::new();
        for id in device_ids {
            if let Some(device) = self.devices.find_by_id(id).await? {
                devices.insert(id, device);
            }
        }

        let index = SubscriptionIndex::build(&actions, |device_id, topic| {
            devices.get(&device_id).map(|d| d.fully_qualified_topic(topic))
        });

        let valid_ids: HashSet<i64> = actions.iter().map(|a| a.id).collect();
        {
            let mut runtimes = self.runtimes.lock().await;
            runtimes.retain(|id, _| valid_ids.contains(id));
        }

        *self.snapshot.write().await = Arc::new(Snapshot { actions, devices, index });
        info!("action engine reloaded");
        Ok(())
    }

    pub fn is_relevant(&self, topic: &str) -> bool {
        // Checked against the latest snapshot at call time; a brief race
        // during reload can only miss a topic for one in-flight message.
        let snapshot = self.snapshot.try_read();
        match snapshot {
            Ok(snap) => snap.index.is_trigger_topic(topic) || snap.index.is_result_topic(topic),
            Err(_) => true,
        }
    }

    /// Called by the bounded-queue worker pool for every relevant message.
    /// Wakes any pending branch wait, then checks idle Actions' IF nodes.
    pub async fn process(self: &Arc<Self>, item: QueueItem) -> anyhow::Result<()> {
        let raw = String::from_utf8_lossy(&item.payload).to_string();
        let extracted = extract_scalar(&raw);

        self.pending.wake_if_matches(&item.topic, &extracted).await;

        let snapshot = self.snapshot.read().await.clone();
        for action in &snapshot.actions {
            let Some(device) = snapshot.devices.get(&action.chain.if_node.device_id) else {
                continue;
            };
            let fq_if = device.fully_qualified_topic(&action.chain.if_node.topic);
            if fq_if != item.topic {
                continue;
            }

            let idle = {
                let runtimes = self.runtimes.lock().await;
                !matches!(runtimes.get(&action.id).map(|r| r.state), Some(ActionState::Running))
            };
            if !idle {
                continue;
            }

            let expected = json_scalar_to_string(&action.chain.if_node.match_value);
            if !compare(&extracted, &expected, action.chain.if_node.cmp) {
                continue;
            }

            info!(action_id = action.id, name = %action.name, "IF triggered");
            self.client
                .publish(
                    "actions/if/trigger",
                    &json!({"action_id": action.id, "topic": item.topic, "payload": extracted}).to_string(),
                    false,
                )
                .await
                .ok();

            let triggered = {
                let mut runtimes = self.runtimes.lock().await;
                let runtime = runtimes.entry(action.id).or_default();
                let still_idle = !matches!(runtime.state, ActionState::Running);
                if still_idle {
                    runtime.trigger(raw.clone(), extracted.clone());
                }
                still_idle
            };
            if !triggered {
                continue;
            }
            self.publish_state(action.id, ActionState::Running).await;

            let engine = self.clone();
            let action_id = action.id;
            let snapshot = snapshot.clone();
            tokio::spawn(async move {
                if let Err(e) = engine.execute_then(action_id, snapshot).await {
                    error!(action_id, "THEN execution failed: {e}");
                }
            });
        }
        Ok(())
    }

    async fn execute_then(self: Arc<Self>, action_id: i64, snapshot: Arc<Snapshot>) -> anyhow::Result<()> {
        let Some(action) = snapshot.action(action_id) else {
            return Ok(());
        };
        let then = &action.chain.then_node;

        let Some(device) = snapshot.devices.get(&then.device_id) else {
            warn!(action_id, "THEN device missing");
            self.publish_state(action_id, ActionState::Error).await;
            self.publish_state(action_id, ActionState::Idle).await;
            return Ok(());
        };

        let if_payload = self
            .runtimes
            .lock()
            .await
            .get(&action_id)
            .and_then(|r| r.if_payload.clone())
            .unwrap_or_default();
        let full_cmd_topic = device.fully_qualified_topic(&then.topic);
        let command = then.resolved_command(&if_payload);

        if !action.chain.has_branches() {
            self.client
                .publish(
                    "actions/then/command",
                    &json!({"action_id": action_id, "topic": full_cmd_topic, "command": command}).to_string(),
                    false,
                )
                .await
                .ok();
            self.client.publish(&full_cmd_topic, &command, false).await.ok();
            self.reinject(device.id, &full_cmd_topic, &command);
            self.publish_state(action_id, ActionState::Success).await;
            self.publish_state(action_id, ActionState::Idle).await;
            return Ok(());
        }

        let mut branches = HashMap::new();
        let mut success_rt = None;
        let mut error_rt = None;
        if let Some(b) = &action.chain.success_branch {
            if let Some(bd) = snapshot.devices.get(&b.device_id) {
                let topic = bd.fully_qualified_topic(b.wait_topic());
                success_rt = Some(topic.clone());
                branches.insert("success", BranchWait { topic, cmp: b.cmp, expected: json_scalar_to_string(&b.match_value) });
            }
        }
        if let Some(b) = &action.chain.error_branch {
            if let Some(bd) = snapshot.devices.get(&b.device_id) {
                let topic = bd.fully_qualified_topic(b.wait_topic());
                error_rt = Some(topic.clone());
                branches.insert("error", BranchWait { topic, cmp: b.cmp, expected: json_scalar_to_string(&b.match_value) });
            }
        }

        // Registering the wait before publishing the command closes the race
        // where a fast device reply arrives before anyone is listening for it.
        let notify = self.pending.register(action_id, branches).await;

        self.client
            .publish(
                "actions/then/command",
                &json!({"action_id": action_id, "topic": full_cmd_topic, "command": command}).to_string(),
                false,
            )
            .await
            .ok();
        self.client.publish(&full_cmd_topic, &command, false).await.ok();
        self.reinject(device.id, &full_cmd_topic, &command);

        let wait_secs = action.chain.wait_timeout_seconds().max(0.0);
        let _ = tokio::time::timeout(Duration::from_secs_f64(wait_secs), notify.notified()).await;

        let still_exists = self.snapshot.read().await.action(action_id).is_some();
        let pending = self.pending.take(action_id).await;
        if !still_exists {
            return Ok(());
        }

        let matched = pending.as_ref().and_then(|p| p.observed.clone());
        self.client
            .publish(
                "actions/then/result",
                &json!({
                    "action_id": action_id,
                    "result_topic": success_rt.or(error_rt).unwrap_or_default(),
                    "matched": matched.is_some(),
                    "payload": matched.as_ref().map(|(_, payload)| payload.clone()),
                })
                .to_string(),
                false,
            )
            .await
            .ok();

        let chosen = tie_break(
            action.chain.success_branch.is_some(),
            action.chain.error_branch.is_some(),
            pending.as_ref(),
        );

        if let Some(branch) = chosen {
            self.run_branch(action, branch, &snapshot, &if_payload).await;
            self.publish_state(action_id, branch_state(branch)).await;
        } else {
            self.publish_state(action_id, ActionState::Success).await;
        }
        self.publish_state(action_id, ActionState::Idle).await;
        Ok(())
    }

    async fn run_branch(&self, action: &Action, branch: BranchKind, snapshot: &Snapshot, if_payload: &str) {
        let node = match branch {
            BranchKind::Success => &action.chain.success_branch,
            BranchKind::Error => &action.chain.error_branch,
        };
        let Some(node) = node else { return };
        let Some(device) = snapshot.devices.get(&node.device_id) else {
            warn!(action_id = action.id, "branch device missing");
            return;
        };
        let full_cmd_topic = device.fully_qualified_topic(&node.topic);
        let command = if node.command == domain::action::FORWARD_IF_PAYLOAD {
            if_payload.to_string()
        } else {
            node.command.clone()
        };

        self.client
            .publish(
                &format!("actions/evaluate/{}/command", branch.as_str()),
                &json!({"action_id": action.id, "topic": full_cmd_topic, "command": command}).to_string(),
                false,
            )
            .await
            .ok();
        self.client.publish(&full_cmd_topic, &command, false).await.ok();
        self.reinject(device.id, &full_cmd_topic, &command);
    }

    /// Re-injects the engine's own published command into all three
    /// subsystem queues so sibling managers can react to it, closing the
    /// hidden cyclic dependency via message passing rather than a direct
    /// call between managers.
    fn reinject(&self, device_id: i64, topic: &str, command: &str) {
        let item = QueueItem { device_id, topic: topic.to_string(), payload: command.as_bytes().to_vec() };
        self.actions_queue.enqueue(item.clone());
        self.camera_queue.enqueue(item.clone());
        self.storage_queue.enqueue(item);
    }

    async fn publish_state(&self, action_id: i64, state: ActionState) {
        {
            let mut runtimes = self.runtimes.lock().await;
            let runtime = runtimes.entry(action_id).or_default();
            match state {
                // Running is already applied by `ActionRuntime::trigger`.
                ActionState::Running => {}
                ActionState::Success | ActionState::Error => runtime.finish(state),
                ActionState::Idle => runtime.reset_to_idle(),
            }
        }
        if let Err(e) = self.publisher.publish(DomainEvent::action_status_changed(action_id, state)).await {
            error!(action_id, "failed to publish action status: {e}");
        }
    }

    /// Every 30s, publishes a digest of every tracked Action's state on
    /// `actions/status`.
    pub async fn run_status_digest(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(STATUS_DIGEST_INTERVAL);
        loop {
            ticker.tick().await;
            let snapshot = self.snapshot.read().await.clone();
            let runtimes = self.runtimes.lock().await;
            let digest: Vec<_> = snapshot
                .actions
                .iter()
                .map(|a| {
                    json!({
                        "id": a.id,
                        "name": a.name,
                        "state": runtimes.get(&a.id).map(|r| r.state).unwrap_or_default().as_str(),
                    })
                })
                .collect();
            drop(runtimes);
            self.client.publish("actions/status", &json!(digest).to_string(), false).await.ok();
            self.last_heartbeat.store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
        }
    }

    /// Checks every status interval that the digest heartbeat is still
    /// advancing; beyond `WATCHDOG_STALE_MULTIPLE` missed intervals the
    /// engine is considered stuck and the process exits for the supervisor
    /// to restart, per spec.md §5's watchdog contract.
    pub async fn run_watchdog(self: Arc<Self>) {
        let stale_after_ms = STATUS_DIGEST_INTERVAL.as_millis() as i64 * WATCHDOG_STALE_MULTIPLE;
        let mut ticker = tokio::time::interval(STATUS_DIGEST_INTERVAL);
        loop {
            ticker.tick().await;
            let age_ms = chrono::Utc::now().timestamp_millis() - self.last_heartbeat.load(Ordering::Relaxed);
            if age_ms > stale_after_ms {
                let err = DomainError::Fatal(format!("status digest heartbeat stale for {age_ms}ms"));
                error!("{err}");
                std::process::exit(1);
            }
        }
    }
}

fn branch_state(branch: BranchKind) -> ActionState {
    match branch {
        BranchKind::Success => ActionState::Success,
        BranchKind::Error => ActionState::Error,
    }
}

/// `error` wins over `success` when both are observed (impossible in
/// practice since one message carries one topic, but matches the
/// original's precedence). When nothing matched, the timeout only resolves
/// to `error` when BOTH branches are defined; a lone error branch with no
/// success branch leaves the Action unresolved rather than firing.
fn tie_break(has_success: bool, has_error: bool, pending: Option<&PendingWait>) -> Option<BranchKind> {
    if let Some(pending) = pending {
        if let Some((topic, payload)) = &pending.observed {
            if let Some(err) = pending.branches.get("error") {
                if topic == &err.topic && compare(payload, &err.expected, err.cmp) {
                    return Some(BranchKind::Error);
                }
            }
            if let Some(succ) = pending.branches.get("success") {
                if topic == &succ.topic && compare(payload, &succ.expected, succ.cmp) {
                    return Some(BranchKind::Success);
                }
            }
        }
    }
    if has_success && has_error {
        Some(BranchKind::Error)
    } else {
        None
    }
}

/// JSON `event` field, else `ext`, else the whole value stringified, else
/// the raw string — in that priority order.
fn extract_scalar(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => {
            if let Some(v) = map.get("event") {
                return json_scalar_to_string(v);
            }
            if let Some(v) = map.get("ext") {
                return json_scalar_to_string(v);
            }
            serde_json::Value::Object(map).to_string()
        }
        Ok(other) => json_scalar_to_string(&other),
        Err(_) => raw.to_string(),
    }
}

fn json_scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric comparison when both sides parse as decimals, string comparison
/// otherwise.
fn compare(observed: &str, expected: &str, cmp: Comparator) -> bool {
    if let (Ok(a), Ok(b)) = (observed.parse::<f64>(), expected.parse::<f64>()) {
        return match cmp {
            Comparator::Eq => a == b,
            Comparator::Ne => a != b,
            Comparator::Lt => a < b,
            Comparator::Le => a <= b,
            Comparator::Gt => a > b,
            Comparator::Ge => a >= b,
        };
    }
    match cmp {
        Comparator::Eq => observed == expected,
        Comparator::Ne => observed != expected,
        Comparator::Lt => observed < expected,
        Comparator::Le => observed <= expected,
        Comparator::Gt => observed > expected,
        Comparator::Ge => observed >= expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_prefers_event_then_ext_then_whole_value() {
        assert_eq!(extract_scalar(r#"{"event":"S"}"#), "S");
        assert_eq!(extract_scalar(r#"{"ext":"jpg"}"#), "jpg");
        assert_eq!(extract_scalar(r#"{"other":1}"#), r#"{"other":1}"#);
        assert_eq!(extract_scalar("plain"), "plain");
    }

    #[test]
    fn compare_is_numeric_when_both_sides_parse() {
        assert!(compare("10", "9", Comparator::Gt));
        assert!(!compare("abc", "9", Comparator::Gt));
        assert!(compare("abc", "abc", Comparator::Eq));
    }

    #[test]
    fn tie_break_prefers_error_over_success_when_both_observed_match() {
        let mut branches = HashMap::new();
        branches.insert("error", BranchWait { topic: "t".into(), cmp: Comparator::Eq, expected: "x".into() });
        branches.insert("success", BranchWait { topic: "t".into(), cmp: Comparator::Eq, expected: "x".into() });
        let pending = PendingWait { notify: Arc::new(tokio::sync::Notify::new()), branches, observed: Some(("t".into(), "x".into())) };
        assert_eq!(tie_break(true, true, Some(&pending)), Some(BranchKind::Error));
    }

    #[test]
    fn tie_break_falls_back_to_error_when_unmatched_and_both_branches_exist() {
        assert_eq!(tie_break(true, true, None), Some(BranchKind::Error));
    }

    #[test]
    fn tie_break_picks_no_branch_when_only_success_branch_unmatched() {
        assert_eq!(tie_break(true, false, None), None);
    }

    #[test]
    fn tie_break_picks_no_branch_when_only_error_branch_unmatched() {
        assert_eq!(tie_break(false, true, None), None);
    }
}

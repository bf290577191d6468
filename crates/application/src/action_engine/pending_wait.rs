use domain::device::Comparator;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// One branch's wait spec: the fully-qualified result topic it listens on
/// and the comparator/value pair that decides whether an observed message
/// satisfies it.
#[derive(Debug, Clone)]
pub struct BranchWait {
    pub topic: String,
    pub cmp: Comparator,
    pub expected: String,
}

/// Per-Action wait record, registered before the THEN command is published
/// so a fast result can never race ahead of the registration. The ingress
/// side (the Action Engine's own queue consumer, here) signals `notify`
/// and stashes the observed value; the THEN worker is the only reader.
pub struct PendingWait {
    pub notify: Arc<Notify>,
    pub branches: HashMap<&'static str, BranchWait>,
    pub observed: Option<(String, String)>,
}

/// Map of `action_id -> PendingWait`, guarded by a single mutex. Mirrors
/// `ActionManager._pending` in the original.
#[derive(Default)]
pub struct PendingWaits {
    inner: Mutex<HashMap<i64, PendingWait>>,
}

impl PendingWaits {
    pub async fn register(
        &self,
        action_id: i64,
        branches: HashMap<&'static str, BranchWait>,
    ) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        let mut guard = self.inner.lock().await;
        guard.insert(
            action_id,
            PendingWait { notify: notify.clone(), branches, observed: None },
        );
        notify
    }

    /// Wakes every pending wait whose branch topic matches `topic`, storing
    /// the observed payload so the woken worker can read it back out.
    pub async fn wake_if_matches(&self, topic: &str, payload: &str) {
        let mut guard = self.inner.lock().await;
        for pending in guard.values_mut() {
            if pending.branches.values().any(|b| b.topic == topic) {
                pending.observed = Some((topic.to_string(), payload.to_string()));
                pending.notify.notify_one();
            }
        }
    }

    pub async fn take(&self, action_id: i64) -> Option<PendingWait> {
        self.inner.lock().await.remove(&action_id)
    }

    /// Drops a stale wait without examining it — used when an Action is
    /// deleted out from under an in-flight THEN.
    pub async fn discard(&self, action_id: i64) {
        self.inner.lock().await.remove(&action_id);
    }
}

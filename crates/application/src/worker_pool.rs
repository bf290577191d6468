use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Dequeue timeout for the consumer loop, mirroring the original's
/// `QueueConsumerMixin` blocking-with-timeout `queue.get`.
const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(1);

/// One fanned-out ingress message, tagged with the device it came from.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub device_id: i64,
    pub topic: String,
    pub payload: Vec<u8>,
}

/// A bounded, drop-newest-on-full FIFO. Enqueue never blocks: a full queue
/// logs a warning tagged with the subsystem and discards the item.
#[derive(Clone)]
pub struct BoundedQueue {
    tag: &'static str,
    tx: mpsc::Sender<QueueItem>,
}

impl BoundedQueue {
    pub fn new(tag: &'static str, capacity: usize) -> (Self, mpsc::Receiver<QueueItem>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tag, tx }, rx)
    }

    pub fn enqueue(&self, item: QueueItem) {
        if let Err(e) = self.tx.try_send(item) {
            warn!(subsystem = self.tag, "queue full, dropped message: {e}");
        }
    }
}

/// Generic consumer pattern shared by the Action Engine, Camera Manager and
/// Storage Manager: pull from the bounded queue, filter by relevance, hand
/// off to a fixed-size worker pool. Each worker wraps `process` so a panic
/// inside it never takes the consumer loop down with it.
///
/// Grounded on `QueueConsumerMixin` in the original: `_consumer_loop` +
/// `_safe_process`, reimplemented as a bounded-semaphore task pool instead
/// of a thread pool.
pub fn spawn_consumer<F, Fut>(
    tag: &'static str,
    mut rx: mpsc::Receiver<QueueItem>,
    workers: usize,
    is_relevant: impl Fn(&str) -> bool + Send + Sync + 'static,
    process: F,
) where
    F: Fn(QueueItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let process = Arc::new(process);
    let semaphore = Arc::new(Semaphore::new(workers));

    tokio::spawn(async move {
        loop {
            let item = match tokio::time::timeout(DEQUEUE_TIMEOUT, rx.recv()).await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(_) => continue,
            };

            if !is_relevant(&item.topic) {
                debug!(subsystem = tag, topic = %item.topic, "drop");
                continue;
            }

            let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
            let process = process.clone();
            let topic = item.topic.clone();
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = process(item).await {
                    error!(subsystem = tag, topic = %topic, "exception while processing: {e}");
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_drops_silently_when_queue_is_full() {
        let (queue, mut rx) = BoundedQueue::new("test", 1);
        queue.enqueue(QueueItem { device_id: 1, topic: "a".into(), payload: vec![] });
        queue.enqueue(QueueItem { device_id: 1, topic: "b".into(), payload: vec![] });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.topic, "a");
    }

    #[tokio::test]
    async fn consumer_skips_irrelevant_topics() {
        let (queue, rx) = BoundedQueue::new("test", 4);
        let (done_tx, mut done_rx) = mpsc::channel(4);

        spawn_consumer(
            "test",
            rx,
            2,
            |topic: &str| topic.ends_with("/keep"),
            move |item: QueueItem| {
                let done_tx = done_tx.clone();
                async move {
                    done_tx.send(item.topic).await.unwrap();
                    Ok(())
                }
            },
        );

        queue.enqueue(QueueItem { device_id: 1, topic: "x/drop".into(), payload: vec![] });
        queue.enqueue(QueueItem { device_id: 1, topic: "x/keep".into(), payload: vec![] });

        let received = done_rx.recv().await.unwrap();
        assert_eq!(received, "x/keep");
        assert!(done_rx.try_recv().is_err());
    }
}

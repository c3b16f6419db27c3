use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

// ExpiryScheduler runs one-shot pickup-window timers, one per Ready hold.
// A fired timer delivers the hold id on the channel returned by new(); the
// dispatcher owning the receiver routes it into the engine's expiry handler.
// Cancelling a timer that already fired is not an error; the expiry handler
// is idempotent and that check is the actual safety net.
#[derive(Clone)]
pub struct ExpiryScheduler {
    fired_tx: mpsc::UnboundedSender<String>,
    pending: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl ExpiryScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            fired_tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
        };
        (scheduler, fired_rx)
    }

    // schedules a one-shot timer for the hold, replacing any earlier timer
    pub fn schedule(&self, hold_id: &str, fire_in: Duration) {
        let id = hold_id.to_string();
        let fired_tx = self.fired_tx.clone();
        let pending = self.pending.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(fire_in).await;
            if let Ok(mut pending) = pending.lock() {
                pending.remove(task_id.as_str());
            }
            if fired_tx.send(task_id.to_string()).is_err() {
                warn!("expiry dispatcher gone, timer for hold {} dropped", task_id);
            }
        });
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(old) = pending.insert(id, handle) {
                old.abort();
            }
        }
    }

    // aborts a pending timer; returns false when none was pending
    pub fn cancel(&self, hold_id: &str) -> bool {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.remove(hold_id) {
                handle.abort();
                return true;
            }
        }
        false
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use crate::scheduler::timer::ExpiryScheduler;

    #[tokio::test]
    async fn test_should_fire_timer() {
        let (scheduler, mut fired_rx) = ExpiryScheduler::new();
        scheduler.schedule("hold1", Duration::from_millis(10));
        assert_eq!(1, scheduler.pending_count());
        let fired = tokio::time::timeout(Duration::from_secs(2), fired_rx.recv())
            .await.expect("timer should fire").expect("channel should stay open");
        assert_eq!("hold1", fired.as_str());
        assert_eq!(0, scheduler.pending_count());
    }

    #[tokio::test]
    async fn test_should_cancel_timer() {
        let (scheduler, mut fired_rx) = ExpiryScheduler::new();
        scheduler.schedule("hold1", Duration::from_millis(50));
        assert!(scheduler.cancel("hold1"));
        assert!(!scheduler.cancel("hold1"));
        let fired = tokio::time::timeout(Duration::from_millis(200), fired_rx.recv()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn test_should_replace_timer_for_same_hold() {
        let (scheduler, mut fired_rx) = ExpiryScheduler::new();
        scheduler.schedule("hold1", Duration::from_secs(60));
        scheduler.schedule("hold1", Duration::from_millis(10));
        assert_eq!(1, scheduler.pending_count());
        let fired = tokio::time::timeout(Duration::from_secs(2), fired_rx.recv())
            .await.expect("timer should fire").expect("channel should stay open");
        assert_eq!("hold1", fired.as_str());
    }
}

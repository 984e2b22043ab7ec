use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative cancellation shared by the scheduler and its stages.
///
/// Triggering is idempotent; every listener observes it.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        ShutdownSignal { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener { rx: self.tx.subscribe() }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage-side view of a [`ShutdownSignal`].
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is triggered, or when every signal is gone.
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_listeners_observe_trigger() {
        let signal = ShutdownSignal::new();
        let mut a = signal.listener();
        let b = signal.listener();
        assert!(!a.is_shutdown());

        let waiter = tokio::spawn(async move {
            a.cancelled().await;
        });
        signal.trigger();
        signal.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(b.is_shutdown());
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn test_late_listener_sees_earlier_trigger() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        let mut late = signal.listener();
        late.cancelled().await;
        assert!(late.is_shutdown());
    }
}

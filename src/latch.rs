use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// One-shot countdown latch. Waiters are released once the count reaches zero.
#[derive(Debug)]
pub struct CountDownLatch {
    count: watch::Sender<usize>,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        let (count, _) = watch::channel(count);
        Self { count }
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Saturates at zero.
    pub fn count_down(&self) {
        self.count.send_modify(|n| *n = n.saturating_sub(1));
    }

    pub async fn wait(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Returns false if the timeout elapsed first.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }

    /// Guard that counts down when dropped, including on unwind.
    pub fn guard(self: &Arc<Self>) -> CountDownGuard {
        CountDownGuard {
            latch: Arc::clone(self),
        }
    }
}

pub struct CountDownGuard {
    latch: Arc<CountDownLatch>,
}

impl Drop for CountDownGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}

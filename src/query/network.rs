//! Online/offline state and the gate that holds mutations while offline.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

pub struct NetworkStatus {
    online: watch::Sender<bool>,
    paused: AtomicUsize,
}

impl NetworkStatus {
    pub fn new(online: bool) -> Self {
        let (online, _) = watch::channel(online);
        Self {
            online,
            paused: AtomicUsize::new(0),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Sets the state and returns the previous one. Going online releases every waiter.
    pub fn set_online(&self, online: bool) -> bool {
        self.online.send_replace(online)
    }

    /// Number of operations currently held by [`wait_until_online`](Self::wait_until_online).
    pub fn paused(&self) -> usize {
        self.paused.load(Ordering::SeqCst)
    }

    /// Resolves immediately when online, otherwise once the state flips back to online.
    pub async fn wait_until_online(&self) {
        let mut rx = self.online.subscribe();
        if *rx.borrow_and_update() {
            return;
        }

        let _guard = PausedGuard::new(&self.paused);
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|online| *online).await;
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Keeps the paused counter right even when the waiting future is dropped.
struct PausedGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> PausedGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for PausedGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

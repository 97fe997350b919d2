//! Token-expiry broadcasting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Broadcasts a token-expired signal raised on any 401 response.
///
/// The auth-refresh flow subscribes once at startup; repeated 401s do not
/// re-send once the episode is already flagged, so the user is prompted to
/// re-authenticate exactly once per expiry.
#[derive(Debug, Clone)]
pub struct TokenExpiryNotice {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    flagged: AtomicBool,
    tx: watch::Sender<bool>,
}

impl TokenExpiryNotice {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                flagged: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Flag the current token as expired. Idempotent within an episode.
    pub fn notify_expired(&self) {
        if !self.inner.flagged.swap(true, Ordering::SeqCst) {
            let _ = self.inner.tx.send(true);
        }
    }

    /// Whether the current episode has been flagged.
    pub fn is_expired(&self) -> bool {
        self.inner.flagged.load(Ordering::SeqCst)
    }

    /// Subscribe to expiry notifications.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.tx.subscribe()
    }

    /// Clear the flag after a successful token refresh, re-arming the
    /// broadcaster for the next expiry episode.
    pub fn reset(&self) {
        self.inner.flagged.store(false, Ordering::SeqCst);
        let _ = self.inner.tx.send(false);
    }
}

impl Default for TokenExpiryNotice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notifies_exactly_once_per_episode() {
        let notice = TokenExpiryNotice::new();
        let mut rx = notice.subscribe();
        assert!(!*rx.borrow());

        notice.notify_expired();
        notice.notify_expired();
        notice.notify_expired();

        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
        assert!(notice.is_expired());
        // No second change pending after repeated 401s
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn reset_rearms_the_broadcaster() {
        let notice = TokenExpiryNotice::new();
        notice.notify_expired();
        notice.reset();
        assert!(!notice.is_expired());

        let mut rx = notice.subscribe();
        notice.notify_expired();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }
}

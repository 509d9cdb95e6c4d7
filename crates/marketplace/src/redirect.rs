//! Delayed post-install navigation.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    tokio_util::sync::{CancellationToken, DropGuard},
    tracing::{debug, info},
};

/// Host navigation capability. The marketplace never routes by itself.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// A navigation scheduled to fire after a fixed display delay.
///
/// Dropping the task cancels it, so discarding whatever owns it can never
/// navigate away from a stale view.
pub struct RedirectTask {
    url: String,
    token: CancellationToken,
    _guard: DropGuard,
    waiter: RedirectWaiter,
}

/// Resolves once a [`RedirectTask`] has navigated or been cancelled. Waiting
/// never takes the task away from its owner, which can still cancel it.
#[derive(Clone)]
pub struct RedirectWaiter {
    done: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl RedirectWaiter {
    /// Returns whether the navigation fired.
    pub async fn wait(&self) -> bool {
        self.done.cancelled().await;
        self.fired.load(Ordering::SeqCst)
    }
}

impl RedirectTask {
    pub fn schedule(navigator: Arc<dyn Navigator>, url: String, delay: Duration) -> Self {
        let token = CancellationToken::new();
        let waiter = RedirectWaiter {
            done: CancellationToken::new(),
            fired: Arc::new(AtomicBool::new(false)),
        };

        let cancelled = token.clone();
        let done = waiter.clone();
        let target = url.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancelled.cancelled() => {
                    debug!(url = %target, "redirect cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    info!(url = %target, "redirecting");
                    navigator.navigate(&target);
                    done.fired.store(true, Ordering::SeqCst);
                }
            }
            done.done.cancel();
        });
        debug!(%url, ?delay, "redirect scheduled");

        Self {
            url,
            _guard: token.clone().drop_guard(),
            token,
            waiter,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn waiter(&self) -> RedirectWaiter {
        self.waiter.clone()
    }
}

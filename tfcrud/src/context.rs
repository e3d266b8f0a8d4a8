//! Context implementation for request-scoped data and cancellation
//!
//! A Context travels with one host call. It carries a request id used to
//! correlate log lines, an optional deadline, and a cancellation signal the
//! controller races every backend call against.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;
use uuid::Uuid;

/// Context carries request-scoped values like cancellation signals and timeouts
/// Pass this as first parameter to every async resource method
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    request_id: Uuid,
    deadline: Option<Instant>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                request_id: Uuid::new_v4(),
                deadline: None,
                done_tx,
            }),
        }
    }

    /// A child context that cancels itself once `timeout` has elapsed.
    /// It keeps the parent's request id, never outlives the parent's
    /// deadline and is cancelled along with the parent. Must be called from
    /// within a tokio runtime.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now() + timeout;
        let deadline = self.inner.deadline.map_or(own, |parent| parent.min(own));
        let (done_tx, _) = watch::channel(self.is_cancelled());
        let ctx = Self {
            inner: Arc::new(ContextInner {
                request_id: self.inner.request_id,
                deadline: Some(deadline),
                done_tx,
            }),
        };

        let weak: Weak<ContextInner> = Arc::downgrade(&ctx.inner);
        let parent = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = parent.cancelled() => {}
            }
            if let Some(inner) = weak.upgrade() {
                inner.done_tx.send_replace(true);
            }
        });

        ctx
    }

    pub fn request_id(&self) -> Uuid {
        self.inner.request_id
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done_tx.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Returns a channel that flips to `true` when work done on behalf of
    /// this context should stop
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done_tx.subscribe()
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn cancelled(&self) {
        let mut done = self.done();
        // the sender lives as long as self, so this only returns on cancel
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    pub fn cancel(&self) {
        self.inner.done_tx.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.inner.request_id)
            .field("deadline", &self.inner.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));

        assert!(!ctx.is_cancelled());
        assert!(ctx.deadline().is_some());

        sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_cancel_signals_done() {
        let ctx = Context::new();
        let mut done = ctx.done();

        assert!(!*done.borrow());

        ctx.cancel();

        done.changed().await.unwrap();
        assert!(*done.borrow());
    }

    #[tokio::test]
    async fn cancelled_resolves_for_clones() {
        let ctx = Context::new();
        let clone = ctx.clone();

        let waiter = tokio::spawn(async move { clone.cancelled().await });
        ctx.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation should wake the waiter")
            .unwrap();
    }

    #[test]
    fn each_context_has_its_own_request_id() {
        assert_ne!(Context::new().request_id(), Context::new().request_id());
    }

    #[tokio::test]
    async fn timeout_child_follows_parent() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(60));

        assert_eq!(child.request_id(), parent.request_id());
        assert!(!child.is_cancelled());

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .expect("parent cancellation should reach the child");
    }

    #[tokio::test]
    async fn timeout_child_does_not_cancel_parent() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_millis(20));

        sleep(Duration::from_millis(60)).await;

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn timeout_child_keeps_earlier_parent_deadline() {
        let parent = Context::new().with_timeout(Duration::from_millis(50));
        let child = parent.with_timeout(Duration::from_secs(60));

        assert_eq!(child.deadline(), parent.deadline());
    }
}

//! Single-flight lazy initialization for async resources.
//!
//! [`LazyResource`] holds one slot that is `Empty`, `Pending` (a shared
//! construction future) or `Ready`. The first caller installs the pending
//! future under a lock; every caller that arrives while it is pending awaits
//! the same future, so construction runs at most once at a time and all of
//! its waiters see the same outcome.
//!
//! Failures are not cached: the slot goes back to `Empty` and the next caller
//! starts a fresh attempt. A panic inside the construction future counts as a
//! failure ([`InitPanicked`]). A pending attempt whose waiters were all
//! dropped stays installed and is picked up by the next caller.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::error;

type PendingInit<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// The construction future panicked instead of returning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resource construction panicked: {message}")]
pub struct InitPanicked {
    pub message: String,
}

impl InitPanicked {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "unknown panic payload".to_string()
        };
        Self { message }
    }
}

/// Observable state of a [`LazyResource`] slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Pending,
    Ready,
}

enum Slot<T, E>
where
    T: Clone,
    E: Clone,
{
    Empty,
    Pending {
        attempt: u64,
        future: PendingInit<T, E>,
    },
    Ready(T),
}

pub struct LazyResource<T, E>
where
    T: Clone,
    E: Clone,
{
    slot: Mutex<Slot<T, E>>,
    attempts: AtomicU64,
}

impl<T, E> Default for LazyResource<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> LazyResource<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            attempts: AtomicU64::new(0),
        }
    }

    /// Return the resource, running `init` to build it if the slot is empty.
    ///
    /// `init` is only called when no attempt is in flight. It is called with
    /// the slot lock held, so it must just return the future; the actual work
    /// belongs inside that future.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: From<InitPanicked>,
    {
        let (attempt, pending) = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Ready(value) => return Ok(value.clone()),
                Slot::Pending { attempt, future } => (*attempt, future.clone()),
                Slot::Empty => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    // A panic must not reach `Shared`, which would poison
                    // the slot for every later caller.
                    let pending = AssertUnwindSafe(init())
                        .catch_unwind()
                        .map(|outcome| {
                            outcome.unwrap_or_else(|payload| {
                                let panicked = InitPanicked::from_payload(payload);
                                error!(panic = %panicked.message, "Resource construction panicked");
                                Err(E::from(panicked))
                            })
                        })
                        .boxed()
                        .shared();
                    *slot = Slot::Pending {
                        attempt,
                        future: pending.clone(),
                    };
                    (attempt, pending)
                }
            }
        };

        let result = pending.await;

        // Only the attempt we waited on may settle the slot; a newer attempt
        // may already be installed after an earlier failure.
        let mut slot = self.slot.lock();
        let settles = matches!(&*slot, Slot::Pending { attempt: current, .. } if *current == attempt);
        if settles {
            *slot = match &result {
                Ok(value) => Slot::Ready(value.clone()),
                Err(_) => Slot::Empty,
            };
        }

        result
    }

    /// The resource if it has already been built.
    pub fn get(&self) -> Option<T> {
        match &*self.slot.lock() {
            Slot::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn state(&self) -> SlotState {
        match &*self.slot.lock() {
            Slot::Empty => SlotState::Empty,
            Slot::Pending { .. } => SlotState::Pending,
            Slot::Ready(_) => SlotState::Ready,
        }
    }

    /// Number of construction attempts started.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Debug)]
    struct Handle(usize);

    impl From<InitPanicked> for String {
        fn from(panicked: InitPanicked) -> Self {
            panicked.to_string()
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_construct_once() {
        let lazy: Arc<LazyResource<Arc<Handle>, String>> = Arc::new(LazyResource::new());
        let constructions = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let lazy = Arc::clone(&lazy);
            let constructions = Arc::clone(&constructions);
            tasks.push(tokio::spawn(async move {
                lazy.get_or_try_init(move || async move {
                    let n = constructions.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(Arc::new(Handle(n)))
                })
                .await
            }));
        }

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap().unwrap());
        }

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert_eq!(lazy.attempts(), 1);
        let first = &handles[0];
        assert_eq!(first.0, 0);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, first)));
        assert_eq!(lazy.state(), SlotState::Ready);
    }

    #[tokio::test]
    async fn test_ready_value_is_reused_without_calling_init() {
        let lazy: LazyResource<Arc<Handle>, String> = LazyResource::new();
        let first = lazy
            .get_or_try_init(|| async { Ok(Arc::new(Handle(7))) })
            .await
            .unwrap();

        let second = lazy
            .get_or_try_init(|| async { Err("init must not run once ready".to_string()) })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&lazy.get().unwrap(), &first));
        assert_eq!(lazy.attempts(), 1);
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter_then_resets() {
        let lazy: Arc<LazyResource<Arc<Handle>, String>> = Arc::new(LazyResource::new());
        let release = Arc::new(Notify::new());

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let lazy = Arc::clone(&lazy);
            let release = Arc::clone(&release);
            tasks.push(tokio::spawn(async move {
                lazy.get_or_try_init(move || async move {
                    release.notified().await;
                    Err::<Arc<Handle>, _>("backend unreachable".to_string())
                })
                .await
            }));
        }

        // Let every task attach to the pending attempt before it resolves.
        while lazy.state() != SlotState::Pending {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        release.notify_one();

        for task in tasks {
            let err = task.await.unwrap().unwrap_err();
            assert_eq!(err, "backend unreachable");
        }
        assert_eq!(lazy.attempts(), 1);
        assert_eq!(lazy.state(), SlotState::Empty);
        assert!(lazy.get().is_none());

        let value = lazy
            .get_or_try_init(|| async { Ok(Arc::new(Handle(2))) })
            .await
            .unwrap();
        assert_eq!(value.0, 2);
        assert_eq!(lazy.attempts(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_attempt_is_resumed_not_restarted() {
        let lazy: LazyResource<Arc<Handle>, String> = LazyResource::new();
        let release = Arc::new(Notify::new());
        let constructions = Arc::new(AtomicUsize::new(0));

        {
            let release = Arc::clone(&release);
            let constructions = Arc::clone(&constructions);
            let abandoned = lazy.get_or_try_init(move || async move {
                constructions.fetch_add(1, Ordering::SeqCst);
                release.notified().await;
                Ok(Arc::new(Handle(1)))
            });
            let timed_out = tokio::time::timeout(Duration::from_millis(10), abandoned).await;
            assert!(timed_out.is_err());
        }
        assert_eq!(lazy.state(), SlotState::Pending);

        release.notify_one();
        let value = lazy
            .get_or_try_init(|| async { Ok(Arc::new(Handle(99))) })
            .await
            .unwrap();

        assert_eq!(value.0, 1);
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert_eq!(lazy.attempts(), 1);
    }

    #[tokio::test]
    async fn test_panicking_attempt_resets_slot_for_retry() {
        let lazy: LazyResource<Arc<Handle>, String> = LazyResource::new();

        let err = lazy
            .get_or_try_init(|| async {
                if std::hint::black_box(true) {
                    panic!("construction blew up");
                }
                Ok(Arc::new(Handle(0)))
            })
            .await
            .unwrap_err();
        assert_eq!(err, "resource construction panicked: construction blew up");
        assert_eq!(lazy.state(), SlotState::Empty);

        let value = lazy
            .get_or_try_init(|| async { Ok(Arc::new(Handle(3))) })
            .await
            .unwrap();
        assert_eq!(value.0, 3);
        assert_eq!(lazy.attempts(), 2);
        assert_eq!(lazy.state(), SlotState::Ready);
    }

    #[test]
    fn test_panic_payload_message_is_kept() {
        let owned = InitPanicked::from_payload(Box::new(format!("code {}", 7)));
        assert_eq!(owned.message, "code 7");
        let unknown = InitPanicked::from_payload(Box::new(42_u8));
        assert_eq!(unknown.message, "unknown panic payload");
    }

    #[test]
    fn test_second_caller_attaches_to_pending_attempt() {
        use tokio_test::{assert_pending, assert_ready_ok, task};

        let lazy: LazyResource<Arc<Handle>, String> = LazyResource::new();
        let release = Arc::new(Notify::new());

        let waiting = Arc::clone(&release);
        let mut first = task::spawn(lazy.get_or_try_init(move || async move {
            waiting.notified().await;
            Ok(Arc::new(Handle(1)))
        }));
        assert_pending!(first.poll());
        assert_eq!(lazy.state(), SlotState::Pending);

        let mut second = task::spawn(lazy.get_or_try_init(|| async { Ok(Arc::new(Handle(2))) }));
        assert_pending!(second.poll());

        release.notify_one();
        let from_second = assert_ready_ok!(second.poll());
        let from_first = assert_ready_ok!(first.poll());

        assert_eq!(from_second.0, 1);
        assert!(Arc::ptr_eq(&from_first, &from_second));
        assert_eq!(lazy.attempts(), 1);
    }

    #[test]
    fn test_new_slot_is_empty() {
        let lazy: LazyResource<u32, String> = LazyResource::default();
        assert_eq!(lazy.state(), SlotState::Empty);
        assert_eq!(lazy.attempts(), 0);
        assert!(lazy.get().is_none());
    }
}

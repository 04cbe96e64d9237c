//! # Deferred Handles
//!
//! Every network operation returns a [`Deferred`]. The request itself is
//! spawned onto the Tokio runtime the moment the operation is called, so it
//! completes (and updates local state) whether or not anyone awaits the
//! handle. The handle is for the caller: register `done` / `fail` / `always`
//! continuations and `.await` it to get the `Result`.
//!
//! Continuations registered before the outcome is known run on the request's
//! task as soon as it settles. Continuations registered afterwards run
//! immediately. Awaiting is never required for them to fire.
//!
//! ```rust
//! use simple_store::{Deferred, StoreError};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let failed = Arc::new(AtomicBool::new(false));
//!     let flag = failed.clone();
//!
//!     let result = Deferred::<()>::rejected(StoreError::Validation("name is required".into()))
//!         .done(|_| unreachable!())
//!         .fail(move |_| flag.store(true, Ordering::SeqCst))
//!         .await;
//!
//!     assert!(result.is_err());
//!     assert!(failed.load(Ordering::SeqCst));
//! }
//! ```

use crate::error::StoreError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::future::{Future, IntoFuture};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Continuation<T> = Box<dyn FnOnce(&Result<T, StoreError>) + Send>;

struct Shared<T> {
    settled: Option<Result<T, StoreError>>,
    pending: Vec<Continuation<T>>,
}

/// A pending or settled outcome with continuation registration.
///
/// Continuations run exactly once each, in registration order.
#[must_use = "dropping a Deferred discards its outcome"]
pub struct Deferred<T> {
    shared: Arc<Mutex<Shared<T>>>,
    task: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Deferred<T> {
    /// Spawn `future` now and return a handle to its outcome.
    ///
    /// Outside a Tokio runtime nothing is spawned and the handle is rejected
    /// with [`StoreError::Task`].
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, StoreError>> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            return Self::rejected(StoreError::Task("no Tokio runtime".to_string()));
        };

        let shared = Arc::new(Mutex::new(Shared {
            settled: None,
            pending: Vec::new(),
        }));
        let state = shared.clone();
        let task = runtime.spawn(async move {
            let result = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(StoreError::Task(panic_message(panic.as_ref()))),
            };
            settle(&state, result);
        });

        Self {
            shared,
            task: Some(task),
        }
    }

    /// An already successful outcome.
    pub fn resolved(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// An already failed outcome. No request is involved.
    pub fn rejected(error: StoreError) -> Self {
        Self::settled(Err(error))
    }

    fn settled(result: Result<T, StoreError>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                settled: Some(result),
                pending: Vec::new(),
            })),
            task: None,
        }
    }

    /// Whether the outcome is known.
    pub fn is_settled(&self) -> bool {
        lock(&self.shared).settled.is_some()
    }

    /// Run `f` with the value if the outcome is a success.
    pub fn done(self, f: impl FnOnce(&T) + Send + 'static) -> Self {
        self.register(Box::new(move |result| {
            if let Ok(value) = result {
                f(value);
            }
        }))
    }

    /// Run `f` with the error if the outcome is a failure.
    pub fn fail(self, f: impl FnOnce(&StoreError) + Send + 'static) -> Self {
        self.register(Box::new(move |result| {
            if let Err(error) = result {
                f(error);
            }
        }))
    }

    /// Run `f` once the outcome is known, either way.
    pub fn always(self, f: impl FnOnce() + Send + 'static) -> Self {
        self.register(Box::new(move |_| f()))
    }

    fn register(self, continuation: Continuation<T>) -> Self {
        {
            let mut state = lock(&self.shared);
            if let Some(result) = state.settled.as_ref() {
                // The task is finished with the shared state once it settled.
                continuation(result);
            } else {
                state.pending.push(continuation);
            }
        }
        self
    }
}

/// Runs every pending continuation, then publishes the result.
///
/// Continuations run outside the lock. Anything registered meanwhile is
/// picked up by the next round, so none is left behind.
fn settle<T>(shared: &Mutex<Shared<T>>, result: Result<T, StoreError>) {
    loop {
        let pending = {
            let mut state = lock(shared);
            if state.pending.is_empty() {
                state.settled = Some(result);
                return;
            }
            std::mem::take(&mut state.pending)
        };
        for continuation in pending {
            continuation(&result);
        }
    }
}

fn lock<T>(shared: &Mutex<Shared<T>>) -> MutexGuard<'_, Shared<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "request task panicked".to_string())
}

impl<T: Send + 'static> IntoFuture for Deferred<T> {
    type Output = Result<T, StoreError>;
    type IntoFuture = BoxFuture<'static, Result<T, StoreError>>;

    fn into_future(self) -> Self::IntoFuture {
        let Deferred { shared, task } = self;

        Box::pin(async move {
            if let Some(task) = task {
                if let Err(e) = task.await {
                    return Err(StoreError::Task(e.to_string()));
                }
            }
            let settled = lock(&shared).settled.take();
            settled.unwrap_or_else(|| Err(StoreError::Task("outcome already taken".to_string())))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_continuations_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (log.clone(), log.clone());

        let value = Deferred::resolved(7)
            .done(move |v| a.lock().unwrap().push(format!("done {v}")))
            .fail(|_| panic!("must not fail"))
            .always(move || b.lock().unwrap().push("always".to_string()))
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(*log.lock().unwrap(), vec!["done 7", "always"]);
    }

    #[tokio::test]
    async fn test_spawned_work_runs_without_await() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = Deferred::spawn(async move {
            let _ = tx.send(());
            Ok(())
        });
        drop(handle);

        // The spawned task still completes.
        rx.await.unwrap();
    }

    #[tokio::test]
    async fn test_continuation_fires_without_await() {
        let (release, gate) = tokio::sync::oneshot::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let handle = Deferred::spawn(async move {
            let _ = gate.await;
            Ok(5)
        })
        .done(move |v| {
            assert_eq!(*v, 5);
            flag.store(true, Ordering::SeqCst);
        });
        assert!(!handle.is_settled());

        release.send(()).unwrap();
        for _ in 0..50 {
            if fired.load(Ordering::SeqCst) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(fired.load(Ordering::SeqCst));
        assert!(handle.is_settled());
    }

    #[tokio::test]
    async fn test_late_registration_runs_immediately() {
        let handle = Deferred::spawn(async { Ok("ready") });
        for _ in 0..50 {
            if handle.is_settled() {
                break;
            }
            tokio::task::yield_now().await;
        }

        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = handle.always(move || flag.store(true, Ordering::SeqCst));
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(handle.await, Ok("ready"));
    }

    #[tokio::test]
    async fn test_panicking_task_surfaces_as_task_error() {
        let failed = Arc::new(AtomicBool::new(false));
        let flag = failed.clone();
        let result = Deferred::<()>::spawn(async {
            if true {
                panic!("boom");
            }
            Ok(())
        })
        .fail(move |e| flag.store(matches!(e, StoreError::Task(m) if m == "boom"), Ordering::SeqCst))
        .await;
        assert!(matches!(result, Err(StoreError::Task(_))));
        assert!(failed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_spawn_outside_runtime_is_rejected() {
        let rejected = Arc::new(AtomicBool::new(false));
        let flag = rejected.clone();
        let handle = Deferred::spawn(async { Ok(()) })
            .fail(move |_| flag.store(true, Ordering::SeqCst));
        assert!(handle.is_settled());
        assert!(rejected.load(Ordering::SeqCst));
    }
}

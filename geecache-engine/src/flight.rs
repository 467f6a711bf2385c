//! # Single-Flight Request Coalescing
//!
//! Deduplicates concurrent loads for the same key so that a cache miss
//! under fan-in triggers exactly one loader/peer call; every concurrent
//! caller for that key observes the same result.
//!
//! This is an async reimagining of the `sync.WaitGroup`-based
//! `singleflight.Do` this crate's read path is modeled on, with one
//! departure forced by the move to `tokio`: the leader's future runs on
//! its own detached task rather than inline inside whichever caller
//! happened to arrive first. If that caller is itself dropped or
//! aborted (a client disconnect, a `tokio::time::timeout` wrapped around
//! `Group::get`), the load must keep running for any other caller still
//! waiting on the same key — cancelling one waiter must not cancel the
//! shared load.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use geecache_common::{ByteView, GeecacheError, GeecacheResult};

struct Call {
    notify: Notify,
    result: std::sync::Mutex<Option<GeecacheResult<ByteView>>>,
}

/// Coalesces concurrent calls for the same key into a single in-flight
/// future.
#[derive(Default)]
pub struct SingleFlight {
    calls: Arc<Mutex<HashMap<String, Arc<Call>>>>,
}

impl SingleFlight {
    /// Creates an empty coalescer.
    pub fn new() -> Self {
        SingleFlight {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs `fut` for `key` on a detached task, or if a call for `key`
    /// is already in flight, waits for that call's result instead of
    /// running `fut` again.
    ///
    /// `fut` is spawned rather than polled inline: dropping the future
    /// `do_call` returns only detaches this particular caller, it never
    /// cancels the underlying load, so every other waiter on the same
    /// key still observes its result. If `fut` panics, every waiter
    /// (including the one whose call spawned it) observes
    /// [`GeecacheError::LoaderPanicked`] rather than hanging or the panic
    /// propagating across the coalescing boundary.
    pub async fn do_call<F>(&self, key: &str, fut: F) -> GeecacheResult<ByteView>
    where
        F: Future<Output = GeecacheResult<ByteView>> + Send + 'static,
    {
        let (call, is_leader) = {
            let mut calls = self.calls.lock();
            if let Some(existing) = calls.get(key) {
                (existing.clone(), false)
            } else {
                let call = Arc::new(Call {
                    notify: Notify::new(),
                    result: std::sync::Mutex::new(None),
                });
                calls.insert(key.to_string(), call.clone());
                (call, true)
            }
        };

        if is_leader {
            let calls = self.calls.clone();
            let owned_key = key.to_string();
            let task_call = call.clone();
            tokio::spawn(async move {
                // The inner spawn gives a panic in `fut` a task boundary
                // to be caught at, so the outer task still gets to record
                // a result and notify waiters instead of the panic
                // unwinding straight through this closure.
                let result = match tokio::spawn(fut).await {
                    Ok(result) => result,
                    Err(_join_err) => Err(GeecacheError::LoaderPanicked),
                };
                *task_call.result.lock().expect("call mutex poisoned") = Some(result);
                calls.lock().remove(&owned_key);
                task_call.notify.notify_waiters();
            });
        }

        // The `Notified` future is created before checking whether the
        // result is already in, matching tokio's documented pattern for
        // avoiding a lost wakeup raced against a concurrent
        // `notify_waiters` call.
        let notified = call.notify.notified();
        if let Some(result) = call.result.lock().expect("call mutex poisoned").clone() {
            return result;
        }
        notified.await;
        call.result
            .lock()
            .expect("call mutex poisoned")
            .clone()
            .expect("result set before notify")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_for_same_key_share_one_load() {
        let flight = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = flight.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .do_call("k", async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(ByteView::copy_from(b"v"))
                    })
                    .await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.as_bytes(), b"v");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn key_is_not_stuck_in_flight_after_completion() {
        let flight = SingleFlight::new();
        flight
            .do_call("k", async { Ok(ByteView::copy_from(b"1")) })
            .await
            .unwrap();
        assert!(flight.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn loader_error_is_propagated_to_all_waiters() {
        let flight = Arc::new(SingleFlight::new());
        let a = {
            let flight = flight.clone();
            tokio::spawn(async move {
                flight
                    .do_call("k", async {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Err(GeecacheError::Loader("boom".to_string()))
                    })
                    .await
            })
        };
        let b = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.do_call("k", async { unreachable!() }).await })
        };

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(a.await.unwrap().is_err());
        assert!(b.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn dropping_the_leader_caller_does_not_cancel_the_shared_load() {
        let flight = Arc::new(SingleFlight::new());
        let started = Arc::new(Notify::new());
        let done = Arc::new(AtomicUsize::new(0));

        let leader_started = started.clone();
        let leader_done = done.clone();
        let leader = tokio::spawn({
            let flight = flight.clone();
            async move {
                flight
                    .do_call("k", async move {
                        leader_started.notify_one();
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        leader_done.fetch_add(1, Ordering::SeqCst);
                        Ok(ByteView::copy_from(b"v"))
                    })
                    .await
            }
        });

        started.notified().await;
        // Abort the task driving the leader's own `do_call` future. The
        // load it kicked off runs on a detached task, so it must still
        // finish and hand its result to the follower below.
        leader.abort();
        let _ = leader.await;

        let follower = flight.do_call("k", async { unreachable!() }).await;
        assert_eq!(follower.unwrap().as_bytes(), b"v");
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}

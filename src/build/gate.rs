//! Build readiness gate
//!
//! Tracks whether the latest build result may be served. While a rebuild is in
//! flight, callers park a continuation; the continuations are released on a
//! later runtime turn after the next completion, and only if no invalidation
//! arrived in between.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::{BuildObserver, BuildResult};
use crate::error::BuildError;
use crate::logger;

/// Resumes a parked request (or external waiter) once a build result exists
pub type Continuation = Box<dyn FnOnce(Arc<BuildResult>) + Send>;

#[derive(Default)]
struct BuildState {
    valid: bool,
    latest: Option<Arc<BuildResult>>,
    /// FIFO of parked continuations
    pending: Vec<Continuation>,
}

/// Shared readiness gate, cheap to clone
#[derive(Clone)]
pub struct BuildGate {
    state: Arc<Mutex<BuildState>>,
    runtime: Handle,
}

impl BuildGate {
    /// Create a gate in the invalid state. Drains are spawned on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            state: Arc::new(Mutex::new(BuildState::default())),
            runtime,
        }
    }

    fn state(&self) -> MutexGuard<'_, BuildState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_valid(&self) -> bool {
        self.state().valid
    }

    /// Latest build result, if the gate is currently valid
    pub fn latest(&self) -> Option<Arc<BuildResult>> {
        self.state().latest.clone()
    }

    /// Number of parked continuations
    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    /// A rebuild started: stop serving the previous result.
    ///
    /// Parked continuations stay queued for the next completion.
    pub fn invalidated(&self) {
        let was_valid = {
            let mut state = self.state();
            let was_valid = state.valid;
            state.valid = false;
            state.latest = None;
            was_valid
        };
        if was_valid {
            logger::log_compilation_starting();
        }
    }

    /// A build finished: store the result and schedule the drain.
    pub fn completed(&self, result: BuildResult) {
        {
            let mut state = self.state();
            state.valid = true;
            state.latest = Some(Arc::new(result));
        }

        let gate = self.clone();
        self.runtime.spawn(async move {
            gate.drain();
        });
    }

    /// Run `continuation` now if valid, otherwise park it until the next
    /// completion that is still valid when its drain runs.
    pub fn wait_until_valid<F>(&self, name: Option<&str>, continuation: F)
    where
        F: FnOnce(Arc<BuildResult>) + Send + 'static,
    {
        let mut state = self.state();
        if state.valid {
            if let Some(result) = state.latest.clone() {
                drop(state);
                continuation(result);
                return;
            }
        }
        state.pending.push(Box::new(continuation));
        drop(state);

        logger::log_wait_until_valid(name);
    }

    /// Async form of [`wait_until_valid`](Self::wait_until_valid).
    ///
    /// Fails only if the gate is dropped with the request still parked.
    pub async fn ready(&self, name: Option<&str>) -> Result<Arc<BuildResult>, BuildError> {
        let (tx, rx) = oneshot::channel();
        self.wait_until_valid(name, move |result| {
            // Receiver gone means the request was abandoned
            let _ = tx.send(result);
        });
        rx.await.map_err(|_| BuildError::Closed)
    }

    /// Deferred step scheduled by `completed`
    fn drain(&self) {
        let (result, callbacks) = {
            let mut state = self.state();
            if !state.valid {
                return;
            }
            let Some(result) = state.latest.clone() else {
                return;
            };
            (result, std::mem::take(&mut state.pending))
        };

        logger::log_compilation_finished();

        for callback in callbacks {
            callback(Arc::clone(&result));
        }
    }
}

impl BuildObserver for BuildGate {
    fn on_invalidated(&self) {
        self.invalidated();
    }

    fn on_completed(&self, result: BuildResult) {
        self.completed(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::UnitOutput;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn result(hash: &str) -> BuildResult {
        BuildResult::new(vec![UnitOutput {
            name: None,
            hash: hash.to_string(),
            output_path: "/dist".into(),
            public_path: None,
        }])
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Continuation) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let make = move |label: &'static str| -> Continuation {
            let log = Arc::clone(&log_clone);
            Box::new(move |r: Arc<BuildResult>| {
                log.lock().unwrap().push(format!("{label}:{}", r.units[0].hash));
            })
        };
        (log, make)
    }

    #[tokio::test]
    async fn test_starts_invalid() {
        let gate = BuildGate::new(Handle::current());
        assert!(!gate.is_valid());
        assert!(gate.latest().is_none());
    }

    #[tokio::test]
    async fn test_wait_while_valid_runs_synchronously() {
        let gate = BuildGate::new(Handle::current());
        gate.completed(result("a"));
        settle().await;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        gate.wait_until_valid(None, move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_parked_until_completion_and_deferred() {
        let gate = BuildGate::new(Handle::current());
        let (log, make) = recorder();

        gate.wait_until_valid(Some("/bundle.js"), make("first"));
        gate.wait_until_valid(None, make("second"));
        assert_eq!(gate.pending_len(), 2);

        gate.completed(result("a"));
        // Drain is deferred to a later turn
        assert!(log.lock().unwrap().is_empty());

        settle().await;
        assert_eq!(*log.lock().unwrap(), vec!["first:a", "second:a"]);
        assert_eq!(gate.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_invalidation_before_drain_keeps_queue() {
        let gate = BuildGate::new(Handle::current());
        let (log, make) = recorder();

        gate.wait_until_valid(None, make("req"));
        gate.completed(result("stale"));
        gate.invalidated();
        settle().await;

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(gate.pending_len(), 1);

        gate.completed(result("fresh"));
        settle().await;
        assert_eq!(*log.lock().unwrap(), vec!["req:fresh"]);
    }

    #[tokio::test]
    async fn test_second_invalidation_is_idempotent() {
        let gate = BuildGate::new(Handle::current());
        let (log, make) = recorder();

        gate.wait_until_valid(None, make("req"));
        gate.invalidated();
        gate.invalidated();
        assert_eq!(gate.pending_len(), 1);

        gate.completed(result("b"));
        settle().await;
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_continuation_registering_another() {
        let gate = BuildGate::new(Handle::current());
        let inner_calls = Arc::new(AtomicUsize::new(0));

        let gate_clone = gate.clone();
        let inner = Arc::clone(&inner_calls);
        gate.wait_until_valid(None, move |_| {
            let inner = Arc::clone(&inner);
            gate_clone.wait_until_valid(None, move |_| {
                inner.fetch_add(1, Ordering::SeqCst);
            });
        });

        gate.completed(result("a"));
        settle().await;

        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_ready_resolves_after_completion() {
        let gate = BuildGate::new(Handle::current());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.ready(Some("/index.html")).await })
        };
        settle().await;
        assert_eq!(gate.pending_len(), 1);

        gate.invalidated();
        gate.completed(result("c"));

        let resolved = waiter.await.unwrap().unwrap();
        assert_eq!(resolved.units[0].hash, "c");
    }
}

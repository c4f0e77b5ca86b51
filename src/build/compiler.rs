//! Compiler stand-in for already-built output
//!
//! `PrebuiltCompiler` treats configured directories as the build output of an
//! external tool. Every (re)build is a no-op that reports the same units with
//! a fresh build hash, which is enough to drive the gate through a full
//! invalidate/complete cycle (for example on `SIGHUP`).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;

use super::{BuildObserver, BuildResult, Compiler, UnitOutput, Watching};
use crate::config::OutputConfig;
use crate::error::BuildError;
use crate::logger;

/// Configured unit, before a build assigns its hash
#[derive(Debug, Clone)]
struct UnitTemplate {
    name: Option<String>,
    output_path: PathBuf,
    public_path: Option<String>,
}

pub struct PrebuiltCompiler {
    units: Vec<UnitTemplate>,
    runtime: Handle,
}

impl PrebuiltCompiler {
    pub fn new(outputs: &[OutputConfig], runtime: Handle) -> Self {
        let units = outputs
            .iter()
            .map(|o| UnitTemplate {
                name: o.name.clone(),
                output_path: PathBuf::from(&o.path),
                public_path: o.public_path.clone(),
            })
            .collect();
        Self { units, runtime }
    }
}

impl Compiler for PrebuiltCompiler {
    fn watch(&self, observer: Arc<dyn BuildObserver>) -> Result<Box<dyn Watching>, BuildError> {
        if self.units.is_empty() {
            return Err(BuildError::Watch("no output directories configured".to_string()));
        }

        let session = Arc::new(WatchSession {
            observer,
            units: self.units.clone(),
            builds: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            runtime: self.runtime.clone(),
        });
        session.rebuild();

        Ok(Box::new(PrebuiltWatching { session }))
    }
}

struct WatchSession {
    observer: Arc<dyn BuildObserver>,
    units: Vec<UnitTemplate>,
    builds: AtomicU64,
    closed: AtomicBool,
    runtime: Handle,
}

impl WatchSession {
    /// Emit `invalidated` now and `completed` on a later runtime turn
    fn rebuild(self: &Arc<Self>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.observer.on_invalidated();

        let session = Arc::clone(self);
        self.runtime.spawn(async move {
            if session.closed.load(Ordering::SeqCst) {
                return;
            }
            let build = session.builds.fetch_add(1, Ordering::SeqCst) + 1;
            session.observer.on_completed(session.result(build));
        });
    }

    fn result(&self, build: u64) -> BuildResult {
        let units = self
            .units
            .iter()
            .enumerate()
            .map(|(i, unit)| UnitOutput {
                name: unit.name.clone(),
                hash: format!("{build:08x}{i:04x}"),
                output_path: unit.output_path.clone(),
                public_path: unit.public_path.clone(),
            })
            .collect();
        BuildResult::new(units)
    }
}

struct PrebuiltWatching {
    session: Arc<WatchSession>,
}

impl Watching for PrebuiltWatching {
    fn invalidate(&self) {
        if self.session.closed.load(Ordering::SeqCst) {
            logger::log_warning("Rebuild requested after the watch session was closed");
            return;
        }
        self.session.rebuild();
    }

    fn close(&self) -> Result<(), BuildError> {
        if self.session.closed.swap(true, Ordering::SeqCst) {
            return Err(BuildError::Closed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Events {
        log: Mutex<Vec<String>>,
    }

    impl BuildObserver for Events {
        fn on_invalidated(&self) {
            self.log.lock().unwrap().push("invalidated".to_string());
        }

        fn on_completed(&self, result: BuildResult) {
            self.log
                .lock()
                .unwrap()
                .push(format!("completed:{}", result.units[0].hash));
        }
    }

    fn outputs() -> Vec<OutputConfig> {
        vec![OutputConfig {
            name: Some("client".to_string()),
            path: "/srv/dist".to_string(),
            public_path: Some("/static/".to_string()),
        }]
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_watch_emits_initial_build() {
        let events = Arc::new(Events::default());
        let compiler = PrebuiltCompiler::new(&outputs(), Handle::current());
        let _watching = compiler.watch(events.clone()).unwrap();

        assert_eq!(*events.log.lock().unwrap(), vec!["invalidated"]);
        settle().await;
        assert_eq!(
            *events.log.lock().unwrap(),
            vec!["invalidated", "completed:000000010000"]
        );
    }

    #[tokio::test]
    async fn test_invalidate_rebuilds_with_new_hash() {
        let events = Arc::new(Events::default());
        let compiler = PrebuiltCompiler::new(&outputs(), Handle::current());
        let watching = compiler.watch(events.clone()).unwrap();
        settle().await;

        watching.invalidate();
        settle().await;

        let log = events.log.lock().unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log[3], "completed:000000020000");
    }

    #[tokio::test]
    async fn test_close_stops_events() {
        let events = Arc::new(Events::default());
        let compiler = PrebuiltCompiler::new(&outputs(), Handle::current());
        let watching = compiler.watch(events.clone()).unwrap();

        assert!(watching.close().is_ok());
        settle().await;
        watching.invalidate();
        settle().await;

        assert_eq!(*events.log.lock().unwrap(), vec!["invalidated"]);
        assert!(matches!(watching.close(), Err(BuildError::Closed)));
    }

    #[tokio::test]
    async fn test_watch_without_outputs_fails() {
        let compiler = PrebuiltCompiler::new(&[], Handle::current());
        let events: Arc<dyn BuildObserver> = Arc::new(Events::default());
        assert!(matches!(compiler.watch(events), Err(BuildError::Watch(_))));
    }
}

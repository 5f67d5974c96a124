use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunnerError {
    #[error("task is already running")]
    AlreadyRunning,
    #[error("task is not running")]
    NotRunning,
    #[error("runner lock poisoned")]
    Poisoned,
}

struct Run {
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl Run {
    fn is_live(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.handle.is_finished()
    }
}

/// Runs one repeating job at a time: `job`, sleep `interval`, repeat, until stopped.
///
/// Stopping does not cancel an iteration already in progress; it only keeps
/// the next one from starting.
#[derive(Default)]
pub struct TaskRunner {
    current: Mutex<Option<Run>>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<F, Fut>(&self, interval: Duration, mut job: F) -> Result<(), RunnerError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut current = self.current.lock().map_err(|_| RunnerError::Poisoned)?;
        if current.as_ref().is_some_and(Run::is_live) {
            return Err(RunnerError::AlreadyRunning);
        }

        let running = Arc::new(AtomicBool::new(true));
        let wake = Arc::new(Notify::new());
        let flag = running.clone();
        let woken = wake.clone();

        let handle = tokio::spawn(async move {
            let mut iteration: u64 = 0;
            while flag.load(Ordering::Acquire) {
                iteration = iteration.wrapping_add(1);
                debug!(target: "geotrack::runner", "Iteration #{}", iteration);
                job().await;

                if !flag.load(Ordering::Acquire) {
                    break;
                }
                tokio::select! {
                    _ = time::sleep(interval) => {}
                    _ = woken.notified() => {}
                }
            }
            debug!(target: "geotrack::runner", "Loop exited after {} iterations", iteration);
        });

        *current = Some(Run {
            running,
            wake,
            handle,
        });
        Ok(())
    }

    pub fn stop(&self) -> Result<(), RunnerError> {
        let mut current = self.current.lock().map_err(|_| RunnerError::Poisoned)?;
        match current.take() {
            Some(run) if run.is_live() => {
                run.running.store(false, Ordering::Release);
                // notify_one keeps a permit if the task is not yet waiting
                run.wake.notify_one();
                Ok(())
            }
            _ => Err(RunnerError::NotRunning),
        }
    }

    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .map(|c| c.as_ref().is_some_and(Run::is_live))
            .unwrap_or(false)
    }
}

//! Named repeating tasks on the Tokio runtime.
//!
//! The host engine drives peripherals from a per-frame scheduler; here that
//! collaborator is a small registry of named interval tasks. Registering a
//! name that already exists replaces the previous task, and a task can
//! unregister itself by returning [`TaskStep::Done`] from its tick closure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// What a tick closure wants the scheduler to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStep {
    /// Run the task again on the next tick.
    Continue,
    /// Stop the task and drop its registration.
    Done,
}

/// Registry of named repeating tasks.
#[derive(Default)]
pub struct TaskScheduler {
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TaskScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named repeating task.
    ///
    /// `tick` runs once per `period`. Ticks of one task never overlap; a
    /// slow tick delays the next one rather than stacking up. Re-adding an
    /// existing name cancels the previous task first.
    pub fn add<F, Fut>(&self, name: &str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TaskStep> + Send,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tick().await == TaskStep::Done {
                    break;
                }
            }
        });

        let previous = self
            .tasks
            .lock()
            .map(|mut tasks| tasks.insert(name.to_string(), handle));
        if let Ok(Some(old)) = previous {
            debug!(task = name, "replacing existing scheduled task");
            old.abort();
        }
    }

    /// Cancel and unregister a named task. Returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        let handle = self.tasks.lock().map(|mut tasks| tasks.remove(name));
        match handle {
            Ok(Some(handle)) => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Whether a task with this name is registered and still running.
    pub fn is_running(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .map(|tasks| tasks.get(name).is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Cancel every registered task.
    pub fn shutdown(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for (name, handle) in tasks.drain() {
                debug!(task = %name, "cancelling scheduled task");
                handle.abort();
            }
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_task_ticks_repeatedly() {
        let scheduler = TaskScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        scheduler.add("ticker", Duration::from_millis(1), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                TaskStep::Continue
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(count.load(Ordering::SeqCst) >= 2);
        assert!(scheduler.is_running("ticker"));
    }

    #[tokio::test]
    async fn test_remove_stops_task() {
        let scheduler = TaskScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        scheduler.add("ticker", Duration::from_millis(1), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                TaskStep::Continue
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(scheduler.remove("ticker"));
        let after_remove = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_remove);
        assert!(!scheduler.remove("ticker"));
    }

    #[tokio::test]
    async fn test_done_unschedules() {
        let scheduler = TaskScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        scheduler.add("one-shot", Duration::from_millis(1), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                TaskStep::Done
            }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_running("one-shot"));
    }

    #[tokio::test]
    async fn test_add_replaces_existing_name() {
        let scheduler = TaskScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let c = first.clone();
        scheduler.add("task", Duration::from_millis(1), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                TaskStep::Continue
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let c = second.clone();
        scheduler.add("task", Duration::from_millis(1), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                TaskStep::Continue
            }
        });

        let frozen = first.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(first.load(Ordering::SeqCst), frozen);
        assert!(second.load(Ordering::SeqCst) >= 1);
    }
}

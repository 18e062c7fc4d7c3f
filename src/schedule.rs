//! Cancellable repeating tasks.
//!
//! Keyboard detection polls on a fixed interval until it succeeds. The
//! [`Scheduler`] trait hides where those ticks come from: [`TokioScheduler`]
//! drives them from a tokio runtime, while [`ManualScheduler`] lets tests
//! and simulations fire ticks deterministically.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a repeating task wants after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep the task scheduled
    Continue,
    /// Cancel the task; no further ticks will run
    Stop,
}

/// Body of a repeating task.
pub type RepeatingTask = Box<dyn FnMut() -> TickOutcome + Send + 'static>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a scheduled repeating task.
///
/// Clones share the same cancellation flag. Cancelling is idempotent.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    fn new() -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the task. Ticks already running finish; no new ticks start.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Something that can run a task repeatedly on a fixed interval.
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run every `interval`, first after one interval.
    fn schedule_repeating(&self, interval: Duration, task: RepeatingTask) -> TaskHandle;
}

// ============================================================================
// Manual scheduler
// ============================================================================

struct ManualEntry {
    handle: TaskHandle,
    interval: Duration,
    elapsed: Duration,
    task: RepeatingTask,
}

/// A scheduler whose clock only moves when told to.
#[derive(Default, Clone)]
pub struct ManualScheduler {
    entries: Arc<Mutex<Vec<ManualEntry>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks that are still scheduled.
    pub fn active_tasks(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().filter(|e| !e.handle.is_cancelled()).count()
    }

    /// Fire every live task once, regardless of its interval.
    ///
    /// Returns the number of ticks that ran.
    pub fn run_pending_ticks(&self) -> usize {
        self.drive(|entry| {
            entry.elapsed = Duration::ZERO;
            1
        })
    }

    /// Move the clock forward, firing each task once per elapsed interval.
    ///
    /// Returns the number of ticks that ran.
    pub fn advance(&self, by: Duration) -> usize {
        self.drive(|entry| {
            if entry.interval.is_zero() {
                return 1;
            }
            entry.elapsed += by;
            let mut due = 0;
            while entry.elapsed >= entry.interval {
                entry.elapsed -= entry.interval;
                due += 1;
            }
            due
        })
    }

    /// Take the entries out, run them without holding the lock, put back
    /// whatever is still live along with anything scheduled meanwhile.
    fn drive(&self, mut due_ticks: impl FnMut(&mut ManualEntry) -> usize) -> usize {
        let mut taken = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *entries)
        };

        let mut ran = 0;
        for entry in taken.iter_mut() {
            let due = due_ticks(entry);
            for _ in 0..due {
                if entry.handle.is_cancelled() {
                    break;
                }
                ran += 1;
                if (entry.task)() == TickOutcome::Stop {
                    entry.handle.cancel();
                }
            }
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let added = std::mem::take(&mut *entries);
        entries.extend(taken.into_iter().filter(|e| !e.handle.is_cancelled()));
        entries.extend(added);
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, interval: Duration, task: RepeatingTask) -> TaskHandle {
        let handle = TaskHandle::new();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(ManualEntry {
            handle: handle.clone(),
            interval,
            elapsed: Duration::ZERO,
            task,
        });
        handle
    }
}

// ============================================================================
// Tokio scheduler
// ============================================================================

/// Runs repeating tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Use an explicit runtime handle.
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime of the calling context.
    ///
    /// Panics if called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, interval: Duration, mut task: RepeatingTask) -> TaskHandle {
        let handle = TaskHandle::new();
        let task_handle = handle.clone();

        self.runtime.spawn(async move {
            let period = interval.max(Duration::from_millis(1));
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if task_handle.is_cancelled() {
                    break;
                }
                if task() == TickOutcome::Stop {
                    task_handle.cancel();
                    break;
                }
            }
            tracing::debug!(task_id = task_handle.id(), "Repeating task finished");
        });

        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_task(counter: Arc<AtomicUsize>, stop_after: usize) -> RepeatingTask {
        Box::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= stop_after {
                TickOutcome::Stop
            } else {
                TickOutcome::Continue
            }
        })
    }

    #[test]
    fn test_manual_advance_fires_per_interval() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.schedule_repeating(
            Duration::from_millis(500),
            counting_task(counter.clone(), usize::MAX),
        );

        assert_eq!(scheduler.advance(Duration::from_millis(499)), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
        assert_eq!(scheduler.advance(Duration::from_millis(1500)), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_manual_stop_cancels_handle() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule_repeating(
            Duration::from_millis(500),
            counting_task(counter.clone(), 2),
        );

        scheduler.advance(Duration::from_secs(5));

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.active_tasks(), 0);
        assert_eq!(scheduler.run_pending_ticks(), 0);
    }

    #[test]
    fn test_external_cancel() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule_repeating(
            Duration::from_millis(10),
            counting_task(counter.clone(), usize::MAX),
        );

        scheduler.run_pending_ticks();
        handle.cancel();
        handle.cancel();
        scheduler.run_pending_ticks();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.active_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_stops_on_request() {
        let scheduler = TokioScheduler::current();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule_repeating(
            Duration::from_millis(500),
            counting_task(counter.clone(), 3),
        );

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_external_cancel() {
        let scheduler = TokioScheduler::current();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule_repeating(
            Duration::from_millis(100),
            counting_task(counter.clone(), usize::MAX),
        );

        tokio::time::sleep(Duration::from_millis(350)).await;
        handle.cancel();
        let seen = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(seen, 3);
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }
}

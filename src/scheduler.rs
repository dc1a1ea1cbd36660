use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Progress,
    Visualizer,
    Rotation,
    Render,
}

/// Shared stop flag; clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct RepeatingTask {
    kind: TaskKind,
    interval: Duration,
    next_due: Instant,
}

/// Fixed-rate timers for the cooperative loop.
///
/// Nothing runs here: `due` reports which tasks should run now, in
/// registration order, and the caller runs them one after another.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Vec<RepeatingTask>,
    token: CancellationToken,
}

impl Scheduler {
    /// Registers (or re-registers) `kind`; it is first due at `now`.
    pub fn register(&mut self, kind: TaskKind, interval: Duration, now: Instant) {
        self.deregister(kind);
        self.tasks.push(RepeatingTask {
            kind,
            interval: interval.max(MIN_INTERVAL),
            next_due: now,
        });
    }

    pub fn deregister(&mut self, kind: TaskKind) {
        self.tasks.retain(|task| task.kind != kind);
    }

    pub fn due(&mut self, now: Instant) -> Vec<TaskKind> {
        if self.token.is_cancelled() {
            return Vec::new();
        }

        let mut due = Vec::new();
        for task in &mut self.tasks {
            if task.next_due > now {
                continue;
            }
            due.push(task.kind);
            task.next_due += task.interval;
            if task.next_due <= now {
                // Fell behind: skip the missed ticks instead of bursting.
                task.next_due = now + task.interval;
            }
        }
        due
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        if self.token.is_cancelled() {
            return None;
        }
        self.tasks.iter().map(|task| task.next_due).min()
    }

    pub fn cancel_all(&mut self) {
        self.token.cancel();
        self.tasks.clear();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

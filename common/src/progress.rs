use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

/// Layer counter shared between a slicing run and whoever is watching it.
/// Cloning is cheap, every clone observes the same counters.
#[derive(Clone)]
pub struct Progress(Arc<ProgressInner>);

struct ProgressInner {
    complete: AtomicU64,
    total: AtomicU64,

    notify: Condvar,
    last_complete: Mutex<u64>,
}

impl Progress {
    pub fn new() -> Self {
        Self(Arc::new(ProgressInner {
            complete: AtomicU64::new(0),
            total: AtomicU64::new(0),

            notify: Condvar::new(),
            last_complete: Mutex::new(0),
        }))
    }

    /// Fraction of completed work in `[0, 1]`. A run with no work reports 0
    /// until it is marked finished.
    pub fn progress(&self) -> f32 {
        let total = self.0.total.load(Ordering::Relaxed);
        if total == 0 {
            return if self.finished() { 1.0 } else { 0.0 };
        }

        self.0.complete.load(Ordering::Relaxed) as f32 / total as f32
    }

    pub fn completed(&self) -> u64 {
        self.0.complete.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.0.total.load(Ordering::Relaxed)
    }

    pub fn finished(&self) -> bool {
        *self.0.last_complete.lock() == u64::MAX
    }

    /// Clears the counters and sets a new total.
    pub fn reset(&self, total: u64) {
        let mut last = self.0.last_complete.lock();
        self.0.total.store(total, Ordering::Relaxed);
        self.0.complete.store(0, Ordering::Relaxed);
        *last = 0;
    }

    pub fn add_complete(&self, count: u64) {
        let current = self.0.complete.fetch_add(count, Ordering::Relaxed) + count;
        let mut last = self.0.last_complete.lock();
        if *last != u64::MAX {
            *last = current;
        }
        self.0.notify.notify_all();
    }

    pub fn set_finished(&self) {
        let total = self.0.total.load(Ordering::Relaxed);
        self.0.complete.store(total, Ordering::Relaxed);
        *self.0.last_complete.lock() = u64::MAX;
        self.0.notify.notify_all();
    }

    /// Blocks until more work is completed or the run is finished, returning
    /// the current completed count.
    pub fn wait(&self) -> u64 {
        let mut last = self.0.last_complete.lock();
        let seen = self.0.complete.load(Ordering::Relaxed);
        while *last != u64::MAX && self.0.complete.load(Ordering::Relaxed) == seen {
            self.0.notify.wait(&mut last);
        }

        self.0.complete.load(Ordering::Relaxed)
    }

    /// Like [`Progress::wait`] but gives up after `timeout`, so a watcher
    /// can notice a worker that stopped without finishing.
    pub fn wait_timeout(&self, timeout: Duration) -> u64 {
        let mut last = self.0.last_complete.lock();
        let seen = self.0.complete.load(Ordering::Relaxed);
        while *last != u64::MAX && self.0.complete.load(Ordering::Relaxed) == seen {
            if self.0.notify.wait_for(&mut last, timeout).timed_out() {
                break;
            }
        }

        self.0.complete.load(Ordering::Relaxed)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::Progress;

    #[test]
    fn progress_fraction() {
        let progress = Progress::new();
        assert_eq!(progress.progress(), 0.0);

        progress.reset(4);
        progress.add_complete(1);
        assert_eq!(progress.completed(), 1);
        assert_eq!(progress.progress(), 0.25);

        progress.set_finished();
        assert!(progress.finished());
        assert_eq!(progress.progress(), 1.0);

        progress.reset(2);
        assert!(!progress.finished());
        assert_eq!(progress.completed(), 0);
    }

    #[test]
    fn empty_run_finishes_at_one() {
        let progress = Progress::new();
        progress.reset(0);
        assert_eq!(progress.progress(), 0.0);
        progress.set_finished();
        assert_eq!(progress.progress(), 1.0);
    }

    #[test]
    fn wait_wakes_on_finish() {
        let progress = Progress::new();
        progress.reset(3);

        let worker = progress.clone();
        let handle = thread::spawn(move || {
            for _ in 0..3 {
                worker.add_complete(1);
            }
            worker.set_finished();
        });

        while !progress.finished() {
            progress.wait();
        }
        handle.join().unwrap();
        assert_eq!(progress.completed(), 3);
    }

    #[test]
    fn wait_timeout_returns_when_worker_stalls() {
        let progress = Progress::new();
        progress.reset(3);
        progress.add_complete(1);

        assert_eq!(progress.wait_timeout(Duration::from_millis(10)), 1);
        assert!(!progress.finished());
    }
}

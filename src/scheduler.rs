//! Per-worker bounded work queues and the cross-worker migration policy.
//!
//! Queue counts (not raw hot sums) drive `should_migrate`/`get_migrated_task`,
//! with the victim unit inside a chosen donor further filtered by hotness and
//! recency — see `DESIGN.md`, open question 4, for why.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Bounded-queue capacity; the spec allows any fixed value in `[64, 128]`.
pub const QUEUE_CAP: usize = 128;

const MIGRATION_RECENCY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct WorkUnit {
    pub offset: u64,
    pub hot: u32,
    pub last_seen: Instant,
}

struct QueueState {
    units: Vec<WorkUnit>,
}

struct WorkerQueue {
    state: Mutex<QueueState>,
}

impl WorkerQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                units: Vec::with_capacity(QUEUE_CAP),
            }),
        }
    }
}

pub struct AccessScheduler {
    queues: Vec<WorkerQueue>,
    migration_threshold: u32,
}

impl AccessScheduler {
    pub fn new(workers: usize, migration_threshold: u32) -> Self {
        Self {
            queues: (0..workers).map(|_| WorkerQueue::new()).collect(),
            migration_threshold,
        }
    }

    pub fn workers(&self) -> usize {
        self.queues.len()
    }

    pub fn count(&self, worker_id: usize) -> usize {
        self.queues[worker_id].state.lock().units.len()
    }

    /// Records an access to `offset` by `worker_id`. Refreshes an existing
    /// unit's hotness, appends if there's room, otherwise replaces the
    /// coldest unit (the bounded-queue eviction rule).
    pub fn report_access(&self, worker_id: usize, offset: u64) {
        let mut state = self.queues[worker_id].state.lock();
        if let Some(unit) = state.units.iter_mut().find(|u| u.offset == offset) {
            unit.hot = unit.hot.saturating_add(1);
            unit.last_seen = Instant::now();
            return;
        }
        let fresh = WorkUnit {
            offset,
            hot: 1,
            last_seen: Instant::now(),
        };
        if state.units.len() < QUEUE_CAP {
            state.units.push(fresh);
            return;
        }
        if let Some((idx, _)) = state
            .units
            .iter()
            .enumerate()
            .min_by_key(|(_, u)| u.hot)
        {
            state.units[idx] = fresh;
        }
    }

    /// True if `worker_id` is under-loaded relative to the average of every
    /// other worker's queue count, by more than `migration_threshold`.
    pub fn should_migrate(&self, worker_id: usize) -> bool {
        let n = self.queues.len();
        if n <= 1 {
            return false;
        }
        let own = self.count(worker_id) as f64;
        let sum_others: usize = (0..n).filter(|&i| i != worker_id).map(|i| self.count(i)).sum();
        let avg = sum_others as f64 / (n - 1) as f64;
        own < avg - self.migration_threshold as f64
    }

    /// Picks the largest donor queue (excluding `worker_id`); requires its
    /// count to exceed `migration_threshold`. Within that donor, removes and
    /// returns the hottest unit seen within the last 10 seconds.
    pub fn get_migrated_task(&self, worker_id: usize) -> Option<u64> {
        let n = self.queues.len();
        let mut donor = None;
        let mut donor_count = 0usize;
        for i in 0..n {
            if i == worker_id {
                continue;
            }
            let c = self.count(i);
            if c > donor_count {
                donor_count = c;
                donor = Some(i);
            }
        }
        let donor = donor?;
        if donor_count as u32 <= self.migration_threshold {
            return None;
        }
        let mut state = self.queues[donor].state.lock();
        let now = Instant::now();
        let idx = state
            .units
            .iter()
            .enumerate()
            .filter(|(_, u)| now.duration_since(u.last_seen) <= MIGRATION_RECENCY)
            .max_by_key(|(_, u)| u.hot)
            .map(|(i, _)| i)?;
        Some(state.units.remove(idx).offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_access_refreshes_existing_unit() {
        let sched = AccessScheduler::new(2, 5);
        sched.report_access(0, 4096);
        sched.report_access(0, 4096);
        assert_eq!(sched.count(0), 1);
    }

    #[test]
    fn single_worker_never_migrates() {
        let sched = AccessScheduler::new(1, 5);
        assert!(!sched.should_migrate(0));
        assert_eq!(sched.get_migrated_task(0), None);
    }

    #[test]
    fn idle_worker_is_eligible_under_imbalance() {
        let sched = AccessScheduler::new(4, 5);
        for worker in 1..4 {
            for offset in 0..20u64 {
                sched.report_access(worker, offset * 4096);
            }
        }
        assert!(sched.should_migrate(0));
        let migrated = sched.get_migrated_task(0);
        assert!(migrated.is_some());
    }

    #[test]
    fn migrated_unit_is_removed_from_donor() {
        let sched = AccessScheduler::new(2, 0);
        for offset in 0..10u64 {
            sched.report_access(1, offset * 4096);
        }
        let before = sched.count(1);
        let migrated = sched.get_migrated_task(0).unwrap();
        assert_eq!(sched.count(1), before - 1);
        assert!((0..10).map(|o| o * 4096).any(|o| o == migrated));
    }

    #[test]
    fn full_queue_replaces_coldest_unit() {
        let sched = AccessScheduler::new(1, 5);
        for offset in 0..QUEUE_CAP as u64 {
            sched.report_access(0, offset * 4096);
        }
        assert_eq!(sched.count(0), QUEUE_CAP);
        sched.report_access(0, 999_999 * 4096);
        assert_eq!(sched.count(0), QUEUE_CAP);
    }
}

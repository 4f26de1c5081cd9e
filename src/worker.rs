//! The per-core loop: pick offset, load, mutate, compress, write back, log.

use crate::buffer::PageCache;
use crate::compression::{self, AdaptiveLevel};
use crate::config::{Config, PAGE_SIZE};
use crate::io::{classify_write, BackingFile};
use crate::ringlog::RingLog;
use crate::scheduler::AccessScheduler;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed CPU-work simulation constant; any value >= 1 satisfies the spec.
const MUTATE_PASSES: u32 = 125;

const THROTTLE_MIN_MS: u64 = 5;
const THROTTLE_MAX_MS: u64 = 25;

/// High-load threshold on a worker's own queue length, past which the
/// throttle delay is doubled.
const HIGH_LOAD_QUEUE_LEN: usize = crate::scheduler::QUEUE_CAP * 3 / 4;

pub struct Worker {
    pub id: u32,
    segment_base: u64,
    segment_len: u64,
    cursor: AtomicU64,
    running: AtomicBool,
}

impl Worker {
    pub fn new(id: u32, segment_base: u64, segment_len: u64) -> Self {
        Self {
            id,
            segment_base,
            segment_len,
            cursor: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    fn next_offset(&self) -> u64 {
        let pages_in_segment = (self.segment_len / PAGE_SIZE as u64).max(1);
        let cursor = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.segment_base + (cursor % pages_in_segment) * PAGE_SIZE as u64
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    worker: Arc<Worker>,
    cache: Arc<PageCache>,
    scheduler: Arc<AccessScheduler>,
    ring: Arc<RingLog>,
    file: Arc<BackingFile>,
    global_running: &AtomicBool,
    cfg: Config,
) {
    let mut adaptive = AdaptiveLevel::new(
        cfg.compression_min_lvl,
        cfg.compression_max_lvl,
        cfg.compression_adaptive_threshold,
    );

    while global_running.load(Ordering::Relaxed) && worker.running.load(Ordering::Relaxed) {
        let mut offset = worker.next_offset();

        scheduler.report_access(worker.id as usize, offset);

        if scheduler.should_migrate(worker.id as usize) {
            if let Some(migrated) = scheduler.get_migrated_task(worker.id as usize) {
                offset = migrated;
            }
        }

        let mut scratch = match cache.get(&file, offset, true) {
            Ok(buf) => buf,
            Err(e) => {
                warn!(worker = worker.id, offset, error = %e, "cache get failed, skipping iteration");
                std::thread::sleep(throttle_delay(&scheduler, worker.id as usize));
                continue;
            }
        };

        // Best-effort prefetch of the neighbouring page, bypassing the cache
        // (see open question 5 in DESIGN.md for the alternative considered).
        let mut prefetch_buf = [0u8; PAGE_SIZE];
        let _ = file.read_at(offset + PAGE_SIZE as u64, &mut prefetch_buf);

        let xor_byte = (worker.id & 0xFF) as u8;
        for _ in 0..MUTATE_PASSES {
            for b in scratch.data_mut() {
                *b ^= xor_byte;
            }
        }

        let level = adaptive.next_level();
        match compression::compress(scratch.data(), level) {
            Ok(compressed) => {
                adaptive.record(compressed.len());
                let result = file.write_at(offset, &compressed);
                if let Err(e) = classify_write(offset, compressed.len(), result) {
                    warn!(worker = worker.id, offset, error = %e, "write-back failed");
                }
            }
            Err(e) => {
                debug!(worker = worker.id, offset, error = %e, "compression failed, skipping write-back");
            }
        }

        ring.append(offset, array_ref(scratch.data()));

        std::thread::sleep(throttle_delay(&scheduler, worker.id as usize));
    }
}

fn array_ref(data: &[u8]) -> &[u8; PAGE_SIZE] {
    data.try_into().expect("page buffer is always PAGE_SIZE bytes")
}

fn throttle_delay(scheduler: &AccessScheduler, worker_id: usize) -> Duration {
    let base = THROTTLE_MIN_MS + (worker_id as u64 % (THROTTLE_MAX_MS - THROTTLE_MIN_MS + 1));
    if scheduler.count(worker_id) >= HIGH_LOAD_QUEUE_LEN {
        Duration::from_millis(base * 2)
    } else {
        Duration::from_millis(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn single_iteration_produces_a_dirty_write() {
        let tmp = NamedTempFile::new().unwrap();
        tmp.as_file().set_len(16 * PAGE_SIZE as u64).unwrap();
        let file = Arc::new(BackingFile::open(tmp.path().to_str().unwrap()).unwrap());
        let cache = Arc::new(PageCache::new(8));
        let scheduler = Arc::new(AccessScheduler::new(1, 5));
        let ring = Arc::new(RingLog::new(PAGE_SIZE * 8));
        let worker = Worker::new(0, 0, 4 * PAGE_SIZE as u64);

        let offset = worker.next_offset();
        scheduler.report_access(0, offset);
        let scratch = cache.get(&file, offset, true).unwrap();
        ring.append(offset, array_ref(scratch.data()));
        assert_eq!(ring.cursor(), PAGE_SIZE);
    }

    #[test]
    fn next_offset_wraps_within_segment() {
        let worker = Worker::new(2, 2 * 3 * PAGE_SIZE as u64, 3 * PAGE_SIZE as u64);
        let offsets: Vec<u64> = (0..6).map(|_| worker.next_offset()).collect();
        assert_eq!(offsets[0], offsets[3]);
        assert_eq!(offsets[1], offsets[4]);
    }
}

//! Opens the backing file, spawns workers, and owns shutdown.

use crate::buffer::PageCache;
use crate::config::Config;
use crate::error::Result;
use crate::io::BackingFile;
use crate::ringlog::RingLog;
use crate::scheduler::AccessScheduler;
use crate::worker::{self, Worker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::info;

/// Cleared by the INT/TERM handler; observed by the supervisor's own sleep
/// loop and by every worker on each iteration.
static GLOBAL_RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn handle_termination(_sig: libc::c_int) {
    GLOBAL_RUNNING.store(false, Ordering::SeqCst);
}

pub struct Supervisor {
    cfg: Config,
}

impl Supervisor {
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    fn install_signal_handlers(&self) {
        unsafe {
            libc::signal(libc::SIGINT, handle_termination as usize);
            libc::signal(libc::SIGTERM, handle_termination as usize);
        }
    }

    /// Opens the backing file, spawns `cfg.cores` workers, and blocks until
    /// a termination signal is observed, at which point it joins every
    /// worker and flushes the cache.
    pub fn run(&self) -> Result<()> {
        GLOBAL_RUNNING.store(true, Ordering::SeqCst);
        self.install_signal_handlers();

        let file = Arc::new(BackingFile::open(&self.cfg.backing_path)?);
        let cache = Arc::new(PageCache::new(self.cfg.max_cache_entries));
        let ring = Arc::new(RingLog::new(self.cfg.cache_bytes()));
        let scheduler = Arc::new(AccessScheduler::new(
            self.cfg.cores as usize,
            self.cfg.migration_threshold,
        ));

        info!(
            cores = self.cfg.cores,
            path = %self.cfg.backing_path,
            segment_mb = self.cfg.segment_mb,
            cache_mb = self.cfg.cache_mb,
            "starting pseudocore supervisor"
        );

        let workers: Vec<Arc<Worker>> = (0..self.cfg.cores)
            .map(|id| {
                Arc::new(Worker::new(
                    id,
                    id as u64 * self.cfg.segment_bytes(),
                    self.cfg.segment_bytes(),
                ))
            })
            .collect();

        let handles: Vec<JoinHandle<()>> = workers
            .iter()
            .cloned()
            .map(|worker| {
                let cache = cache.clone();
                let scheduler = scheduler.clone();
                let ring = ring.clone();
                let file = file.clone();
                let cfg = self.cfg.clone();
                thread::spawn(move || {
                    worker::run(worker, cache, scheduler, ring, file, &GLOBAL_RUNNING, cfg);
                })
            })
            .collect();

        while GLOBAL_RUNNING.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(100));
        }

        info!("shutdown signal observed, stopping and joining workers");
        for worker in &workers {
            worker.stop();
        }
        for handle in handles {
            let _ = handle.join();
        }

        cache.destroy(&file);
        info!(
            overflow = ring.overflow_count(),
            "cache flushed, ring log overflow count at shutdown"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = Config::default();
        cfg.cores = 0;
        assert!(Supervisor::new(cfg).is_err());
    }

    #[test]
    fn accepts_valid_config() {
        let tmp = NamedTempFile::new().unwrap();
        let mut cfg = Config::default();
        cfg.backing_path = tmp.path().to_str().unwrap().to_string();
        assert!(Supervisor::new(cfg).is_ok());
    }
}

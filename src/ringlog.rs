//! Fixed-size circular diagnostic log of recently written pages.
//!
//! Not in the data path: nothing ever reads this buffer back through the
//! public API, it exists purely as a tap for diagnostics. A wraparound that
//! would split a page across the buffer boundary drops the write instead.

use crate::config::PAGE_SIZE;
use parking_lot::Mutex;
use tracing::warn;

struct RingState {
    buf: Vec<u8>,
    cursor: usize,
    overflow_count: u64,
}

pub struct RingLog {
    state: Mutex<RingState>,
    capacity: usize,
}

impl RingLog {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            state: Mutex::new(RingState {
                buf: vec![0u8; capacity_bytes],
                cursor: 0,
                overflow_count: 0,
            }),
            capacity: capacity_bytes,
        }
    }

    /// Appends `data` (exactly `PAGE_SIZE` bytes) to the ring. `offset` is
    /// only used in the overflow log line.
    pub fn append(&self, offset: u64, data: &[u8; PAGE_SIZE]) {
        let mut state = self.state.lock();
        if self.capacity < PAGE_SIZE {
            return;
        }
        let remaining = self.capacity - state.cursor;
        if remaining < PAGE_SIZE {
            state.overflow_count += 1;
            warn!(offset, remaining, "ring log overflow, dropping page write");
            return;
        }
        let cursor = state.cursor;
        state.buf[cursor..cursor + PAGE_SIZE].copy_from_slice(data);
        state.cursor = (cursor + PAGE_SIZE) % self.capacity;
    }

    pub fn overflow_count(&self) -> u64 {
        self.state.lock().overflow_count
    }

    pub fn cursor(&self) -> usize {
        self.state.lock().cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_advance_cursor_by_page_size() {
        let log = RingLog::new(PAGE_SIZE * 4);
        let page = [1u8; PAGE_SIZE];
        log.append(0, &page);
        assert_eq!(log.cursor(), PAGE_SIZE);
        log.append(PAGE_SIZE as u64, &page);
        assert_eq!(log.cursor(), PAGE_SIZE * 2);
    }

    #[test]
    fn wraps_without_splitting_a_page() {
        // capacity holds exactly 2 pages plus a half-page remainder.
        let log = RingLog::new(PAGE_SIZE * 2 + PAGE_SIZE / 2);
        let page = [2u8; PAGE_SIZE];
        log.append(0, &page);
        log.append(PAGE_SIZE as u64, &page);
        // third append would split across the boundary; must be dropped.
        log.append(2 * PAGE_SIZE as u64, &page);
        assert_eq!(log.overflow_count(), 1);
        assert_eq!(log.cursor(), PAGE_SIZE * 2);
    }

    #[test]
    fn capacity_smaller_than_page_never_panics() {
        let log = RingLog::new(PAGE_SIZE / 2);
        let page = [3u8; PAGE_SIZE];
        log.append(0, &page);
        assert_eq!(log.overflow_count(), 0);
    }
}

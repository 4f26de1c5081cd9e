//! Sharded page cache: per-offset map plus a global LRU list.
//!
//! Pages live in one of `MUTEX_GROUPS` shards, each an ordinary `HashMap`
//! guarded by its own lock; a separate global LRU list (an arena of handles,
//! not raw pointers) tracks recency across all shards under its own lock.
//! Locking order is always shard before LRU. See `DESIGN.md` for how this
//! resolves the cross-shard eviction deadlock the source code has.

use crate::config::{HASH_SIZE, MUTEX_GROUPS, PAGE_SIZE};
use crate::error::{CoreError, Result};
use crate::io::{classify_write, BackingFile};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::warn;

/// Page-aligned buffer, `PAGE_SIZE` bytes, aligned to `PAGE_SIZE` so it can
/// back direct I/O without a copy if the platform ever wants it.
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct PageBuffer {
    data: [u8; PAGE_SIZE],
}

impl Default for PageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageBuffer {
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    #[inline(always)]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline(always)]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn zero(&mut self) {
        self.data.fill(0);
    }

    #[cold]
    pub fn is_zeroed(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    #[inline]
    pub fn checksum(&self) -> u32 {
        crc32fast::hash(&self.data)
    }
}

struct PageEntry {
    buf: PageBuffer,
    dirty: bool,
    last_access: u64,
    lru_node: u32,
}

struct LruNode {
    offset: u64,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Doubly linked LRU list implemented as an arena of integer handles rather
/// than raw pointers (see Design Notes: cyclic list).
struct LruList {
    nodes: Vec<LruNode>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
}

impl LruList {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    fn detach(&mut self, handle: u32) {
        let (prev, next) = {
            let n = &self.nodes[handle as usize];
            (n.prev, n.next)
        };
        match prev {
            Some(p) => self.nodes[p as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n as usize].prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, offset: u64) -> u32 {
        let node = LruNode {
            offset,
            prev: None,
            next: self.head,
        };
        let handle = if let Some(h) = self.free.pop() {
            self.nodes[h as usize] = node;
            h
        } else {
            self.nodes.push(node);
            (self.nodes.len() - 1) as u32
        };
        if let Some(old_head) = self.head {
            self.nodes[old_head as usize].prev = Some(handle);
        }
        self.head = Some(handle);
        if self.tail.is_none() {
            self.tail = Some(handle);
        }
        handle
    }

    fn move_to_front(&mut self, handle: u32) {
        if self.head == Some(handle) {
            return;
        }
        self.detach(handle);
        self.nodes[handle as usize].prev = None;
        self.nodes[handle as usize].next = self.head;
        if let Some(old_head) = self.head {
            self.nodes[old_head as usize].prev = Some(handle);
        }
        self.head = Some(handle);
        if self.tail.is_none() {
            self.tail = Some(handle);
        }
    }

    fn remove(&mut self, handle: u32) {
        self.detach(handle);
        self.free.push(handle);
    }

    fn tail_offset(&self) -> Option<u64> {
        self.tail.map(|h| self.nodes[h as usize].offset)
    }
}

struct ShardState {
    pages: HashMap<u64, PageEntry>,
}

impl ShardState {
    fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }
}

fn shard_group(offset: u64) -> usize {
    let page_index = (offset / PAGE_SIZE as u64) as usize;
    (page_index % HASH_SIZE) % MUTEX_GROUPS
}

pub struct PageCache {
    shards: Vec<Mutex<ShardState>>,
    lru: Mutex<LruList>,
    entry_count: AtomicUsize,
    clock: AtomicU64,
    max_entries: usize,
}

impl PageCache {
    pub fn new(max_entries: usize) -> Self {
        let shards = (0..MUTEX_GROUPS).map(|_| Mutex::new(ShardState::new())).collect();
        Self {
            shards,
            lru: Mutex::new(LruList::new()),
            entry_count: AtomicUsize::new(0),
            clock: AtomicU64::new(0),
            max_entries,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count.load(Ordering::SeqCst)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the page at `offset`, loading it from `file` on a miss. On
    /// `write_intent`, the cache-resident entry is marked dirty so a later
    /// eviction or teardown writes it back.
    pub fn get(&self, file: &BackingFile, offset: u64, write_intent: bool) -> Result<PageBuffer> {
        debug_assert_eq!(offset % PAGE_SIZE as u64, 0, "offset must be page-aligned");
        let group = shard_group(offset);
        let mut shard = self.shards[group].lock();
        if let Some(entry) = shard.pages.get_mut(&offset) {
            entry.last_access = self.tick();
            if write_intent {
                entry.dirty = true;
            }
            let data = entry.buf.clone();
            let handle = entry.lru_node;
            self.lru.lock().move_to_front(handle);
            return Ok(data);
        }

        if shard.pages.try_reserve(1).is_err() {
            return Err(CoreError::AllocError);
        }

        let mut buf = PageBuffer::new();
        let n = file
            .read_at(offset, buf.data_mut())
            .map_err(|source| CoreError::IoReadError { offset, source })?;
        if n > 0 && n < PAGE_SIZE {
            warn!(offset, n, "partial read, zero-filling remainder");
        }

        let handle = self.lru.lock().push_front(offset);
        shard.pages.insert(
            offset,
            PageEntry {
                buf: buf.clone(),
                dirty: write_intent,
                last_access: self.tick(),
                lru_node: handle,
            },
        );
        let new_count = self.entry_count.fetch_add(1, Ordering::SeqCst) + 1;
        drop(shard);

        if new_count > self.max_entries {
            self.evict(file);
        }
        Ok(buf)
    }

    /// Evicts the LRU tail. No-op if the cache is empty. Locks are acquired
    /// in the canonical order `victim shard -> lru`, deferred until after
    /// the caller's own shard lock (if any) has been released — this is what
    /// avoids the cross-shard lock-order inversion the source is exposed to.
    pub fn evict(&self, file: &BackingFile) {
        loop {
            let victim_offset = match self.lru.lock().tail_offset() {
                Some(o) => o,
                None => return,
            };
            let group = shard_group(victim_offset);
            let mut shard = self.shards[group].lock();
            let mut lru = self.lru.lock();
            if lru.tail_offset() != Some(victim_offset) {
                // raced with another evict/promote; retry with fresh tail.
                continue;
            }
            let entry = match shard.pages.remove(&victim_offset) {
                Some(e) => e,
                None => continue,
            };
            lru.remove(entry.lru_node);
            drop(lru);
            drop(shard);
            self.entry_count.fetch_sub(1, Ordering::SeqCst);
            if entry.dirty {
                let result = file.write_at(victim_offset, entry.buf.data());
                if let Err(e) = classify_write(victim_offset, PAGE_SIZE, result) {
                    warn!(
                        offset = victim_offset,
                        error = %e,
                        "write-back on evict failed, re-admitting page so a later flush can retry"
                    );
                    self.readmit_dirty(victim_offset, entry);
                }
            }
            return;
        }
    }

    /// Puts a dirty page that failed to write back during eviction back into
    /// the cache, still marked dirty, so `evict`/`destroy` get another
    /// chance to flush it later instead of losing the write silently.
    fn readmit_dirty(&self, offset: u64, mut entry: PageEntry) {
        let group = shard_group(offset);
        let mut shard = self.shards[group].lock();
        let handle = self.lru.lock().push_front(offset);
        entry.lru_node = handle;
        entry.dirty = true;
        shard.pages.insert(offset, entry);
        self.entry_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Flushes every dirty entry and tears down all internal state. Called
    /// once, at supervisor shutdown.
    pub fn destroy(&self, file: &BackingFile) {
        for shard in &self.shards {
            let mut shard = shard.lock();
            for (offset, entry) in shard.pages.drain() {
                if entry.dirty {
                    let result = file.write_at(offset, entry.buf.data());
                    if let Err(e) = classify_write(offset, PAGE_SIZE, result) {
                        warn!(offset, error = %e, "write-back on destroy failed, dirty page lost");
                    }
                }
            }
        }
        *self.lru.lock() = LruList::new();
        self.entry_count.store(0, Ordering::SeqCst);
    }
}

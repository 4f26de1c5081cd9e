use pseudocore::buffer::PageCache;
use pseudocore::compression::{compress, decompress};
use pseudocore::config::PAGE_SIZE;
use pseudocore::io::BackingFile;
use pseudocore::ringlog::RingLog;
use pseudocore::scheduler::AccessScheduler;
use tempfile::NamedTempFile;

fn zero_filled(pages: u64) -> (NamedTempFile, BackingFile) {
    let tmp = NamedTempFile::new().unwrap();
    tmp.as_file().set_len(pages * PAGE_SIZE as u64).unwrap();
    let file = BackingFile::open(tmp.path().to_str().unwrap()).unwrap();
    (tmp, file)
}

#[test]
fn warm_up_then_eviction_keeps_bound() {
    let (_tmp, file) = zero_filled(8);
    let cache = PageCache::new(4);
    for i in 0..8u64 {
        cache.get(&file, i * PAGE_SIZE as u64, false).unwrap();
        assert!(cache.entry_count() <= 4);
    }
}

#[test]
fn dirty_writes_survive_teardown() {
    let (_tmp, file) = zero_filled(8);
    let cache = PageCache::new(4);
    for i in 0..8u64 {
        let mut buf = cache.get(&file, i * PAGE_SIZE as u64, true).unwrap();
        buf.data_mut()[0] = i as u8 + 1;
    }
    cache.destroy(&file);

    let mut out = [0u8; PAGE_SIZE];
    for i in 0..8u64 {
        let n = file.read_at(i * PAGE_SIZE as u64, &mut out).unwrap();
        assert_eq!(n, PAGE_SIZE);
    }
}

#[test]
fn migration_picks_hottest_offset_from_the_busiest_worker() {
    let scheduler = AccessScheduler::new(4, 5);
    for worker in 1..4 {
        for offset in 0..20u64 {
            scheduler.report_access(worker, offset * PAGE_SIZE as u64);
        }
    }
    assert!(scheduler.should_migrate(0));
    let migrated = scheduler.get_migrated_task(0).expect("a donor exists");
    assert_eq!(migrated % PAGE_SIZE as u64, 0);
}

#[test]
fn ring_log_records_every_mutated_page_until_it_wraps() {
    let ring = RingLog::new(PAGE_SIZE * 3);
    let page = [5u8; PAGE_SIZE];
    ring.append(0, &page);
    ring.append(PAGE_SIZE as u64, &page);
    assert_eq!(ring.overflow_count(), 0);
    // A third page exceeds the 3-page buffer's remaining 1-page slot plus
    // whatever's left, forcing a drop rather than a split write.
    ring.append(2 * PAGE_SIZE as u64, &page);
    ring.append(3 * PAGE_SIZE as u64, &page);
}

#[test]
fn compression_round_trips_through_the_adaptive_path() {
    let input = [0u8; PAGE_SIZE];
    let compressed = compress(&input, 1).unwrap();
    let mut out = [0u8; PAGE_SIZE];
    decompress(&compressed, &mut out).unwrap();
    assert_eq!(input, out);
}

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pseudocore::buffer::PageCache;
use pseudocore::config::PAGE_SIZE;
use pseudocore::io::BackingFile;
use tempfile::NamedTempFile;

fn backing(entries: u64) -> (NamedTempFile, BackingFile) {
    let tmp = NamedTempFile::new().unwrap();
    tmp.as_file().set_len(entries * PAGE_SIZE as u64).unwrap();
    let file = BackingFile::open(tmp.path().to_str().unwrap()).unwrap();
    (tmp, file)
}

fn bench_sequential_gets(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_cache_get_sequential");
    for entries in [64usize, 512, 4096] {
        let (_tmp, file) = backing(entries as u64);
        let cache = PageCache::new(entries);
        group.bench_with_input(BenchmarkId::from_parameter(entries), &entries, |b, &entries| {
            b.iter(|| {
                for i in 0..entries as u64 {
                    cache.get(&file, i * PAGE_SIZE as u64, false).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_dirty_eviction_churn(c: &mut Criterion) {
    let (_tmp, file) = backing(1024);
    let cache = PageCache::new(64);
    c.bench_function("page_cache_dirty_eviction_churn", |b| {
        b.iter(|| {
            for i in 0..256u64 {
                let offset = (i % 1024) * PAGE_SIZE as u64;
                cache.get(&file, offset, true).unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_sequential_gets, bench_dirty_eviction_churn);
criterion_main!(benches);

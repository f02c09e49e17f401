//! 🏎️ How fast can a rolling hash chew through a log file?
//!
//! Two questions, two groups:
//! - raw matcher throughput over 8 MiB of text, at a few chunk sizes
//! - a whole in-memory search: listing, fan-out, matching, the lot
//!
//! "It feels faster" is not a metric. These are. 🦆

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use s3x::backends::InMemoryStore;
use s3x::matcher::StreamMatcher;
use s3x::{CancellationToken, RuntimeConfig, SearchRequest};

const HAYSTACK_BYTES: usize = 8 * 1024 * 1024;

/// 📜 Realistic-ish log lines, with the needle only in the very last line.
fn haystack() -> Vec<u8> {
    let line = b"2024-01-02T03:04:05Z INFO request served in 12ms path=/api/v1/things\n";
    let mut bytes = Vec::with_capacity(HAYSTACK_BYTES + 64);
    while bytes.len() < HAYSTACK_BYTES {
        bytes.extend_from_slice(line);
    }
    bytes.extend_from_slice(b"2024-01-02T03:04:06Z ERROR500 upstream timed out\n");
    bytes
}

fn bench_matcher(c: &mut Criterion) {
    let haystack = haystack();
    let mut group = c.benchmark_group("stream_matcher");
    group.throughput(Throughput::Bytes(haystack.len() as u64));

    for chunk_size in [4 * 1024, 64 * 1024, 1024 * 1024] {
        group.bench_with_input(
            BenchmarkId::new("ERROR500", chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut matcher =
                        StreamMatcher::new(b"ERROR500").expect("💀 pattern is fine");
                    for chunk in haystack.chunks(chunk_size) {
                        matcher.feed(black_box(chunk));
                    }
                    black_box(matcher.finish())
                })
            },
        );
    }

    // -- 🔍 the memchr path, for comparison
    group.bench_function("single_byte", |b| {
        b.iter(|| {
            let mut matcher = StreamMatcher::new(b"\x07").expect("💀 pattern is fine");
            for chunk in haystack.chunks(64 * 1024) {
                matcher.feed(black_box(chunk));
            }
            black_box(matcher.finish())
        })
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("💀 no runtime, no benchmark");
    let line = b"2024-01-02T03:04:05Z INFO nothing to see here\n".repeat(256);
    let mut store = InMemoryStore::new().with_chunk_size(16 * 1024);
    for i in 0..200 {
        let mut body = line.clone();
        if i % 50 == 49 {
            body.extend_from_slice(b"ERROR500\n");
        }
        store = store.with_object("logs", &format!("app/{i:04}.log"), body, 0);
    }
    let store = Arc::new(store);
    let config = RuntimeConfig {
        page_size: 50,
        ..RuntimeConfig::default()
    };

    c.bench_function("in_memory_search_200_objects", |b| {
        b.to_async(&runtime).iter(|| {
            let store = Arc::clone(&store);
            let config = config.clone();
            async move {
                let request = SearchRequest {
                    bucket: "logs".into(),
                    pattern: "ERROR500".into(),
                    result_count: 100,
                    region: "us-east-1".into(),
                    start_time: 0,
                    end_time: 0,
                };
                s3x::search(store, request, &config, CancellationToken::new())
                    .await
                    .expect("💀 search failed mid-benchmark")
            }
        })
    });
}

criterion_group!(benches, bench_matcher, bench_search);
criterion_main!(benches);

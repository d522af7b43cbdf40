//! Criterion benchmarks for the query path.
//!
//! - vectorize: embedding a query or document
//! - scan: full uncached search over indexes of growing size
//! - cached: repeated identical search served from the result cache

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use semrank::config::Config;
use semrank::search::{
    CharCodeEmbedder, DocumentInput, Embedder, SearchContext, SearchEngine, SearchOptions,
    cosine_similarity,
};

fn populated_engine(size: usize) -> SearchEngine {
    let engine = SearchEngine::new(Config::default()).unwrap();
    let inputs = (0..size)
        .map(|i| {
            DocumentInput::new(format!(
                "document {i} about database indexing, network latency and query planning"
            ))
            .id(format!("doc-{i:05}"))
            .domain(if i % 2 == 0 { "technical" } else { "operations" })
        })
        .collect();
    for result in engine.add_documents(inputs).unwrap() {
        result.unwrap();
    }
    engine
}

// =============================================================================
// Vectorization
// =============================================================================

fn vectorize_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("vectorize");
    let embedder = CharCodeEmbedder::new(300);
    let context = vec!["technical".to_string()];

    for words in [5, 50, 500].iter() {
        let text = "database ".repeat(*words);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("words", words), &text, |b, text| {
            b.iter(|| embedder.embed(black_box(text), &context))
        });
    }
    group.finish();

    let a = embedder.embed("graph database index optimization", &[]);
    let other = embedder.embed("network latency troubleshooting", &[]);
    c.bench_function("cosine_similarity_300", |b| {
        b.iter(|| cosine_similarity(black_box(&a), black_box(&other)))
    });
}

// =============================================================================
// Uncached scan
// =============================================================================

fn scan_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_scan");
    let ctx = SearchContext::new().domain("technical");
    let options = SearchOptions::new().threshold(0.0).force_refresh(true);

    for size in [100, 1000, 5000].iter() {
        let engine = populated_engine(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("documents", size), &engine, |b, engine| {
            b.iter(|| engine.search(black_box("database optimization"), &ctx, &options))
        });
    }
    group.finish();
}

// =============================================================================
// Cache hits
// =============================================================================

fn cached_benchmarks(c: &mut Criterion) {
    let engine = populated_engine(1000);
    let ctx = SearchContext::new().domain("technical");
    let options = SearchOptions::new().threshold(0.0);
    engine.search("database optimization", &ctx, &options);

    c.bench_function("search_cached_1000", |b| {
        b.iter(|| engine.search(black_box("database optimization"), &ctx, &options))
    });
}

criterion_group!(benches, vectorize_benchmarks, scan_benchmarks, cached_benchmarks);
criterion_main!(benches);

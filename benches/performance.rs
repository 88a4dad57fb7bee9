//! Performance benchmarks for rufi.
//!
//! Run with: cargo bench
//!
//! Target performance:
//! - Item discovery: < 500ms
//! - Ranking a keystroke over a few thousand items: < 5ms

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rufi::core::matcher::{Matcher, Query};
use rufi::core::ranker::{rank, DEFAULT_APPLICATION_BIAS};
use rufi::services::{DesktopEntryReader, ItemSource, PathExecutableReader};
use rufi::{Category, ExecTarget, Item, SearchSession, Settings};

/// Items shaped like a typical desktop: a few hundred apps, a few thousand commands.
fn corpus() -> Vec<Item> {
    let apps = (0..300).map(|i| {
        Item::new(
            format!("org.example.App{i}.desktop"),
            format!("Application {i} Viewer"),
            ExecTarget::Argv(vec![format!("app-{i}"), "--new-window".into()]),
            Category::Application,
        )
        .with_description(format!("View and edit documents of kind {i}"))
    });
    let commands = (0..3000).map(|i| Item::command(format!("tool-{i}-ctl")));
    apps.chain(commands).collect()
}

/// Benchmark discovery from the real system directories.
fn bench_discovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("discovery");

    let desktop = DesktopEntryReader::from_env(&[]);
    group.bench_function("desktop_entries", |b| {
        b.iter(|| black_box(desktop.collect()))
    });

    if let Ok(path) = PathExecutableReader::from_env() {
        group.bench_function("path_executables", |b| {
            b.iter(|| black_box(path.collect()))
        });
    }

    group.finish();
}

/// Benchmark scoring every item against one query.
fn bench_scoring(c: &mut Criterion) {
    let items = corpus();
    let matcher = Matcher::default();

    let mut group = c.benchmark_group("scoring");

    for raw in ["a", "app", "tool-15", "atvr", "documents"] {
        let query = Query::new(raw);
        group.bench_with_input(BenchmarkId::from_parameter(raw), &query, |b, query| {
            b.iter(|| {
                let count = items
                    .iter()
                    .filter_map(|item| matcher.score(query, item))
                    .count();
                black_box(count)
            })
        });
    }

    group.finish();
}

/// Benchmark the full sort, including the empty query that matches everything.
fn bench_ranking(c: &mut Criterion) {
    let items = corpus();
    let matcher = Matcher::default();

    let mut group = c.benchmark_group("ranking");

    for raw in ["", "t", "view"] {
        let query = Query::new(raw);
        group.bench_with_input(BenchmarkId::from_parameter(raw), &query, |b, query| {
            b.iter(|| {
                let matches = items
                    .iter()
                    .filter_map(|item| matcher.score(query, item))
                    .collect();
                black_box(rank(matches, DEFAULT_APPLICATION_BIAS, 50))
            })
        });
    }

    group.finish();
}

/// Benchmark a keystroke through the session, served from a warm cache.
fn bench_session(c: &mut Criterion) {
    struct Fixed(Vec<Item>);

    impl ItemSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn collect(&self) -> Result<Vec<Item>, rufi::error::SourceError> {
            Ok(self.0.clone())
        }
    }

    let settings = Settings::default();
    let cache = settings
        .cache_builder(rufi::services::Sources::new(vec![Arc::new(Fixed(corpus()))]))
        .build();
    let session = SearchSession::new(cache, &settings);
    session.query_changed("");

    c.bench_function("session_query_changed", |b| {
        b.iter(|| black_box(session.query_changed(black_box("appv")).len()))
    });
}

criterion_group!(
    benches,
    bench_discovery,
    bench_scoring,
    bench_ranking,
    bench_session,
);

criterion_main!(benches);

//! Benchmarks for the HTML diff engine.

#![allow(clippy::format_push_string)] // Benchmark setup code, performance not critical

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use wiki_diff::HtmlDiff;

/// Generate a rendered page with the given number of paragraphs.
///
/// Every `change_every`-th word differs between the two versions.
fn generate_page(paragraphs: usize, change_every: usize, variant: &str) -> String {
    let mut html = String::with_capacity(paragraphs * 120);
    html.push_str("<h1>Document Title</h1>\n");
    let mut word = 0;
    for i in 0..paragraphs {
        html.push_str("<p>");
        for j in 0..12 {
            word += 1;
            if change_every > 0 && word % change_every == 0 {
                html.push_str(&format!("{variant}{j} "));
            } else {
                html.push_str(&format!("word{i}x{j} "));
            }
        }
        html.push_str("<b>bold</b></p>\n");
    }
    html
}

fn bench_identical(c: &mut Criterion) {
    let page = generate_page(100, 0, "");

    c.bench_function("diff_identical_100_paragraphs", |b| {
        b.iter(|| HtmlDiff::new(&page, &page).build());
    });
}

fn bench_varying_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_sparse_changes");

    for paragraphs in [10, 50, 200] {
        let old = generate_page(paragraphs, 25, "old");
        let new = generate_page(paragraphs, 25, "new");
        group.throughput(Throughput::Bytes((old.len() + new.len()) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(paragraphs),
            &(old, new),
            |b, (old, new)| b.iter(|| HtmlDiff::new(old, new).build()),
        );
    }

    group.finish();
}

fn bench_dense_changes(c: &mut Criterion) {
    let old = generate_page(50, 2, "old");
    let new = generate_page(50, 2, "new");

    c.bench_function("diff_dense_changes_50_paragraphs", |b| {
        b.iter(|| HtmlDiff::new(&old, &new).build());
    });
}

fn bench_size_cap(c: &mut Criterion) {
    let old = generate_page(2_000, 3, "old");
    let new = generate_page(2_000, 3, "new");

    c.bench_function("diff_over_size_cap", |b| {
        b.iter(|| HtmlDiff::new(&old, &new).build());
    });
}

criterion_group!(
    benches,
    bench_identical,
    bench_varying_sizes,
    bench_dense_changes,
    bench_size_cap
);
criterion_main!(benches);

//! Coverage Operations Benchmarks
//!
//! Benchmarks for template compilation, normalization and accumulation.
//!
//! Run with: `cargo bench --bench coverage_ops`

use apicov::{
    compile, ContractSpec, CoverageReport, HostRewriteTable, HostRule, Normalizer, RawExchange,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn contract(paths: usize) -> ContractSpec {
    let mut spec = ContractSpec::new();
    for i in 0..paths {
        spec.add_operation(&format!("/resource{i}/{{id}}"), "GET", ["200", "404"]);
        spec.add_operation(&format!("/resource{i}/{{id}}/items/{{any+}}"), "POST", ["201"]);
    }
    spec
}

fn raw_traffic(paths: usize, count: usize) -> Vec<RawExchange> {
    (0..count)
        .map(|i| {
            let url = format!("https://api.example.com/resource{}/{}?page={i}", i % paths, i % 7);
            RawExchange::new("get", url).with_status(if i % 3 == 0 { 404 } else { 200 })
        })
        .collect()
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_compile");

    for template in ["/users/{id}", "/a/{b}/c/{d}/e/{any+}", "/files/{any+}/meta"] {
        group.bench_with_input(BenchmarkId::from_parameter(template), &template, |bench, t| {
            bench.iter(|| black_box(compile(black_box(t))));
        });
    }

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let normalizer = Normalizer::new(
        HostRewriteTable::new().with_rule(HostRule::new("https://api.example.com")),
    )
    .with_status_discriminator(true);

    for count in [100, 1000, 10_000] {
        let raw = raw_traffic(50, count);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count}_entries")),
            &raw,
            |bench, raw| {
                bench.iter(|| black_box(normalizer.normalize(raw.iter().cloned())));
            },
        );
    }

    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator_apply");
    let normalizer = Normalizer::new(
        HostRewriteTable::new().with_rule(HostRule::new("https://api.example.com")),
    )
    .with_status_discriminator(true);

    for paths in [10, 100, 500] {
        let spec = contract(paths);
        let exchanges = normalizer.normalize(raw_traffic(paths, 2000));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{paths}_paths")),
            &(spec, exchanges),
            |bench, (spec, exchanges)| {
                bench.iter(|| {
                    let mut report = CoverageReport::seed(spec);
                    let mut skipped = Vec::new();
                    report.apply(exchanges, &mut skipped);
                    black_box((report, skipped));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_normalize, bench_apply);
criterion_main!(benches);

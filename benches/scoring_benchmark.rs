//! Benchmarks for forest training and batch scoring
//!
//! Run with: cargo bench --bench scoring_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use smehealth::pipeline::{
    score_batch, train_pipeline, ForestParams, ScoringStrategy, TrainingConfig,
};

/// Generate a synthetic canonical ledger with a mix of healthy, thin-margin
/// and loss-making rows
fn generate_ledger(n_rows: usize, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let mut revenue = Vec::with_capacity(n_rows);
    let mut cogs = Vec::with_capacity(n_rows);
    let mut gross = Vec::with_capacity(n_rows);
    let mut opex = Vec::with_capacity(n_rows);
    let mut net = Vec::with_capacity(n_rows);

    for _ in 0..n_rows {
        let r = rng.gen_range(1_000.0..500_000.0);
        let c = r * rng.gen_range(0.2..0.6);
        let margin: f64 = rng.gen_range(-0.3..0.4);
        let n = r * margin;
        revenue.push(r);
        cogs.push(c);
        gross.push(r - c);
        opex.push(r - c - n);
        net.push(n);
    }

    let ids: Vec<String> = (0..n_rows).map(|i| format!("T{}", i)).collect();
    let dates: Vec<String> = (0..n_rows)
        .map(|i| format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1))
        .collect();

    df! {
        "TransactionID" => ids,
        "TransactionDate" => dates,
        "Revenue" => revenue,
        "COGS" => cogs,
        "GrossProfit" => gross,
        "OperatingExpenses" => opex,
        "NetProfit" => net,
    }
    .unwrap()
}

fn bench_config(n_trees: usize) -> TrainingConfig {
    TrainingConfig {
        forest: ForestParams {
            n_trees,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);

    for n_rows in [1_000, 5_000] {
        let ledger = generate_ledger(n_rows, 42);
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::new("forest_50", n_rows), &ledger, |b, ledger| {
            b.iter(|| train_pipeline(black_box(ledger), &bench_config(50)).unwrap())
        });
    }

    group.finish();
}

fn bench_scoring(c: &mut Criterion) {
    let bundle = train_pipeline(&generate_ledger(2_000, 7), &bench_config(100))
        .unwrap()
        .bundle;

    let mut group = c.benchmark_group("scoring");
    for n_rows in [100, 1_000, 10_000] {
        let batch = generate_ledger(n_rows, 99);
        group.throughput(Throughput::Elements(n_rows as u64));
        for strategy in [ScoringStrategy::Adjusted, ScoringStrategy::Tiered] {
            group.bench_with_input(
                BenchmarkId::new(strategy.as_str(), n_rows),
                &batch,
                |b, batch| b.iter(|| score_batch(black_box(batch), &bundle, strategy).unwrap()),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_training, bench_scoring);
criterion_main!(benches);

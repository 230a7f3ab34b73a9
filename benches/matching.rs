//! Row Matching Performance Benchmarks
//!
//! Benchmarks for the comparison core. These measure:
//! - Elimination matching when every expected row is found
//! - The key-narrowing pass when many rows are missing
//! - Key-sorted pairing for equality

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dbcompare::compare::{match_rows, pair_rows};
use dbcompare::{Column, DataType, Table, TableMetadata, Value};

fn columns() -> Vec<Column> {
    vec![
        Column::new("id", DataType::Integer),
        Column::new("label", DataType::Text),
        Column::new("weight", DataType::Decimal),
    ]
}

fn table(rows: usize, offset: i64) -> Table {
    let rows = (0..rows)
        .map(|i| {
            let id = i64::try_from(i).unwrap_or(i64::MAX) + offset;
            vec![Value::Integer(id), Value::from(format!("item {id}")), Value::Decimal(id as f64 / 4.0)]
        })
        .rev()
        .collect();
    Table::new(TableMetadata::new("ITEM", columns()), rows).expect("valid table")
}

fn key() -> Vec<Column> {
    vec![Column::new("id", DataType::Integer)]
}

fn bench_match_all_found(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_rows_all_found");
    for size in [50, 200, 500] {
        let expected = table(size, 0);
        let actual = table(size * 2, 0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let outcome = match_rows(
                    black_box(&expected),
                    black_box(&actual),
                    black_box(&columns()),
                    black_box(&key()),
                )
                .expect("match");
                assert!(outcome.is_complete());
                outcome
            });
        });
    }
    group.finish();
}

fn bench_match_with_diagnostics(c: &mut Criterion) {
    let expected = table(200, 0);
    let actual = table(200, 100);

    c.bench_function("match_rows_half_missing", |b| {
        b.iter(|| {
            match_rows(black_box(&expected), black_box(&actual), &columns(), &key()).expect("match")
        });
    });
}

fn bench_pair_rows(c: &mut Criterion) {
    let expected = table(1_000, 0);
    let actual = table(1_000, 0);

    c.bench_function("pair_rows_1000", |b| {
        b.iter(|| {
            let mismatches =
                pair_rows(black_box(&expected), black_box(&actual), &columns(), &key()).expect("pair");
            assert!(mismatches.is_empty());
            mismatches
        });
    });
}

criterion_group!(benches, bench_match_all_found, bench_match_with_diagnostics, bench_pair_rows);
criterion_main!(benches);

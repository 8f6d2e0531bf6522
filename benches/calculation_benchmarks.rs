//! Performance benchmarks for the R&D claim engine.
//!
//! Covers the engine on its own over synthetic payroll tables and the full
//! HTTP path through the router.
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use rd_claim_engine::api::{AppState, create_router};
use rd_claim_engine::calculation::{ColumnMapping, RdOverrides, calculate};
use rd_claim_engine::config::{RuleLoader, RuleSet};
use rd_claim_engine::models::Table;

use axum::{body::Body, http::Request};
use serde_json::{Value, json};
use tower::ServiceExt;

fn load_rules() -> RuleSet {
    RuleLoader::load("./config/uk_rd").expect("Failed to load rules")
}

/// Builds a payroll table with `row_count` rows spread over `subject_count` people.
///
/// Every fifth subject is an EPW, every third EPW is connected, and every
/// seventh row carries a bonus.
fn create_payroll_json(row_count: usize, subject_count: usize) -> Value {
    let rows: Vec<Value> = (0..row_count)
        .map(|i| {
            let subject = i % subject_count;
            let is_epw = subject % 5 == 0;
            json!([
                format!("Worker {:04}", subject),
                format!("2024-{:02}-28", (i / subject_count) % 12 + 1),
                format!("{}.50", 2000 + (i % 37) * 25),
                if is_epw { String::new() } else { "210.00".to_string() },
                if is_epw { String::new() } else { "95.00".to_string() },
                if i % 7 == 0 { "150" } else { "" },
                format!("{}", 40 + (subject % 6) * 10),
                if is_epw { "EPW" } else { "staff" },
                if is_epw && subject % 3 == 0 { "yes" } else { "no" },
            ])
        })
        .collect();

    json!({
        "columns": [
            "Employee", "Pay Date", "Gross", "NI", "Pension", "Bonus", "R&D %", "Type", "Connected"
        ],
        "rows": rows
    })
}

fn create_mapping() -> ColumnMapping {
    ColumnMapping::from_pairs([
        ("employee_name", "Employee"),
        ("date", "Pay Date"),
        ("gross_pay", "Gross"),
        ("employer_ni", "NI"),
        ("employer_pension", "Pension"),
        ("bonus", "Bonus"),
        ("rd_percentage", "R&D %"),
        ("worker_type", "Type"),
        ("epw_connected", "Connected"),
    ])
    .expect("Failed to build mapping")
}

fn create_request_body(row_count: usize, subject_count: usize) -> String {
    json!({
        "table": create_payroll_json(row_count, subject_count),
        "mapping": {
            "employee_name": "Employee",
            "date": "Pay Date",
            "gross_pay": "Gross",
            "employer_ni": "NI",
            "employer_pension": "Pension",
            "bonus": "Bonus",
            "rd_percentage": "R&D %",
            "worker_type": "Type",
            "epw_connected": "Connected"
        },
        "accounting_period_start": "2024-04-01"
    })
    .to_string()
}

/// Benchmark: engine over tables of increasing size, twelve rows per subject.
fn bench_engine_scaling(c: &mut Criterion) {
    let rules = load_rules();
    let mapping = create_mapping();
    let overrides = RdOverrides::new();

    let mut group = c.benchmark_group("engine_scaling");

    for row_count in [120usize, 1_200, 12_000] {
        let table = Table::from_json(&create_payroll_json(row_count, row_count / 12))
            .expect("Failed to build table");

        group.throughput(Throughput::Elements(row_count as u64));
        group.bench_with_input(BenchmarkId::new("rows", row_count), &table, |b, table| {
            b.iter(|| black_box(calculate(&rules, table, &mapping, &overrides).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark: fixed row count with many or few subjects.
fn bench_grouping(c: &mut Criterion) {
    let rules = load_rules();
    let mapping = create_mapping();
    let overrides = RdOverrides::new();

    let mut group = c.benchmark_group("grouping");
    group.throughput(Throughput::Elements(5_000));

    for subject_count in [10usize, 500, 5_000] {
        let table = Table::from_json(&create_payroll_json(5_000, subject_count))
            .expect("Failed to build table");

        group.bench_with_input(
            BenchmarkId::new("subjects", subject_count),
            &table,
            |b, table| b.iter(|| black_box(calculate(&rules, table, &mapping, &overrides).unwrap())),
        );
    }

    group.finish();
}

/// Benchmark: full HTTP request for a small claim.
fn bench_http_small_claim(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = create_router(AppState::new(load_rules()));
    let body = create_request_body(24, 2);

    c.bench_function("http_small_claim", |b| {
        b.to_async(&rt).iter(|| async {
            let router = router.clone();
            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/calculate")
                        .header("Content-Type", "application/json")
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });
}

/// Benchmark: full HTTP request for a year of payroll for 100 people.
fn bench_http_large_claim(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = create_router(AppState::new(load_rules()));
    let body = create_request_body(1_200, 100);

    let mut group = c.benchmark_group("http_large_claim");
    group.throughput(Throughput::Elements(1_200));
    group.sample_size(20);

    group.bench_function("rows_1200", |b| {
        b.to_async(&rt).iter(|| async {
            let router = router.clone();
            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/calculate")
                        .header("Content-Type", "application/json")
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_engine_scaling,
    bench_grouping,
    bench_http_small_claim,
    bench_http_large_claim,
);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use duckbridge::engine::Database;
use duckbridge::serializer::{serialize_chunks, MaterializedResult};
use duckbridge::OpenOptions;
use duckdb::arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use duckdb::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use duckdb::arrow::record_batch::RecordBatch;
use std::hint::black_box;
use std::sync::Arc;

const CHUNK_ROWS: usize = 2048;

fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("score", DataType::Float64, true),
        Field::new("active", DataType::Boolean, true),
    ]))
}

/// Split `rows` rows into engine-sized chunks
fn generate_chunks(schema: &SchemaRef, rows: usize) -> Vec<RecordBatch> {
    (0..rows)
        .step_by(CHUNK_ROWS)
        .map(|start| {
            let end = (start + CHUNK_ROWS).min(rows);
            let ids: Vec<i64> = (start as i64..end as i64).collect();
            let names: Vec<Option<String>> = ids
                .iter()
                .map(|i| (i % 7 != 0).then(|| format!("user \"{}\"\tname", i)))
                .collect();
            let scores: Vec<Option<f64>> = ids
                .iter()
                .map(|i| (i % 5 != 0).then_some(*i as f64 * 0.25))
                .collect();
            let active: Vec<Option<bool>> = ids.iter().map(|i| Some(i % 2 == 0)).collect();

            let columns: Vec<ArrayRef> = vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(StringArray::from(names)),
                Arc::new(Float64Array::from(scores)),
                Arc::new(BooleanArray::from(active)),
            ];
            RecordBatch::try_new(schema.clone(), columns).unwrap()
        })
        .collect()
}

fn bench_chunked_vs_materialized(c: &mut Criterion) {
    let schema = schema();
    let mut group = c.benchmark_group("serialize");

    for rows in [100usize, 10_000, 100_000] {
        let chunks = generate_chunks(&schema, rows);
        group.throughput(Throughput::Elements(rows as u64));

        group.bench_with_input(BenchmarkId::new("chunked", rows), &chunks, |b, chunks| {
            b.iter(|| black_box(serialize_chunks(&schema, chunks.iter().cloned())));
        });

        let materialized = MaterializedResult::new(schema.clone(), chunks.clone());
        group.bench_with_input(
            BenchmarkId::new("materialized", rows),
            &materialized,
            |b, result| {
                b.iter(|| black_box(result.serialize()));
            },
        );
    }

    group.finish();
}

fn bench_end_to_end_query(c: &mut Criterion) {
    let db = Database::open(None, &OpenOptions::without_extensions()).unwrap();
    let conn = db.connect().unwrap();
    conn.execute_batch(
        "CREATE TABLE bench AS SELECT range AS id, 'name ' || range AS name, \
         range * 0.5 AS score FROM range(50000)",
    )
    .unwrap();

    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(50_000));
    group.sample_size(20);

    group.bench_function("ad_hoc", |b| {
        b.iter(|| black_box(conn.query("SELECT * FROM bench").unwrap()));
    });

    let stmt = conn.prepare("SELECT * FROM bench").unwrap();
    group.bench_function("prepared", |b| {
        b.iter(|| black_box(stmt.execute().unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_chunked_vs_materialized, bench_end_to_end_query);
criterion_main!(benches);

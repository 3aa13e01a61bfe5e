//! Result serialization
//!
//! Walks a result set and renders it as a JSON array of row objects, one
//! `"column": value` pair per column in declaration order. Column names are
//! passed through as-is, so duplicate names produce duplicate keys.
//!
//! Two access modes produce byte-identical output for the same rows:
//!
//! - [`serialize_chunks`] pulls blocks of rows until the stream ends or an
//!   empty block is seen (the sentinel).
//! - [`MaterializedResult`] holds every block, knows its row count up front,
//!   and serializes by row index.
//!
//! Engine errors never reach this module: callers surface them before any
//! row is rendered, so an error and partial rows are never mixed.

use duckdb::arrow::datatypes::{Schema, SchemaRef};
use duckdb::arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::value::{write_json_string, ColumnEncoder};

/// Pre-rendered `"name":` prefixes, escaped once per result
struct ColumnKeys {
    keys: Vec<String>,
}

impl ColumnKeys {
    fn new(schema: &Schema) -> Self {
        let keys = schema
            .fields()
            .iter()
            .map(|field| {
                let mut key = String::with_capacity(field.name().len() + 3);
                write_json_string(&mut key, field.name());
                key.push(':');
                key
            })
            .collect();
        Self { keys }
    }
}

/// One encoder per column; extension metadata comes from the result schema
fn chunk_encoders<'a>(schema: &Schema, chunk: &'a RecordBatch) -> Vec<ColumnEncoder<'a>> {
    chunk
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| match schema.fields().get(i) {
            Some(field) => ColumnEncoder::with_field(column.as_ref(), field),
            None => ColumnEncoder::new(column.as_ref()),
        })
        .collect()
}

fn write_record(out: &mut String, keys: &ColumnKeys, encoders: &[ColumnEncoder<'_>], row: usize) {
    out.push('{');
    for (col, (key, encoder)) in keys.keys.iter().zip(encoders).enumerate() {
        if col > 0 {
            out.push(',');
        }
        out.push_str(key);
        encoder.encode(row, out);
    }
    out.push('}');
}

/// Serialize a stream of result chunks
///
/// Iteration stops at the end of the stream or at the first empty chunk.
pub fn serialize_chunks<I>(schema: &Schema, chunks: I) -> String
where
    I: IntoIterator<Item = RecordBatch>,
{
    let keys = ColumnKeys::new(schema);
    let mut out = String::from("[");
    let mut rows = 0usize;

    for chunk in chunks {
        if chunk.num_rows() == 0 {
            break;
        }
        let encoders = chunk_encoders(schema, &chunk);
        for row in 0..chunk.num_rows() {
            if rows > 0 {
                out.push(',');
            }
            write_record(&mut out, &keys, &encoders, row);
            rows += 1;
        }
    }

    out.push(']');
    debug!(rows, bytes = out.len(), "serialized chunked result");
    out
}

/// A fully fetched result with random access by row index
pub struct MaterializedResult {
    schema: SchemaRef,
    chunks: Vec<RecordBatch>,
    /// First global row index of each chunk
    starts: Vec<usize>,
    row_count: usize,
}

impl MaterializedResult {
    /// Collect chunks up to the end of the stream or the first empty chunk
    pub fn new<I>(schema: SchemaRef, chunks: I) -> Self
    where
        I: IntoIterator<Item = RecordBatch>,
    {
        let mut kept = Vec::new();
        let mut starts = Vec::new();
        let mut row_count = 0usize;
        for chunk in chunks {
            if chunk.num_rows() == 0 {
                break;
            }
            starts.push(row_count);
            row_count += chunk.num_rows();
            kept.push(chunk);
        }
        Self {
            schema,
            chunks: kept,
            starts,
            row_count,
        }
    }

    /// Result schema (column names and types)
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Total number of rows
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.schema.fields().len()
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect()
    }

    /// Map a global row index to (chunk, row within chunk)
    fn locate(&self, row: usize) -> Option<(usize, usize)> {
        if row >= self.row_count {
            return None;
        }
        let chunk = self.starts.partition_point(|&start| start <= row) - 1;
        Some((chunk, row - self.starts[chunk]))
    }

    /// Encoded literal of a single cell
    pub fn value_json(&self, column: usize, row: usize) -> Option<String> {
        let (chunk, offset) = self.locate(row)?;
        let array = self.chunks[chunk].columns().get(column)?;
        let field = self.schema.fields().get(column)?;
        let mut out = String::new();
        ColumnEncoder::with_field(array.as_ref(), field).encode(offset, &mut out);
        Some(out)
    }

    /// Serialize every row by index
    pub fn serialize(&self) -> String {
        let keys = ColumnKeys::new(&self.schema);
        let encoders: Vec<Vec<ColumnEncoder<'_>>> = self
            .chunks
            .iter()
            .map(|chunk| chunk_encoders(&self.schema, chunk))
            .collect();
        let mut out = String::from("[");

        for row in 0..self.row_count {
            let Some((chunk, offset)) = self.locate(row) else {
                break;
            };
            if row > 0 {
                out.push(',');
            }
            write_record(&mut out, &keys, &encoders[chunk], offset);
        }

        out.push(']');
        debug!(
            rows = self.row_count,
            bytes = out.len(),
            "serialized materialized result"
        );
        out
    }
}

/// Payload reported for statements that do not return rows
pub fn changes_json(changes: u64) -> String {
    format!("{{\"changes\":{}}}", changes)
}

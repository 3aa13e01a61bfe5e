use anyhow::{Context, Result};
use duckbridge::manager::export_path;
use duckbridge::ParquetExport;
use std::path::PathBuf;

use crate::cli_utils::Target;

pub fn cmd_export(
    target: &Target,
    table: String,
    dest: PathBuf,
    compression: Option<String>,
) -> Result<()> {
    let (_db, conn) = target.open()?;
    let path = export_path(&dest, &table);

    let row_count = conn
        .export_parquet(&table, &path, compression.as_deref())
        .with_context(|| format!("Failed to export table: {}", table))?;

    let export = ParquetExport { path, row_count };
    println!("{}", serde_json::to_string(&export)?);
    Ok(())
}

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli_utils::Target;

pub fn cmd_tables(target: &Target) -> Result<()> {
    let (_db, conn) = target.open()?;
    let tables = conn.list_tables().context("Failed to list tables")?;
    println!("{}", json!({ "tables": tables }));
    Ok(())
}

use anyhow::{Context, Result};
use duckbridge::BindingStore;

use crate::cli_utils::{print_json, Target};

pub fn cmd_query(target: &Target, sql: String, params: Option<String>, pretty: bool) -> Result<()> {
    let (_db, conn) = target.open()?;

    let json = match params {
        Some(params) => {
            let mut bindings = BindingStore::new();
            bindings
                .bind_json(&params)
                .context("Failed to parse --params")?;
            conn.query_with_params(&sql, &bindings)
        }
        None => conn.query(&sql),
    }
    .with_context(|| format!("Query failed: {}", sql))?;

    print_json(&json, pretty)
}

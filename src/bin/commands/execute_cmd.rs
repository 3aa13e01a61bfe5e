use anyhow::{Context, Result};
use duckbridge::serializer::changes_json;
use duckbridge::BindingStore;

use crate::cli_utils::Target;

pub fn cmd_execute(target: &Target, sql: String, params: Option<String>, batch: bool) -> Result<()> {
    let (_db, conn) = target.open()?;

    if batch {
        conn.execute_batch(&sql)
            .with_context(|| format!("Script failed: {}", sql))?;
        return Ok(());
    }

    let changes = match params {
        Some(params) => {
            let mut bindings = BindingStore::new();
            bindings
                .bind_json(&params)
                .context("Failed to parse --params")?;
            conn.run(&sql, &bindings)
        }
        None => conn.execute(&sql),
    }
    .with_context(|| format!("Statement failed: {}", sql))?;

    println!("{}", changes_json(changes as u64));
    Ok(())
}

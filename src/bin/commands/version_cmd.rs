use anyhow::Result;
use serde_json::json;

pub fn cmd_version() -> Result<()> {
    println!(
        "{}",
        json!({
            "duckbridge": duckbridge::VERSION,
            "duckdb": duckbridge::engine::engine_version(),
        })
    );
    Ok(())
}

use anyhow::{Context, Result};
use duckbridge::{Connection, Database, OpenOptions};

/// Database selected on the command line
pub struct Target {
    pub database: String,
    pub load_extensions: bool,
}

impl Target {
    /// Open the database and a session on it
    ///
    /// The database is returned alongside the session so it stays open for
    /// the duration of the command.
    pub fn open(&self) -> Result<(Database, Connection)> {
        let options = if self.load_extensions {
            OpenOptions::default()
        } else {
            OpenOptions::without_extensions()
        };
        let db = Database::open(Some(self.database.as_str()), &options)
            .with_context(|| format!("Failed to open database: {}", self.database))?;
        let conn = db.connect().context("Failed to connect")?;
        Ok((db, conn))
    }
}

/// Print a JSON payload, optionally re-indented
pub fn print_json(json: &str, pretty: bool) -> Result<()> {
    if pretty {
        let value: serde_json::Value =
            serde_json::from_str(json).context("Result is not valid JSON")?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", json);
    }
    Ok(())
}

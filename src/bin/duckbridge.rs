mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{cmd_execute, cmd_export, cmd_query, cmd_tables, cmd_version};

#[derive(Parser)]
#[command(name = "duckbridge")]
#[command(
    about = "Run SQL against DuckDB and print results as JSON",
    long_about = "duckbridge - Run SQL against an embedded DuckDB database\n\n\
    Prints results in the same JSON shape the C API hands to host applications:\n\
    an array of row objects for queries and {\"changes\":N} for statements.\n\n\
    Examples:\n\
      duckbridge query 'SELECT 42 AS answer'\n\
      duckbridge -d app.duckdb execute 'CREATE TABLE t(a INT, b TEXT)'\n\
      duckbridge -d app.duckdb execute 'INSERT INTO t VALUES (?, ?)' --params '[1, \"x\"]'\n\
      duckbridge -d app.duckdb tables\n\
      duckbridge -d app.duckdb export t out/ --compression zstd"
)]
#[command(version)]
struct Cli {
    /// Database file (default: in-memory)
    #[arg(short, long, global = true, default_value = ":memory:")]
    database: String,

    /// Do not load the default extensions at open
    #[arg(long, global = true)]
    no_extensions: bool,

    /// Increase log verbosity on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query and print its rows
    Query {
        /// SQL text
        #[arg(value_name = "SQL")]
        sql: String,

        /// Positional parameters as a JSON array
        #[arg(long)]
        params: Option<String>,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Run a statement and print the number of changed rows
    Execute {
        /// SQL text
        #[arg(value_name = "SQL")]
        sql: String,

        /// Positional parameters as a JSON array
        #[arg(long, conflicts_with = "batch")]
        params: Option<String>,

        /// Treat SQL as a script of several statements
        #[arg(long)]
        batch: bool,
    },

    /// List the tables of the database
    Tables,

    /// Export a table to a Parquet file
    Export {
        /// Table to export
        #[arg(value_name = "TABLE")]
        table: String,

        /// Output file, or directory to create a timestamped file in
        #[arg(value_name = "DEST")]
        dest: PathBuf,

        /// Compression: snappy (default), gzip, zstd, lz4, brotli, uncompressed
        #[arg(long)]
        compression: Option<String>,
    },

    /// Show library and engine versions
    Version,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let target = cli_utils::Target {
        database: cli.database,
        load_extensions: !cli.no_extensions,
    };

    match cli.command {
        Commands::Query {
            sql,
            params,
            pretty,
        } => cmd_query(&target, sql, params, pretty),
        Commands::Execute { sql, params, batch } => cmd_execute(&target, sql, params, batch),
        Commands::Tables => cmd_tables(&target),
        Commands::Export {
            table,
            dest,
            compression,
        } => cmd_export(&target, table, dest, compression),
        Commands::Version => cmd_version(),
    }
}

pub mod execute_cmd;
pub mod export_cmd;
pub mod query_cmd;
pub mod tables_cmd;
pub mod version_cmd;

pub use execute_cmd::cmd_execute;
pub use export_cmd::cmd_export;
pub use query_cmd::cmd_query;
pub use tables_cmd::cmd_tables;
pub use version_cmd::cmd_version;

//! SQLite support for the interceptor
//!
//! Builds a SqlCommand straight from a live rusqlite connection so call
//! sites wrap their queries without assembling metadata by hand.

use rusqlite::Connection;

use super::SqlCommand;

/// Describe a statement about to run on a SQLite connection
///
/// The database name comes from the file name behind the connection
/// ("memory" for in-memory databases). SQLite runs in-process, so the data
/// source is always the local host.
pub fn command_from_connection(conn: &Connection, statement: impl Into<String>) -> SqlCommand {
    let database = match conn.path() {
        Some(path) if !path.is_empty() => std::path::Path::new(path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string()),
        _ => "memory".to_string(),
    };

    SqlCommand::new("sqlite", database, "localhost", statement)
        .with_server_version(rusqlite::version())
}

use rusqlite::{Connection, OpenFlags};

use crate::constants;

/// Path of the SQLite file: the `sqlite_file` environment variable, or the
/// default when unset.
pub fn database_path() -> String {
    std::env::var(constants::SQLITE_FILE_VAR)
        .unwrap_or_else(|_| constants::DEFAULT_SQLITE_FILE.to_string())
}

/// Opens the SQLite file and switches it to WAL mode.
pub fn init_connection() -> Result<Connection, String> {
    let conn = Connection::open_with_flags(
        database_path(),
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    );
    match conn {
        Ok(conn) => match conn.query_row("PRAGMA journal_mode=WAL;", [], |_row| Ok(())) {
            Ok(_) => Ok(conn),
            Err(e) => Err(format!("fail to execute PRAGMA journal_mode=WAL. {}", e)),
        },
        Err(e) => Err(format!("fail to open sqlite file. {}", e)),
    }
}

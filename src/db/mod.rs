// Database module

pub mod migrations;
pub mod schema;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use anyhow::Result;

use crate::constants::{CASEFILE_FOLDER, DB_FILENAME};

/// Open or create a database at the given path
pub fn open_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)?;

    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    // Enable foreign keys (must be done per connection)
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    // Enable WAL mode for concurrent commits from separate connections
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    // Run migrations
    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Open a short-lived connection to the library DB under `library_root`.
pub fn open_library_db_connection(library_root: &Path) -> Result<Connection> {
    open_db(&get_db_path(library_root))
}

/// Get the database path for a library root
pub fn get_db_path(library_root: &Path) -> PathBuf {
    get_casefile_path(library_root).join(DB_FILENAME)
}

/// Get the .casefile folder path for a library root
pub fn get_casefile_path(library_root: &Path) -> PathBuf {
    library_root.join(CASEFILE_FOLDER)
}

/// Initialize library folder structure
pub fn init_library_folders(library_root: &Path) -> Result<()> {
    use crate::constants::*;

    let casefile = get_casefile_path(library_root);
    std::fs::create_dir_all(&casefile)?;
    std::fs::create_dir_all(casefile.join(DERIVED_FOLDER))?;
    std::fs::create_dir_all(casefile.join(STAGING_FOLDER))?;
    std::fs::create_dir_all(library_root.join(ORIGINALS_FOLDER))?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn open_test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    migrations::run_migrations(&conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_library_db_lives_in_casefile_folder() {
        let tmp = TempDir::new().unwrap();
        init_library_folders(tmp.path()).unwrap();

        let db_path = get_db_path(tmp.path());
        assert_eq!(db_path.parent(), Some(get_casefile_path(tmp.path()).as_path()));
        assert!(get_casefile_path(tmp.path()).join(crate::constants::DERIVED_FOLDER).is_dir());

        open_library_db_connection(tmp.path()).unwrap();
        assert!(db_path.exists());
    }
}

//! Read-only access to the debug database.
//!
//! The generator emits a sqlite database next to the produced design; its
//! `breakpoint` table (`filename`, `line_num`, `id`) lists every location
//! the simulator can actually pause at. The table is only ever read.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::error::Result;

/// Read-only view of the debug database.
pub struct DebugDb {
    conn: Connection,
}

impl DebugDb {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    /// Every file that carries at least one settable breakpoint.
    pub fn files(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT filename FROM breakpoint ORDER BY filename")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut files = Vec::new();
        for row in rows {
            files.push(row?);
        }
        Ok(files)
    }

    /// Whether the given line is a legal breakpoint target.
    pub fn line_has_breakpoint(&self, filename: &str, line: u64) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM breakpoint WHERE filename = ?1 AND line_num = ?2 LIMIT 1")?;
        let mut rows = stmt.query(rusqlite::params![filename, line])?;
        Ok(rows.next()?.is_some())
    }

    /// Column offsets a breakpoint can be set at on the given line.
    ///
    /// The table carries no column information, so a line with any entry
    /// reports the single offset 0.
    pub fn breakpoint_columns(&self, filename: &str, line: u64) -> Result<Vec<u64>> {
        if self.line_has_breakpoint(filename, line)? {
            Ok(vec![0])
        } else {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_db(path: &Path) {
        let conn = Connection::open(path).expect("create test db");
        conn.execute_batch(
            "CREATE TABLE breakpoint (filename TEXT, line_num INTEGER, id INTEGER);
             INSERT INTO breakpoint VALUES ('/design/top.py', 10, 1);
             INSERT INTO breakpoint VALUES ('/design/top.py', 12, 2);
             INSERT INTO breakpoint VALUES ('/design/alu.py', 7, 3);",
        )
        .expect("seed test db");
    }

    #[test]
    fn reads_breakpoint_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("debug.db");
        seed_db(&path);

        let db = DebugDb::open(&path).expect("open read-only");
        assert_eq!(db.files().expect("files"), vec!["/design/alu.py", "/design/top.py"]);
        assert!(db.line_has_breakpoint("/design/top.py", 10).expect("probe"));
        assert!(!db.line_has_breakpoint("/design/top.py", 11).expect("probe"));
        assert_eq!(
            db.breakpoint_columns("/design/alu.py", 7).expect("columns"),
            vec![0]
        );
        assert!(db
            .breakpoint_columns("/design/alu.py", 8)
            .expect("columns")
            .is_empty());
    }
}

use super::SchemaGenerator;
use crate::errors::{Error, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Reads schema information straight out of a SQLite file.
///
/// Supported schema types:
/// - `ddl-schema` / `ddl`: the stored `CREATE` statements, one per block.
/// - `column-list`: one `table(col TYPE, ...)` line per table.
#[derive(Debug, Clone, Default)]
pub struct SqliteSchemaGenerator;

impl SqliteSchemaGenerator {
    pub fn new() -> Self {
        Self
    }

    fn open(db_path: &Path) -> Result<Connection> {
        if !db_path.is_file() {
            return Err(Error::schema_generation(
                db_path.display().to_string(),
                "database file not found",
            ));
        }
        Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| sql_err(db_path, e))
    }

    fn ddl(conn: &Connection, db_path: &Path) -> Result<String> {
        let mut stmt = conn
            .prepare(
                "SELECT sql FROM sqlite_master
                 WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%'",
            )
            .map_err(|e| sql_err(db_path, e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| sql_err(db_path, e))?;

        let mut blocks = Vec::new();
        for r in rows {
            let sql = r.map_err(|e| sql_err(db_path, e))?;
            let sql = sql.trim().trim_end_matches(';');
            blocks.push(format!("{};", sql));
        }
        Ok(blocks.join("\n\n"))
    }

    fn column_list(conn: &Connection, db_path: &Path) -> Result<String> {
        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                )
                .map_err(|e| sql_err(db_path, e))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| sql_err(db_path, e))?;
            let names = rows
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| sql_err(db_path, e))?;
            names
        };

        let mut lines = Vec::with_capacity(tables.len());
        for table in tables {
            let pragma = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
            let mut stmt = conn.prepare(&pragma).map_err(|e| sql_err(db_path, e))?;
            let cols = stmt
                .query_map([], |row| {
                    let name: String = row.get(1)?;
                    let ty: String = row.get(2)?;
                    Ok(if ty.is_empty() {
                        name
                    } else {
                        format!("{} {}", name, ty)
                    })
                })
                .map_err(|e| sql_err(db_path, e))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| sql_err(db_path, e))?;
            lines.push(format!("{}({})", table, cols.join(", ")));
        }
        Ok(lines.join("\n"))
    }
}

impl SchemaGenerator for SqliteSchemaGenerator {
    fn generate(&self, db_path: &Path, schema_type: &str) -> Result<String> {
        let conn = Self::open(db_path)?;
        match schema_type {
            "ddl-schema" | "ddl" => Self::ddl(&conn, db_path),
            "column-list" => Self::column_list(&conn, db_path),
            other => Err(Error::schema_generation(
                db_path.display().to_string(),
                format!("unsupported schema type: {}", other),
            )),
        }
    }
}

fn sql_err(db_path: &Path, e: rusqlite::Error) -> Error {
    Error::schema_generation(db_path.display().to_string(), e.to_string())
}

use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

pub const DB_FILE_NAME: &str = "saathi.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    ensure_schema(&conn)?;
    Ok(conn)
}

fn ensure_schema(conn: &Connection) -> anyhow::Result<()> {
    // One row per named collection; the value is the whole collection as JSON.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

pub fn record_get_raw(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let v = conn
        .query_row(
            "SELECT value_json FROM records WHERE key = ?",
            [key],
            |r| r.get::<_, String>(0),
        )
        .optional()?;
    Ok(v)
}

pub fn record_set_raw(conn: &Connection, key: &str, value_json: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO records(key, value_json, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
        (key, value_json, &now),
    )?;
    Ok(())
}

pub fn records_all_raw(conn: &Connection) -> anyhow::Result<BTreeMap<String, String>> {
    let mut stmt = conn.prepare("SELECT key, value_json FROM records ORDER BY key")?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().collect())
}

pub fn records_replace_all(
    conn: &mut Connection,
    records: &BTreeMap<String, String>,
) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM records", [])?;
    for (key, value_json) in records {
        tx.execute(
            "INSERT INTO records(key, value_json, updated_at) VALUES(?, ?, ?)",
            (key, value_json, &now),
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn records_clear(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("DELETE FROM records", [])?;
    Ok(())
}

use super::{Db, deserialize_vector, models::*, serialize_vector};
use rusqlite::{OptionalExtension, Result, params};

const SCORER_KEY: &str = "scorer";

impl Db {
    /// Replace every stored entry in one transaction.
    ///
    /// Readers of the database never observe a half-written entry set, and a
    /// rebuild never leaves rows from the previous build behind.
    pub fn replace_entries(&mut self, scorer: &str, entries: &[IndexedEntry]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entries (id, document, file_path, start_line, end_line, symbol, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.id,
                    entry.document,
                    entry.metadata.file_path,
                    entry.metadata.start_line as i64,
                    entry.metadata.end_line as i64,
                    entry.metadata.symbol,
                    serialize_vector(&entry.embedding),
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO index_meta (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![SCORER_KEY, scorer],
        )?;
        tx.commit()
    }

    /// All entries in insertion order.
    pub fn load_entries(&self) -> Result<Vec<IndexedEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, document, file_path, start_line, end_line, symbol, embedding \
             FROM entries ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let embedding: Vec<u8> = row.get(6)?;
            Ok(IndexedEntry {
                id: row.get(0)?,
                document: row.get(1)?,
                metadata: EntryMetadata {
                    file_path: row.get(2)?,
                    start_line: row.get::<_, i64>(3)? as usize,
                    end_line: row.get::<_, i64>(4)? as usize,
                    symbol: row.get(5)?,
                },
                embedding: deserialize_vector(&embedding),
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn count_entries(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Scorer fingerprint recorded by the last [`Db::replace_entries`], if any.
    pub fn stored_scorer(&self) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?",
                params![SCORER_KEY],
                |row| row.get(0),
            )
            .optional()
    }
}

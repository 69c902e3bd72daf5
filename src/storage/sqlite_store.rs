use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{KeyValueStore, StorageEvent};
use crate::error::Result;

const STORAGE_DB: &str = "storage.db";
/// Change rows kept behind the newest one when a handle opens.
const CHANGE_RETENTION: i64 = 1000;
/// A handle refreshes its cursor row at least this often while polling.
const HEARTBEAT_SECS: i64 = 60;
/// Cursor rows not refreshed for this long belong to handles that are gone.
const STALE_AFTER_SECS: i64 = 600;

/// SQLite-backed store shared by every process that opens the same origin
/// directory. Each handle is one "tab": it has its own id and reads the
/// change log written by the others.
///
/// Every open handle publishes how far it has read in the `cursors` table.
/// Pruning never removes a change some live handle has not read yet; a handle
/// that finds its unread changes gone anyway resyncs from the items.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
    tab_id: Uuid,
    cursor: i64,
    /// Position and time of the last cursor row written by this handle
    reported: Option<(i64, i64)>,
}

impl SqliteStore {
    /// Open or create the store for an origin directory
    pub fn open(origin_dir: &Path) -> Result<Self> {
        fs::create_dir_all(origin_dir)?;
        let path = origin_dir.join(STORAGE_DB);
        let conn = Connection::open(&path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let mut store = Self {
            conn,
            path,
            tab_id: Uuid::new_v4(),
            cursor: 0,
            reported: None,
        };
        store.init_schema()?;
        store.cursor = Self::latest_change(&store.conn)?;
        store.report_cursor()?;
        store.prune_changes(CHANGE_RETENTION)?;

        tracing::debug!(tab = %store.tab_id, path = %store.path.display(), "opened storage");
        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        // journal_mode reports the resulting mode as a row
        let _mode: String = self
            .conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;

        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS items (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS changes (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT,
                old_value TEXT,
                new_value TEXT,
                source TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cursors (
                tab TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                seen_at INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Highest sequence number ever handed out, pruned rows included.
    fn latest_change(conn: &Connection) -> Result<i64> {
        let seq: Option<i64> = conn
            .query_row(
                "SELECT seq FROM sqlite_sequence WHERE name = 'changes'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(seq.unwrap_or(0))
    }

    /// Publish this handle's cursor when it moved or the last report is old.
    fn report_cursor(&mut self) -> Result<()> {
        let now = Utc::now().timestamp();
        if let Some((position, at)) = self.reported {
            if position == self.cursor && now - at < HEARTBEAT_SECS {
                return Ok(());
            }
        }
        self.conn.execute(
            "INSERT INTO cursors (tab, position, seen_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(tab) DO UPDATE SET position = excluded.position, seen_at = excluded.seen_at",
            params![self.tab_id.to_string(), self.cursor, now],
        )?;
        self.reported = Some((self.cursor, now));
        Ok(())
    }

    /// Drop change rows more than `retention` behind this handle's cursor
    /// that every live handle has already read.
    fn prune_changes(&self, retention: i64) -> Result<usize> {
        let stale = self.conn.execute(
            "DELETE FROM cursors WHERE seen_at < ?1",
            params![Utc::now().timestamp() - STALE_AFTER_SECS],
        )?;
        if stale > 0 {
            tracing::debug!(stale, "forgot cursors of closed tabs");
        }

        let removed = self.conn.execute(
            "DELETE FROM changes
             WHERE seq <= ?1 AND seq <= COALESCE((SELECT MIN(position) FROM cursors), ?1)",
            params![self.cursor - retention],
        )?;
        if removed > 0 {
            tracing::debug!(removed, "pruned change log");
        }
        Ok(removed)
    }

    /// Identifier of this handle in the change log.
    pub fn tab_id(&self) -> Uuid {
        self.tab_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record_change(
        tx: &rusqlite::Transaction<'_>,
        source: &Uuid,
        key: Option<&str>,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<()> {
        tx.execute(
            "INSERT INTO changes (key, old_value, new_value, source) VALUES (?1, ?2, ?3, ?4)",
            params![key, old_value, new_value, source.to_string()],
        )?;
        Ok(())
    }

    /// Changes after `cursor` made by other handles, oldest first.
    fn read_changes(conn: &Connection, cursor: i64, own: &str) -> Result<Vec<StorageEvent>> {
        let mut stmt = conn.prepare(
            "SELECT key, old_value, new_value, source FROM changes
             WHERE seq > ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![cursor], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (key, old_value, new_value, source) = row?;
            if source == own {
                continue;
            }
            events.push(StorageEvent {
                key,
                old_value,
                new_value,
            });
        }
        Ok(events)
    }

    /// Every item as a fresh write, for a handle whose unread changes were pruned.
    fn snapshot(conn: &Connection) -> Result<Vec<StorageEvent>> {
        let mut stmt = conn.prepare("SELECT key, value FROM items ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok(StorageEvent::set(
                row.get::<_, String>(0)?,
                None,
                row.get::<_, String>(1)?,
            ))
        })?;
        let mut events = Vec::new();
        for event in rows {
            events.push(event?);
        }
        Ok(events)
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if let Err(e) = self.conn.execute(
            "DELETE FROM cursors WHERE tab = ?1",
            params![self.tab_id.to_string()],
        ) {
            tracing::debug!(tab = %self.tab_id, error = %e, "cannot release change cursor");
        }
    }
}

impl KeyValueStore for SqliteStore {
    fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn key(&self, index: usize) -> Result<Option<String>> {
        let key = self
            .conn
            .query_row(
                "SELECT key FROM items ORDER BY rowid LIMIT 1 OFFSET ?1",
                params![index as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key)
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM items WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let source = self.tab_id;
        let tx = self.conn.transaction()?;
        let old_value: Option<String> = tx
            .query_row(
                "SELECT value FROM items WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if old_value.as_deref() == Some(value) {
            return Ok(());
        }

        if old_value.is_some() {
            tx.execute(
                "UPDATE items SET value = ?2 WHERE key = ?1",
                params![key, value],
            )?;
        } else {
            tx.execute(
                "INSERT INTO items (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        Self::record_change(&tx, &source, Some(key), old_value.as_deref(), Some(value))?;
        tx.commit()?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        let source = self.tab_id;
        let tx = self.conn.transaction()?;
        let old_value: Option<String> = tx
            .query_row(
                "SELECT value FROM items WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if old_value.is_none() {
            return Ok(());
        }

        tx.execute("DELETE FROM items WHERE key = ?1", params![key])?;
        Self::record_change(&tx, &source, Some(key), old_value.as_deref(), None)?;
        tx.commit()?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let source = self.tab_id;
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM items", [])?;
        if removed > 0 {
            Self::record_change(&tx, &source, None, None, None)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn poll_changes(&mut self) -> Result<Vec<StorageEvent>> {
        let own = self.tab_id.to_string();
        let tx = self.conn.transaction()?;
        let latest = Self::latest_change(&tx)?;
        if latest <= self.cursor {
            drop(tx);
            self.report_cursor()?;
            return Ok(Vec::new());
        }

        let oldest: Option<i64> = tx.query_row(
            "SELECT MIN(seq) FROM changes WHERE seq > ?1",
            params![self.cursor],
            |row| row.get(0),
        )?;
        let events = if oldest == Some(self.cursor + 1) {
            Self::read_changes(&tx, self.cursor, &own)?
        } else {
            tracing::warn!(
                tab = %self.tab_id,
                cursor = self.cursor,
                latest,
                "unread changes were pruned, resyncing from stored items"
            );
            Self::snapshot(&tx)?
        };
        tx.commit()?;

        self.cursor = latest;
        self.report_cursor()?;
        Ok(events)
    }
}

//! SQLite-backed alarm registry.
//!
//! Stands in for the platform alarm service when running from the CLI:
//! alarms are rows keyed by the text form of their [`AlarmKey`], and a
//! periodic pass over [`AlarmDb::due`] plays the role of the OS waking the app.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::data_dir;
use crate::alarm::{AlarmKey, AlarmPayload, AlarmScheduler, RegisteredAlarm};
use crate::error::{AlarmError, DatabaseError};
use crate::recovery::{BootRecovery, RecoveryReport};

/// Alarm registry stored at `~/.config/medminder/alarms.db`.
pub struct AlarmDb {
    conn: Mutex<Connection>,
}

impl AlarmDb {
    /// Open the registry in the data directory, creating it if needed.
    pub fn open() -> crate::error::Result<Self> {
        Ok(Self::open_at(&data_dir()?.join("alarms.db"))?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// In-memory registry (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS alarms (
                key          TEXT PRIMARY KEY,
                entity_id    TEXT NOT NULL,
                fire_at_ms   INTEGER NOT NULL,
                interval_ms  INTEGER,
                title        TEXT NOT NULL,
                body         TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alarms_fire_at ON alarms(fire_at_ms);
            CREATE INDEX IF NOT EXISTS idx_alarms_entity ON alarms(entity_id);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn upsert(
        &self,
        key: &AlarmKey,
        fire_at_ms: i64,
        interval_ms: Option<i64>,
        payload: &AlarmPayload,
    ) -> Result<(), rusqlite::Error> {
        self.conn().execute(
            "INSERT OR REPLACE INTO alarms (key, entity_id, fire_at_ms, interval_ms, title, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key.to_string(),
                key.entity_id(),
                fire_at_ms,
                interval_ms,
                payload.title,
                payload.body,
            ],
        )?;
        Ok(())
    }

    fn query(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<RegisteredAlarm>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (key, fire_at_ms, interval_ms, title, body) = row?;
            match key.parse::<AlarmKey>() {
                Ok(key) => out.push(RegisteredAlarm {
                    key,
                    fire_at_ms,
                    interval_ms,
                    payload: AlarmPayload { title, body },
                }),
                Err(e) => tracing::warn!(%key, error = %e, "skipping alarm row with bad key"),
            }
        }
        Ok(out)
    }

    /// All alarms, soonest first.
    pub fn list(&self) -> Result<Vec<RegisteredAlarm>, DatabaseError> {
        self.query(
            "SELECT key, fire_at_ms, interval_ms, title, body FROM alarms ORDER BY fire_at_ms, key",
            [],
        )
    }

    pub fn get(&self, key: &AlarmKey) -> Result<Option<RegisteredAlarm>, DatabaseError> {
        Ok(self
            .query(
                "SELECT key, fire_at_ms, interval_ms, title, body FROM alarms WHERE key = ?1",
                params![key.to_string()],
            )?
            .pop())
    }

    pub fn for_entity(&self, entity_id: &str) -> Result<Vec<RegisteredAlarm>, DatabaseError> {
        self.query(
            "SELECT key, fire_at_ms, interval_ms, title, body FROM alarms
             WHERE entity_id = ?1 ORDER BY key",
            params![entity_id],
        )
    }

    /// Alarms whose fire time is at or before `now_ms`.
    pub fn due(&self, now_ms: i64) -> Result<Vec<RegisteredAlarm>, DatabaseError> {
        self.query(
            "SELECT key, fire_at_ms, interval_ms, title, body FROM alarms
             WHERE fire_at_ms <= ?1 ORDER BY fire_at_ms, key",
            params![now_ms],
        )
    }

    /// Record that an alarm went off at `now_ms`.
    ///
    /// Repeating alarms advance by whole intervals past `now_ms`; one-shot
    /// alarms are removed.
    pub fn mark_fired(&self, key: &AlarmKey, now_ms: i64) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let row: Option<(i64, Option<i64>)> = conn
            .query_row(
                "SELECT fire_at_ms, interval_ms FROM alarms WHERE key = ?1",
                params![key.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((fire_at_ms, Some(interval))) if interval > 0 => {
                let missed = (now_ms - fire_at_ms).max(0) / interval + 1;
                conn.execute(
                    "UPDATE alarms SET fire_at_ms = ?1 WHERE key = ?2",
                    params![fire_at_ms + missed * interval, key.to_string()],
                )?;
            }
            Some(_) => {
                conn.execute("DELETE FROM alarms WHERE key = ?1", params![key.to_string()])?;
            }
            None => {}
        }
        Ok(())
    }

    pub fn count(&self) -> Result<usize, DatabaseError> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM alarms", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Remove every alarm. Used before a full re-derive.
    pub fn clear(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn().execute("DELETE FROM alarms", [])?)
    }

    /// Simulate a device restart: every registration is dropped, then
    /// `recovery` re-derives what the backend still wants.
    ///
    /// `recovery` must schedule into this registry.
    pub async fn reboot(&self, recovery: &BootRecovery) -> Result<RecoveryReport, DatabaseError> {
        let dropped = self.clear()?;
        tracing::info!(dropped, "alarm registry cleared for restart");
        Ok(recovery.run().await)
    }
}

impl AlarmScheduler for AlarmDb {
    fn schedule_repeating(
        &self,
        key: &AlarmKey,
        first_fire_ms: i64,
        interval_ms: i64,
        payload: &AlarmPayload,
    ) -> Result<(), AlarmError> {
        Ok(self.upsert(key, first_fire_ms, Some(interval_ms), payload)?)
    }

    fn schedule_once(
        &self,
        key: &AlarmKey,
        fire_ms: i64,
        payload: &AlarmPayload,
    ) -> Result<(), AlarmError> {
        Ok(self.upsert(key, fire_ms, None, payload)?)
    }

    fn cancel(&self, key: &AlarmKey) -> Result<(), AlarmError> {
        self.conn()
            .execute("DELETE FROM alarms WHERE key = ?1", params![key.to_string()])?;
        Ok(())
    }
}

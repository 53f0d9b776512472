//! Local session log. A dedicated worker thread owns the SQLite connection;
//! callers get an async facade over a command channel, so no connection ever
//! crosses an await point.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, Row};
use tokio::sync::oneshot;

mod migrations;

use migrations::run_migrations;

use crate::models::{Mood, SessionKind, SessionRecord};
use crate::stats::{self, SessionStats};

/// Persistence side of the sequencer. Completed sessions are written once;
/// the read path feeds the history view after each log.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn log_session(&self, record: &SessionRecord) -> Result<()>;
    async fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>>;
    async fn total_stats(&self, user_id: &str) -> Result<SessionStats>;
}

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn kind_from_str(value: &str) -> Result<SessionKind> {
    SessionKind::parse(value).ok_or_else(|| anyhow!("unknown session kind '{value}'"))
}

fn mood_from_str(value: Option<String>) -> Result<Option<Mood>> {
    match value {
        None => Ok(None),
        Some(tag) => Mood::parse(&tag)
            .map(Some)
            .ok_or_else(|| anyhow!("unknown mood '{tag}'")),
    }
}

fn row_to_record(row: &Row<'_>) -> Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get::<_, String>(0)?,
        user_id: row.get::<_, String>(1)?,
        kind: kind_from_str(&row.get::<_, String>(2)?)?,
        exercise_id: row.get::<_, String>(3)?,
        started_at: parse_datetime(&row.get::<_, String>(4)?)?,
        duration_seconds: u64::try_from(row.get::<_, i64>(5)?)
            .map_err(|_| anyhow!("negative duration"))?,
        cycles_completed: u32::try_from(row.get::<_, i64>(6)?)
            .map_err(|_| anyhow!("negative cycle count"))?,
        mood_before: mood_from_str(row.get::<_, Option<String>>(7)?)?,
        mood_after: mood_from_str(row.get::<_, Option<String>>(8)?)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

const RECORD_COLUMNS: &str = "id, user_id, kind, exercise_id, started_at, duration_seconds, \
     cycles_completed, mood_before, mood_after, created_at";

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("stillpoint-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Session log initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_session(&self, record: &SessionRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, kind, exercise_id, started_at, \
                 duration_seconds, cycles_completed, mood_before, mood_after, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.user_id,
                    record.kind.as_str(),
                    record.exercise_id,
                    record.started_at.to_rfc3339(),
                    i64::try_from(record.duration_seconds)
                        .map_err(|_| anyhow!("duration exceeds SQLite INTEGER range"))?,
                    i64::from(record.cycles_completed),
                    record.mood_before.map(|m| m.as_str()),
                    record.mood_after.map(|m| m.as_str()),
                    record.created_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session record")?;
            Ok(())
        })
        .await
    }

    pub async fn list_recent_sessions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionRecord>> {
        let user_id = user_id.to_string();
        let limit = limit as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM sessions
                 WHERE user_id = ?1
                 ORDER BY started_at DESC
                 LIMIT ?2"
            ))?;

            let mut rows = stmt.query(params![user_id, limit])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn stats_for_user(&self, user_id: &str) -> Result<SessionStats> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let (total_sessions, total_seconds): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(duration_seconds), 0)
                 FROM sessions WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let mut stmt =
                conn.prepare("SELECT started_at FROM sessions WHERE user_id = ?1")?;
            let mut rows = stmt.query(params![user_id])?;
            let mut started = Vec::new();
            while let Some(row) = rows.next()? {
                started.push(parse_datetime(&row.get::<_, String>(0)?)?);
            }

            let now = Utc::now();
            Ok(SessionStats {
                total_sessions: total_sessions as u64,
                total_seconds: total_seconds as u64,
                sessions_this_week: stats::sessions_this_week(&started, now),
                current_streak_days: stats::current_streak_days(&started, now.date_naive()),
            })
        })
        .await
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn log_session(&self, record: &SessionRecord) -> Result<()> {
        self.insert_session(record).await
    }

    async fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>> {
        self.list_recent_sessions(user_id, limit).await
    }

    async fn total_stats(&self, user_id: &str) -> Result<SessionStats> {
        self.stats_for_user(user_id).await
    }
}

//! Database handle shared by the server and its modules.
//!
//! `DbHandle` is constructed once at startup from a DSN and passed down
//! explicitly. It connects lazily: the first caller that needs a connection
//! opens the SeaORM pool (running the registered on-connect hook, e.g.
//! migrations), and later callers reuse it. A failed connect is reported to
//! that caller only; the next call tries again, so the process can start and
//! serve requests while the database is still unreachable.
//!
//! # Example
//! ```rust,no_run
//! # async fn demo() -> db::Result<()> {
//! use db::{ConnectOpts, DbHandle};
//!
//! let db = DbHandle::new("sqlite::memory:", ConnectOpts::default())?;
//! let conn = db.connect().await?;
//! // use `conn` with SeaORM entities
//! # drop(conn);
//! db.close().await;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use futures::future::{BoxFuture, FutureExt, Shared};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::{debug, info, warn};

pub type Result<T> = std::result::Result<T, DbError>;

/// Cloneable so one failed connect attempt can be reported to every caller
/// that waited on it.
#[derive(Debug, Clone, Error)]
pub enum DbError {
    #[error("Unsupported database DSN: {0}")]
    UnsupportedDsn(String),

    #[error("Database handle is closed")]
    Closed,

    #[error(transparent)]
    Sea(Arc<DbErr>),
}

impl From<DbErr> for DbError {
    fn from(e: DbErr) -> Self {
        DbError::Sea(Arc::new(e))
    }
}

/// Database backend, detected from the DSN scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

/// Pool tuning knobs. `None` leaves the driver default in place.
#[derive(Debug, Clone)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to open a new connection.
    pub connect_timeout: Option<Duration>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Emit per-statement logs from sqlx.
    pub sqlx_logging: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            connect_timeout: Some(Duration::from_secs(5)),
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            sqlx_logging: false,
        }
    }
}

type OnConnect =
    Box<dyn Fn(DatabaseConnection) -> BoxFuture<'static, std::result::Result<(), DbErr>> + Send + Sync>;

/// One connect attempt, awaited by every caller that arrives while it runs.
type Attempt = Shared<BoxFuture<'static, Result<DatabaseConnection>>>;

struct Inner {
    engine: DbEngine,
    dsn: String,
    opts: ConnectOpts,
    conn: ArcSwapOption<DatabaseConnection>,
    on_connect: Option<OnConnect>,
    closed: AtomicBool,
}

pub struct DbHandle {
    inner: Arc<Inner>,
    attempt: Mutex<Option<Attempt>>,
}

impl std::fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHandle")
            .field("engine", &self.inner.engine)
            .field("dsn", &redact_dsn(&self.inner.dsn))
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl DbHandle {
    /// Detect engine by DSN.
    ///
    /// Note: we only check scheme prefixes and don't mutate the tail (credentials etc.).
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        // Trim only leading spaces/newlines to be forgiving with env files.
        let s = dsn.trim_start();

        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("mysql://") || s.starts_with("mariadb://") {
            Ok(DbEngine::MySql)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnsupportedDsn(redact_dsn(s)))
        }
    }

    /// Build a handle without touching the network; see [`DbHandle::connect`].
    pub fn new(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        Ok(Self {
            inner: Arc::new(Inner {
                engine,
                dsn: dsn.trim().to_owned(),
                opts,
                conn: ArcSwapOption::empty(),
                on_connect: None,
                closed: AtomicBool::new(false),
            }),
            attempt: Mutex::new(None),
        })
    }

    /// Register a hook that runs on every freshly opened pool before it is
    /// published (schema migrations live here). A failing hook fails the connect.
    ///
    /// Must be called before the handle is shared.
    pub fn with_on_connect<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(DatabaseConnection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), DbErr>> + Send + 'static,
    {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.on_connect = Some(Box::new(move |conn| Box::pin(hook(conn)))),
            None => warn!("on-connect hook ignored: handle already shared"),
        }
        self
    }

    /// Return the live connection, opening it first if needed.
    ///
    /// Concurrent callers share a single in-flight attempt and all see its
    /// outcome; a failed attempt is dropped so the next call starts afresh.
    pub async fn connect(&self) -> Result<DatabaseConnection> {
        if let Some(conn) = self.inner.current() {
            return Ok(conn);
        }
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(DbError::Closed);
        }

        let attempt = {
            let mut slot = self.attempt.lock().unwrap_or_else(PoisonError::into_inner);
            // A previous attempt may have published the pool meanwhile.
            if let Some(conn) = self.inner.current() {
                return Ok(conn);
            }
            slot.get_or_insert_with(|| self.inner.clone().open().boxed().shared())
                .clone()
        };

        let res = attempt.clone().await;

        let mut slot = self.attempt.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|cur| cur.ptr_eq(&attempt)) {
            *slot = None;
        }
        res
    }

    /// True once a pool has been opened and not yet closed.
    pub fn is_connected(&self) -> bool {
        self.inner.conn.load().is_some()
    }

    /// Close the pool (if open). Later `connect` calls fail with [`DbError::Closed`].
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner.shutdown_pool().await;
    }

    /// Get the backend.
    pub fn engine(&self) -> DbEngine {
        self.inner.engine
    }
}

impl Inner {
    fn current(&self) -> Option<DatabaseConnection> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        self.conn.load_full().map(|c| (*c).clone())
    }

    async fn open(self: Arc<Self>) -> Result<DatabaseConnection> {
        debug!(engine = ?self.engine, "opening database pool");
        let conn = Database::connect(self.connect_options()).await?;

        if let Some(hook) = &self.on_connect {
            if let Err(e) = hook(conn.clone()).await {
                close_quietly(conn).await;
                return Err(e.into());
            }
        }

        self.conn.store(Some(Arc::new(conn.clone())));
        // `close` may have run while the pool was opening.
        if self.closed.load(Ordering::Acquire) {
            self.shutdown_pool().await;
            return Err(DbError::Closed);
        }

        info!(engine = ?self.engine, dsn = %redact_dsn(&self.dsn), "database connected");
        Ok(conn)
    }

    async fn shutdown_pool(&self) {
        if let Some(conn) = self.conn.swap(None) {
            match (*conn).clone().close().await {
                Ok(()) => info!("database pool closed"),
                Err(e) => warn!(error = %e, "error while closing database pool"),
            }
        }
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.dsn.clone());
        opt.sqlx_logging(self.opts.sqlx_logging);

        if is_sqlite_memory(&self.dsn) {
            // Every pooled connection would otherwise get its own empty database.
            opt.max_connections(1).min_connections(1);
        } else {
            if let Some(n) = self.opts.max_conns {
                opt.max_connections(n);
            }
            if let Some(n) = self.opts.min_conns {
                opt.min_connections(n);
            }
        }
        if let Some(t) = self.opts.connect_timeout {
            opt.connect_timeout(t);
        }
        if let Some(t) = self.opts.acquire_timeout {
            opt.acquire_timeout(t);
        }
        if let Some(t) = self.opts.idle_timeout {
            opt.idle_timeout(t);
        }
        opt
    }
}

async fn close_quietly(conn: DatabaseConnection) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, "failed to close pool after on-connect error");
    }
}

fn is_sqlite_memory(dsn: &str) -> bool {
    dsn.starts_with("sqlite:") && dsn.contains(":memory:")
}

/// Hide the password component of a DSN for logs.
pub fn redact_dsn(dsn: &str) -> String {
    match url::Url::parse(dsn) {
        Ok(mut u) if u.password().is_some() => {
            let _ = u.set_password(Some("***"));
            u.to_string()
        }
        _ => dsn.to_owned(),
    }
}

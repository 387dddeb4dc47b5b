//! ModKit database handle.
//!
//! A thin storage accessor over SQLx pools (PostgreSQL, SQLite) with a SeaORM
//! connection on top. Besides connecting, the handle owns the operational
//! concerns the rest of the process relies on:
//!
//! - `health_check()` to verify connectivity at startup,
//! - `bounded()` to run a storage future under the operation timeout and the
//!   handle-wide cancellation token,
//! - `close()` which is idempotent and cancels in-flight bounded work.
//!
//! # Example
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> modkit_db::Result<()> {
//!     use modkit_db::{ConnectOpts, DbHandle};
//!
//!     let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
//!     db.health_check().await?;
//!     db.close().await;
//!     Ok(())
//! }
//! ```

pub mod errors;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use errors::{is_unique_violation, is_unique_violation_code};

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sea_orm::{ConnectionTrait, DatabaseConnection};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "pg")]
use sea_orm::SqlxPostgresConnector;
#[cfg(feature = "sqlite")]
use sea_orm::SqlxSqliteConnector;
#[cfg(feature = "pg")]
use sqlx::{postgres::PgPoolOptions, PgPool};
#[cfg(feature = "sqlite")]
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
#[cfg(feature = "sqlite")]
use std::str::FromStr;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the DB handle and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("database operation canceled")]
    Canceled,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DbError {
    /// Timeouts and cancellations both mean "the caller stopped waiting".
    pub fn is_canceled(&self) -> bool {
        matches!(self, DbError::Timeout(_) | DbError::Canceled)
    }
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Connection options.
/// Common sqlx pool knobs plus the per-operation deadline used by `bounded()`.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Deadline applied to every bounded storage operation.
    pub op_timeout: Duration,
    /// For SQLite file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            op_timeout: Duration::from_secs(5),
            create_sqlite_dirs: true,
        }
    }
}

/// One concrete sqlx pool.
#[derive(Clone, Debug)]
pub enum DbPool {
    #[cfg(feature = "pg")]
    Postgres(PgPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// Main handle.
#[derive(Debug)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
    sea: DatabaseConnection,
    op_timeout: Duration,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl DbHandle {
    /// Detect engine by DSN scheme. The tail (credentials etc.) is never touched.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(redact_credentials_in_dsn(Some(dsn))))
        }
    }

    /// Connect and build handle.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let mut o = PgPoolOptions::new();
                if let Some(n) = opts.max_conns {
                    o = o.max_connections(n);
                }
                if let Some(n) = opts.min_conns {
                    o = o.min_connections(n);
                }
                if let Some(t) = opts.acquire_timeout {
                    o = o.acquire_timeout(t);
                }
                if let Some(t) = opts.idle_timeout {
                    o = o.idle_timeout(t);
                }
                let pool = o.connect(dsn).await?;
                let sea = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
                Ok(Self::assemble(
                    engine,
                    DbPool::Postgres(pool),
                    dsn.to_string(),
                    sea,
                    &opts,
                ))
            }
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => {
                let dsn = sqlite::prepare_path(dsn, opts.create_sqlite_dirs)?;
                let (clean_dsn, pragmas) = sqlite::extract_pragmas(&dsn);
                let in_memory = sqlite::is_memory_dsn(&clean_dsn);

                let mut o = SqlitePoolOptions::new();
                if in_memory {
                    // Every connection to a private in-memory DSN is its own database,
                    // so the pool must hold exactly one connection for its whole life.
                    o = o
                        .max_connections(1)
                        .min_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None);
                } else {
                    if let Some(n) = opts.max_conns {
                        o = o.max_connections(n);
                    }
                    if let Some(n) = opts.min_conns {
                        o = o.min_connections(n);
                    }
                    if let Some(t) = opts.idle_timeout {
                        o = o.idle_timeout(t);
                    }
                }
                if let Some(t) = opts.acquire_timeout {
                    o = o.acquire_timeout(t);
                }

                o = o.after_connect(move |conn, _meta| {
                    let statements = pragmas.statements(in_memory);
                    Box::pin(async move {
                        for stmt in statements {
                            sqlx::query(&stmt).execute(&mut *conn).await?;
                        }
                        Ok(())
                    })
                });

                // An explicit `mode=` in the DSN decides file creation on its own.
                let mut conn = SqliteConnectOptions::from_str(&clean_dsn)?;
                if opts.create_sqlite_dirs && !in_memory && !sqlite::has_mode(&clean_dsn) {
                    conn = conn.create_if_missing(true);
                }

                let pool = o.connect_with(conn).await?;
                let sea = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());
                Ok(Self::assemble(
                    engine,
                    DbPool::Sqlite(pool),
                    clean_dsn,
                    sea,
                    &opts,
                ))
            }
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => Err(DbError::FeatureDisabled("PostgreSQL feature not enabled")),
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        }
    }

    fn assemble(
        engine: DbEngine,
        pool: DbPool,
        dsn: String,
        sea: DatabaseConnection,
        opts: &ConnectOpts,
    ) -> Self {
        tracing::info!(
            engine = ?engine,
            dsn = %redact_credentials_in_dsn(Some(&dsn)),
            "database pool ready"
        );
        Self {
            engine,
            pool,
            dsn,
            sea,
            op_timeout: opts.op_timeout,
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Round-trip `SELECT 1` bounded by the operation timeout.
    pub async fn health_check(&self) -> Result<()> {
        let backend = self.sea.get_database_backend();
        self.bounded(async {
            self.sea
                .execute(sea_orm::Statement::from_string(backend, "SELECT 1"))
                .await
                .map(|_| ())
        })
        .await
    }

    /// Run a storage future under the operation timeout and the handle's token.
    ///
    /// Returns `DbError::Timeout` when the deadline passes and `DbError::Canceled`
    /// when the handle has been closed (before or during the call).
    pub async fn bounded<T, E, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<DbError>,
    {
        if self.is_closed() {
            return Err(DbError::Canceled);
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(DbError::Canceled),
            res = tokio::time::timeout(self.op_timeout, fut) => match res {
                Ok(inner) => inner.map_err(Into::into),
                Err(_) => Err(DbError::Timeout(self.op_timeout)),
            },
        }
    }

    /// Graceful pool close. Only the first call has an effect.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("database handle already closed");
            return;
        }
        self.cancel.cancel();
        match &self.pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
        }
        tracing::info!(engine = ?self.engine, "database pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Get the backend.
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// Get the DSN used for this connection.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    /// Get SeaORM connection (clone; cheap handle).
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    pub fn seaorm(&self) -> &DatabaseConnection {
        &self.sea
    }
}

/// Mask the password component of a DSN for logging.
pub fn redact_credentials_in_dsn(dsn: Option<&str>) -> String {
    match dsn {
        Some(dsn) if dsn.contains('@') => match url::Url::parse(dsn) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            }
            Err(_) => "***".to_string(),
        },
        Some(dsn) => dsn.to_string(),
        None => "none".to_string(),
    }
}

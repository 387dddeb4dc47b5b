//! Process wiring: storage, services, HTTP listener and the runnable registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig};
use axum::Router;
use identity::{
    AuthService, Migrator, PasswordAuthService, SeaOrmUsersRepository, Service, ServiceConfig,
};
use modkit::{RunOptions, RunReport, ServiceRegistry, ShutdownOptions};
use modkit_db::{redact_credentials_in_dsn, ConnectOpts, DbHandle};
use runtime::{AppConfig, DatabaseConfig, PaginationConfig};
use sea_orm_migration::MigratorTrait;
use tracing::instrument;

/// A fully wired identity server, ready to run.
///
/// The registry is open: callers may add more runnables before [`Server::run`].
pub struct Server {
    db: Arc<DbHandle>,
    ingress: Arc<ApiIngress>,
    registry: ServiceRegistry,
}

impl Server {
    /// Open the database, migrate it and assemble every component.
    ///
    /// Any failure here aborts startup; the database handle is closed before returning
    /// an error from a step that runs after the connection was opened.
    #[instrument(name = "supervisor.init", skip(config))]
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let dsn = resolve_dsn(&config.database.url, Path::new(&config.server.home_dir))?;
        tracing::info!(dsn = %redact_credentials_in_dsn(Some(&dsn)), "connecting to database");
        let db = DbHandle::connect(&dsn, connect_opts(&config.database))
            .await
            .context("failed to open database")?;
        tracing::info!(engine = ?db.engine(), "database connected");

        if let Err(e) = prepare_schema(&db).await {
            db.close().await;
            return Err(e);
        }
        let db = Arc::new(db);

        let repo = Arc::new(SeaOrmUsersRepository::new(db.clone()));
        let service = Arc::new(Service::new(repo, service_config(&config.pagination)));
        let auth: Arc<dyn AuthService> = Arc::new(PasswordAuthService::new(service.clone()));

        let routes = identity::register_routes(Router::new(), service, auth);
        let ingress = Arc::new(ApiIngress::new(ApiIngressConfig::from(config), routes));

        let mut registry = ServiceRegistry::new();
        registry.register(ingress.clone());
        tracing::info!(runnables = ?registry.names(), "server assembled");

        Ok(Self {
            db,
            ingress,
            registry,
        })
    }

    pub fn db(&self) -> Arc<DbHandle> {
        self.db.clone()
    }

    pub fn ingress(&self) -> Arc<ApiIngress> {
        self.ingress.clone()
    }

    pub fn registry_mut(&mut self) -> &mut ServiceRegistry {
        &mut self.registry
    }

    /// Run every registered runnable until all have stopped, then close the database.
    ///
    /// Runnable errors and panics are captured in the report, so the close always runs.
    #[instrument(name = "supervisor.run", skip_all)]
    pub async fn run(self, shutdown: ShutdownOptions) -> RunReport {
        let report = modkit::run(RunOptions {
            registry: self.registry,
            shutdown,
        })
        .await;

        self.db.close().await;
        for (name, exit) in report.failures() {
            tracing::error!(runnable = %name, exit = ?exit, "runnable did not stop cleanly");
        }
        tracing::info!(clean = report.is_clean(), "all runnables stopped");
        report
    }
}

async fn prepare_schema(db: &DbHandle) -> Result<()> {
    Migrator::up(db.seaorm(), None)
        .await
        .context("failed to apply database migrations")?;
    db.health_check()
        .await
        .context("database health check failed")?;
    Ok(())
}

fn connect_opts(cfg: &DatabaseConfig) -> ConnectOpts {
    ConnectOpts {
        max_conns: Some(cfg.max_conns),
        acquire_timeout: Some(cfg.acquire_timeout),
        op_timeout: cfg.op_timeout,
        create_sqlite_dirs: true,
        ..Default::default()
    }
}

fn service_config(p: &PaginationConfig) -> ServiceConfig {
    ServiceConfig {
        default_page: p.page,
        default_per_page: p.per_page,
        max_per_page: p.max_per_page,
        ..Default::default()
    }
}

/// Anchor a relative SQLite file path at `base_dir`; other DSNs pass through.
fn resolve_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    let dsn = dsn.trim();
    if dsn.starts_with("sqlite::memory:") || !dsn.starts_with("sqlite://") {
        return Ok(dsn.to_string());
    }
    let rest = &dsn["sqlite://".len()..];
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return Err(anyhow!("empty SQLite path in DSN"));
    }

    let mut p = PathBuf::from(path);
    if p.is_relative() {
        p = base_dir.join(p);
    }
    let mut out = format!("sqlite://{}", p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_sqlite_path_is_anchored() {
        let base = Path::new("/srv/id");
        let dsn = resolve_dsn("sqlite://data/identity.db?mode=rwc", base).unwrap();
        assert_eq!(dsn, "sqlite:///srv/id/data/identity.db?mode=rwc");
    }

    #[test]
    fn absolute_memory_and_postgres_dsns_pass_through() {
        let base = Path::new("/srv/id");
        assert_eq!(
            resolve_dsn("sqlite:///tmp/x.db", base).unwrap(),
            "sqlite:///tmp/x.db"
        );
        assert_eq!(resolve_dsn("sqlite::memory:", base).unwrap(), "sqlite::memory:");
        assert_eq!(
            resolve_dsn("postgres://u:p@h/db", base).unwrap(),
            "postgres://u:p@h/db"
        );
    }

    #[test]
    fn empty_sqlite_path_is_rejected() {
        assert!(resolve_dsn("sqlite://", Path::new("/")).is_err());
    }

    #[test]
    fn pagination_feeds_service_defaults() {
        let cfg = service_config(&PaginationConfig {
            page: 2,
            per_page: 10,
            max_per_page: 50,
        });
        assert_eq!(cfg.default_page, 2);
        assert_eq!(cfg.default_per_page, 10);
        assert_eq!(cfg.max_per_page, 50);
        assert_eq!(cfg.min_password_length, ServiceConfig::default().min_password_length);
    }
}

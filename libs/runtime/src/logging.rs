use crate::config::{LoggingConfig, Section};
use std::{
    collections::HashMap,
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt};

use file_rotate::{
    compression::Compression,
    suffix::AppendCount,
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

// -------- level helpers --------

/// `None` means "off". Unknown strings fall back to INFO.
fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "" | "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        "off" | "none" => None,
        _ => Some(LevelFilter::INFO),
    }
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target == prefix
        || (target.starts_with(prefix) && target[prefix.len()..].starts_with("::"))
}

// -------- rotating writer for files --------

type SharedRotate = Arc<Mutex<FileRotate<AppendCount>>>;

#[derive(Clone)]
struct RotWriterHandle(SharedRotate);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log writer poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log writer poisoned"))?
            .flush()
    }
}

/// A writer handle that may be None (drops writes).
struct RoutedWriterHandle(Option<RotWriterHandle>);

impl Write for RoutedWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes each record to the file of its subsystem, or to the default file.
/// Longest matching prefix wins.
#[derive(Default)]
struct FileRouter {
    default: Option<SharedRotate>,
    by_prefix: Vec<(String, SharedRotate)>,
}

impl FileRouter {
    fn resolve_for(&self, target: &str) -> Option<RotWriterHandle> {
        self.by_prefix
            .iter()
            .filter(|(prefix, _)| matches_prefix(target, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, w)| w)
            .or(self.default.as_ref())
            .map(|w| RotWriterHandle(w.clone()))
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = RoutedWriterHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriterHandle(self.default.as_ref().map(|w| RotWriterHandle(w.clone())))
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriterHandle(self.resolve_for(meta.target()))
    }
}

// -------- path resolution helpers --------

/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn create_rotating_writer(section: &Section, base_dir: &Path) -> std::io::Result<SharedRotate> {
    let log_path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);

    let rot = FileRotate::new(
        log_path,
        AppendCount::new(backups),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(Arc::new(Mutex::new(rot)))
}

// -------- filters --------

/// Console filter: "default" sets the fallback level, other keys are target prefixes.
fn console_targets(cfg: &LoggingConfig) -> Targets {
    let default = cfg
        .get(DEFAULT_SECTION)
        .and_then(|s| parse_level(&s.console_level))
        .unwrap_or(LevelFilter::OFF);

    cfg.iter()
        .filter(|(k, _)| k.as_str() != DEFAULT_SECTION)
        .fold(Targets::new().with_default(default), |t, (name, s)| {
            t.with_target(
                name.clone(),
                parse_level(&s.console_level).unwrap_or(LevelFilter::OFF),
            )
        })
}

/// File filter: subsystems without a file of their own fall through to the default file.
fn file_targets(cfg: &LoggingConfig, has_default_file: bool) -> Targets {
    let default = cfg
        .get(DEFAULT_SECTION)
        .filter(|_| has_default_file)
        .and_then(|s| parse_level(&s.file_level))
        .unwrap_or(LevelFilter::OFF);

    cfg.iter()
        .filter(|(k, _)| k.as_str() != DEFAULT_SECTION)
        .filter(|(_, s)| !s.file.trim().is_empty())
        .fold(Targets::new().with_default(default), |t, (name, s)| {
            t.with_target(
                name.clone(),
                parse_level(&s.file_level).unwrap_or(LevelFilter::OFF),
            )
        })
}

fn build_file_router(cfg: &LoggingConfig, base_dir: &Path) -> FileRouter {
    let mut router = FileRouter::default();
    // Subsystems sharing a file share one writer.
    let mut opened: HashMap<PathBuf, SharedRotate> = HashMap::new();

    for (name, section) in cfg {
        if section.file.trim().is_empty() {
            continue;
        }
        let path = resolve_log_path(&section.file, base_dir);
        let writer = match opened.get(&path) {
            Some(w) => w.clone(),
            None => match create_rotating_writer(section, base_dir) {
                Ok(w) => {
                    opened.insert(path.clone(), w.clone());
                    w
                }
                Err(e) => {
                    eprintln!(
                        "Failed to init log file for '{}': {} ({})",
                        name,
                        path.display(),
                        e
                    );
                    continue;
                }
            },
        };
        if name == DEFAULT_SECTION {
            router.default = Some(writer);
        } else {
            router.by_prefix.push((name.clone(), writer));
        }
    }
    router
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: subsystem sections; "default" is the catch-all
/// - `base_dir`: base directory used to resolve relative log file paths (usually server.home_dir)
///
/// Installing a second global subscriber is silently ignored, so tests may call this freely.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // Bridge `log` → `tracing` *before* installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let console_layer = fmt::layer()
        .with_ansi(std::io::stdout().is_terminal())
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets(cfg));

    let router = build_file_router(cfg, base_dir);
    if router.is_empty() {
        let _ = Registry::default().with(console_layer).try_init();
        return;
    }

    let file_filter = file_targets(cfg, router.default.is_some());
    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_current_span(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(router)
        .with_filter(file_filter);

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

// =================== tests ===================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn test_logging_level_parsing() {
        assert_eq!(parse_level("trace"), Some(LevelFilter::TRACE));
        assert_eq!(parse_level("DEBUG"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level("Info"), Some(LevelFilter::INFO));
        assert_eq!(parse_level("warn"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("ERROR"), Some(LevelFilter::ERROR));
        assert_eq!(parse_level("off"), None);
        assert_eq!(parse_level("none"), None);
        assert_eq!(parse_level("invalid"), Some(LevelFilter::INFO));
    }

    #[test]
    fn prefix_matching_respects_module_boundaries() {
        assert!(matches_prefix("identity", "identity"));
        assert!(matches_prefix("identity::domain::service", "identity"));
        assert!(!matches_prefix("identity_server", "identity"));
    }

    #[test]
    fn console_targets_apply_subsystem_overrides() {
        let mut cfg = default_logging_config();
        cfg.insert("sqlx".into(), section("warn", "", ""));
        cfg.insert("identity".into(), section("debug", "", ""));

        let targets = console_targets(&cfg);
        assert!(targets.would_enable("api_ingress", &tracing::Level::INFO));
        assert!(!targets.would_enable("api_ingress", &tracing::Level::DEBUG));
        assert!(!targets.would_enable("sqlx::query", &tracing::Level::INFO));
        assert!(targets.would_enable("identity::domain", &tracing::Level::DEBUG));
    }

    #[test]
    fn file_targets_are_off_without_any_file() {
        let mut cfg = LoggingConfig::new();
        cfg.insert(DEFAULT_SECTION.into(), section("info", "", "debug"));
        let targets = file_targets(&cfg, false);
        assert!(!targets.would_enable("anything", &tracing::Level::ERROR));
    }

    #[test]
    fn test_file_paths_resolved_against_home_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));

        let abs = tmp.path().join("abs.log");
        assert_eq!(resolve_log_path(abs.to_str().unwrap(), Path::new("/ignored")), abs);
    }

    #[test]
    fn router_creates_parent_dirs_and_routes_by_longest_prefix() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert(DEFAULT_SECTION.into(), section("info", "logs/main.log", "debug"));
        cfg.insert("identity".into(), section("info", "logs/identity.log", "debug"));
        cfg.insert(
            "identity::infra".into(),
            section("info", "logs/storage/identity.log", "debug"),
        );

        let router = build_file_router(&cfg, tmp.path());
        assert!(tmp.path().join("logs/storage").is_dir());
        assert!(router.default.is_some());
        assert_eq!(router.by_prefix.len(), 2);

        let storage = router.resolve_for("identity::infra::storage").unwrap();
        let storage_ptr = Arc::as_ptr(&storage.0);
        let expected = router
            .by_prefix
            .iter()
            .find(|(p, _)| p == "identity::infra")
            .map(|(_, w)| Arc::as_ptr(w))
            .unwrap();
        assert_eq!(storage_ptr, expected);

        let fallback = router.resolve_for("hyper::proto").unwrap();
        assert_eq!(
            Arc::as_ptr(&fallback.0),
            Arc::as_ptr(router.default.as_ref().unwrap())
        );
    }

    #[test]
    fn shared_file_paths_share_one_writer() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert("a".into(), section("info", "logs/shared.log", "info"));
        cfg.insert("b".into(), section("info", "logs/shared.log", "info"));

        let router = build_file_router(&cfg, tmp.path());
        let a = router.resolve_for("a").unwrap();
        let b = router.resolve_for("b").unwrap();
        assert_eq!(Arc::as_ptr(&a.0), Arc::as_ptr(&b.0));
    }
}

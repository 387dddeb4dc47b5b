//! SQLite DSN handling: pragma whitelist, in-memory detection, parent dirs.

use std::collections::HashMap;
use std::path::PathBuf;

const PRAGMA_KEYS: &[&str] = &["wal", "synchronous", "busy_timeout", "journal_mode"];
const DEFAULT_BUSY_TIMEOUT_MS: i64 = 5000;

/// Whitelisted PRAGMA settings pulled out of a DSN query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pragmas {
    pub journal_mode: Option<&'static str>,
    pub synchronous: Option<&'static str>,
    pub busy_timeout_ms: Option<i64>,
}

impl Pragmas {
    fn from_pairs(pairs: &HashMap<String, String>) -> Self {
        let mut p = Pragmas::default();
        for (key, value) in pairs {
            match key.as_str() {
                "journal_mode" => p.journal_mode = journal_mode(value),
                "wal" if p.journal_mode.is_none() => {
                    p.journal_mode = match value.to_lowercase().as_str() {
                        "true" | "1" => Some("WAL"),
                        "false" | "0" => Some("DELETE"),
                        _ => None,
                    }
                }
                "synchronous" => p.synchronous = synchronous(value),
                "busy_timeout" => p.busy_timeout_ms = value.parse().ok().filter(|v| *v >= 0),
                _ => {}
            }
            if p.is_unset(key) {
                tracing::warn!(%key, %value, "invalid SQLite pragma in DSN, ignoring");
            }
        }
        p
    }

    fn is_unset(&self, key: &str) -> bool {
        match key {
            "journal_mode" | "wal" => self.journal_mode.is_none(),
            "synchronous" => self.synchronous.is_none(),
            "busy_timeout" => self.busy_timeout_ms.is_none(),
            _ => false,
        }
    }

    /// Statements executed on every new connection.
    /// In-memory databases cannot use WAL and have no lock contention.
    pub(crate) fn statements(&self, in_memory: bool) -> Vec<String> {
        let journal = match (self.journal_mode, in_memory) {
            (Some(mode), _) => mode,
            (None, true) => "DELETE",
            (None, false) => "WAL",
        };
        let mut out = vec![
            format!("PRAGMA journal_mode = {journal}"),
            format!(
                "PRAGMA synchronous = {}",
                self.synchronous.unwrap_or("NORMAL")
            ),
            "PRAGMA foreign_keys = ON".to_string(),
        ];
        if !in_memory {
            out.push(format!(
                "PRAGMA busy_timeout = {}",
                self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS)
            ));
        }
        out
    }
}

fn journal_mode(v: &str) -> Option<&'static str> {
    match v.to_uppercase().as_str() {
        "DELETE" => Some("DELETE"),
        "WAL" => Some("WAL"),
        "MEMORY" => Some("MEMORY"),
        "TRUNCATE" => Some("TRUNCATE"),
        "PERSIST" => Some("PERSIST"),
        "OFF" => Some("OFF"),
        _ => None,
    }
}

fn synchronous(v: &str) -> Option<&'static str> {
    match v.to_uppercase().as_str() {
        "OFF" => Some("OFF"),
        "NORMAL" => Some("NORMAL"),
        "FULL" => Some("FULL"),
        "EXTRA" => Some("EXTRA"),
        _ => None,
    }
}

/// Split a DSN into the SQLx-compatible part and the pragma settings.
/// Non-URL DSNs come back unchanged with default pragmas.
pub(crate) fn extract_pragmas(dsn: &str) -> (String, Pragmas) {
    let Ok(mut url) = url::Url::parse(dsn) else {
        return (dsn.to_string(), Pragmas::default());
    };

    let mut extracted = HashMap::new();
    let mut remaining = Vec::new();
    for (key, value) in url.query_pairs() {
        let lower = key.to_lowercase();
        if PRAGMA_KEYS.contains(&lower.as_str()) {
            extracted.insert(lower, value.into_owned());
        } else {
            remaining.push(format!("{key}={value}"));
        }
    }

    if extracted.is_empty() {
        return (dsn.to_string(), Pragmas::default());
    }

    url.set_query(None);
    if !remaining.is_empty() {
        url.set_query(Some(&remaining.join("&")));
    }
    (url.to_string(), Pragmas::from_pairs(&extracted))
}

pub(crate) fn is_memory_dsn(dsn: &str) -> bool {
    if dsn.starts_with("sqlite::memory:") || dsn.starts_with("sqlite://memory:") {
        return true;
    }
    url::Url::parse(dsn)
        .map(|u| {
            u.query_pairs()
                .any(|(k, v)| k.eq_ignore_ascii_case("mode") && v.eq_ignore_ascii_case("memory"))
        })
        .unwrap_or(false)
}

pub(crate) fn has_mode(dsn: &str) -> bool {
    dsn.split_once('?').is_some_and(|(_, q)| {
        q.split('&')
            .any(|kv| kv.split('=').next().is_some_and(|k| k.eq_ignore_ascii_case("mode")))
    })
}

/// Ensure the parent directory of a file-backed SQLite database exists.
pub(crate) fn prepare_path(dsn: &str, create_dirs: bool) -> std::io::Result<String> {
    if !create_dirs || is_memory_dsn(dsn) {
        return Ok(dsn.to_string());
    }
    if let Some(parent) = file_path(dsn).as_deref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(dsn.to_string())
}

fn file_path(dsn: &str) -> Option<PathBuf> {
    let raw = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))?;
    if raw.starts_with("file:") {
        return None;
    }
    let path = raw.split('?').next().unwrap_or(raw);
    (!path.is_empty()).then(|| PathBuf::from(path))
}

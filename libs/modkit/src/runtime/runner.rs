//! ModKit runtime runner.
//!
//! Design notes:
//! - Every registered runnable is spawned into one `JoinSet` with a child of the
//!   shared `CancellationToken`, and the runner waits for all of them.
//! - A runnable that fails or panics is logged and reported; it is never restarted
//!   and its siblings keep running until shutdown is requested.
//! - Errors wrapping [`Canceled`](crate::Canceled) count as a clean stop.
//! - Shutdown can be driven by OS signals, an external `CancellationToken`,
//!   or an arbitrary future. The waiter task is joined before `run` returns.

use crate::lifecycle::is_canceled;
use crate::registry::ServiceRegistry;
use crate::runtime::shutdown;
use std::collections::HashMap;
use std::{future::Future, pin::Pin};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// How the runtime should decide when to stop.
pub enum ShutdownOptions {
    /// Listen for OS signals (Ctrl+C / SIGTERM).
    Signals,
    /// An external `CancellationToken` controls the lifecycle.
    Token(CancellationToken),
    /// An arbitrary future; when it completes, we initiate shutdown.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

/// Options for running the ModKit runner.
pub struct RunOptions {
    pub registry: ServiceRegistry,
    pub shutdown: ShutdownOptions,
}

/// How a single runnable stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    /// Returned `Ok(())`.
    Finished,
    /// Returned an error wrapping `Canceled`.
    Canceled,
    /// Returned any other error.
    Failed(String),
    /// The task panicked.
    Panicked(String),
}

impl Exit {
    pub fn is_clean(&self) -> bool {
        matches!(self, Exit::Finished | Exit::Canceled)
    }
}

/// Per-runnable outcome, in completion order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub exits: Vec<(String, Exit)>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.exits.iter().all(|(_, e)| e.is_clean())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Exit)> {
        self.exits
            .iter()
            .filter(|(_, e)| !e.is_clean())
            .map(|(n, e)| (n.as_str(), e))
    }

    pub fn exit_of(&self, name: &str) -> Option<&Exit> {
        self.exits.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }
}

/// Launch every runnable, wait for all of them to stop, and report.
pub async fn run(opts: RunOptions) -> RunReport {
    let cancel = match &opts.shutdown {
        ShutdownOptions::Token(t) => t.clone(),
        _ => CancellationToken::new(),
    };
    // Fired once all runnables are gone so the waiter can exit.
    let done = CancellationToken::new();
    let waiter = spawn_shutdown_waiter(opts.shutdown, cancel.clone(), done.clone());

    let mut set = JoinSet::new();
    let mut names = HashMap::new();
    for runnable in opts.registry.into_entries() {
        let name = runnable.name().to_string();
        let token = cancel.child_token();
        tracing::info!(runnable = %name, "starting runnable");
        let handle = set.spawn(async move { runnable.run(token).await });
        names.insert(handle.id(), name);
    }

    let mut report = RunReport::default();
    while let Some(joined) = set.join_next_with_id().await {
        let (name, exit) = match joined {
            Ok((id, Ok(()))) => (names.remove(&id), Exit::Finished),
            Ok((id, Err(e))) if is_canceled(&e) => (names.remove(&id), Exit::Canceled),
            Ok((id, Err(e))) => (names.remove(&id), Exit::Failed(format!("{e:#}"))),
            Err(e) => {
                let id = e.id();
                let msg = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    e.to_string()
                };
                (names.remove(&id), Exit::Panicked(msg))
            }
        };
        let name = name.unwrap_or_else(|| "<unknown>".to_string());
        match &exit {
            Exit::Finished | Exit::Canceled => {
                tracing::info!(runnable = %name, exit = ?exit, "runnable stopped");
            }
            Exit::Failed(e) => tracing::error!(runnable = %name, error = %e, "runnable failed"),
            Exit::Panicked(e) => tracing::error!(runnable = %name, panic = %e, "runnable panicked"),
        }
        report.exits.push((name, exit));
    }

    done.cancel();
    if let Some(waiter) = waiter {
        if let Err(e) = waiter.await {
            tracing::warn!(error = %e, "shutdown waiter did not finish cleanly");
        }
    }
    report
}

fn spawn_shutdown_waiter(
    shutdown: ShutdownOptions,
    cancel: CancellationToken,
    done: CancellationToken,
) -> Option<JoinHandle<()>> {
    match shutdown {
        ShutdownOptions::Signals => Some(tokio::spawn(async move {
            tokio::select! {
                res = shutdown::wait_for_shutdown() => {
                    match res {
                        Ok(signal) => tracing::info!(signal, "shutdown: signal received"),
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                "shutdown: primary waiter failed; falling back to ctrl_c()"
                            );
                            tokio::select! {
                                _ = tokio::signal::ctrl_c() => {}
                                _ = done.cancelled() => return,
                            }
                        }
                    }
                    cancel.cancel();
                }
                _ = done.cancelled() => {}
            }
        })),
        ShutdownOptions::Future(waiter) => Some(tokio::spawn(async move {
            tokio::select! {
                _ = waiter => {
                    tracing::info!("shutdown: external future completed");
                    cancel.cancel();
                }
                _ = done.cancelled() => {}
            }
        })),
        ShutdownOptions::Token(_) => {
            tracing::info!("shutdown: external token will control lifecycle");
            None
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

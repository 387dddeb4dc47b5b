//! # ModKit
//!
//! Process plumbing shared by the server crates:
//!
//! - [`Runnable`]: a long-running unit of work driven by a `CancellationToken`
//! - [`ServiceRegistry`]: the ordered, extensible list of runnables for a process
//! - [`runtime::run`]: launches every registered runnable, waits for all of them
//!   and reports how each one stopped
//! - [`api::problem`]: RFC 9457 Problem Details responses for axum handlers
//! - [`api::request`]: request id and path context for error responses

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod api;
pub mod lifecycle;
pub mod registry;
pub mod runtime;

pub use api::problem::{not_found, Problem, ProblemResponse, ValidationError};
pub use api::request::{RequestCtx, XRequestId};
pub use lifecycle::{is_canceled, Canceled, Runnable};
pub use registry::ServiceRegistry;
pub use runtime::{run, Exit, RunOptions, RunReport, ShutdownOptions};

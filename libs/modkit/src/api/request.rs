//! Per-request context shared between the ingress and module handlers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderName};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(REQUEST_ID_HEADER)
}

/// Request id assigned by the ingress, stored in request extensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XRequestId(pub String);

/// What an error response needs to know about the request it answers.
///
/// Extraction never fails: without an ingress in front, `request_id` is `None`.
#[derive(Clone, Debug, Default)]
pub struct RequestCtx {
    pub path: String,
    pub request_id: Option<String>,
}

impl<S> FromRequestParts<S> for RequestCtx
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .extensions
            .get::<XRequestId>()
            .map(|r| r.0.clone())
            .or_else(|| {
                parts
                    .headers
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
            });
        Ok(Self {
            path: parts.uri.path().to_string(),
            request_id,
        })
    }
}

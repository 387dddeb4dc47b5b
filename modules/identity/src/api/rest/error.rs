use axum::http::StatusCode;
use modkit::api::problem::{Problem, ProblemResponse, ValidationError as FieldViolation};
use modkit::RequestCtx;

use crate::domain::error::DomainError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    ctx: &RequestCtx,
) -> ProblemResponse {
    let mut problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.example.com/{}", code))
        .with_code(code)
        .with_instance(&ctx.path);
    if let Some(rid) = &ctx.request_id {
        problem = problem.with_request_id(rid);
    }
    ProblemResponse(problem)
}

/// Malformed input that never reached the domain (bad JSON, query or path).
pub fn bad_request(detail: impl Into<String>, ctx: &RequestCtx) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "IDENTITY_BAD_REQUEST",
        "Bad request",
        detail,
        ctx,
    )
}

/// Structural validation failures from `validator`, one entry per field.
pub fn validation_failed(
    errors: &validator::ValidationErrors,
    ctx: &RequestCtx,
) -> ProblemResponse {
    let mut violations: Vec<FieldViolation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field: &str = &field;
            let pointer = format!("/{}", json_field(field));
            errs.iter()
                .map(|e| FieldViolation {
                    detail: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                    pointer: pointer.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect();
    violations.sort_by(|a, b| a.pointer.cmp(&b.pointer));

    let detail = violations
        .iter()
        .map(|v| format!("{}: {}", v.pointer.trim_start_matches('/'), v.detail))
        .collect::<Vec<_>>()
        .join("; ");
    let ProblemResponse(problem) = from_parts(
        StatusCode::BAD_REQUEST,
        "IDENTITY_VALIDATION",
        "Validation error",
        detail,
        ctx,
    );
    ProblemResponse(problem.with_errors(violations))
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, ctx: &RequestCtx) -> ProblemResponse {
    match e {
        DomainError::Validation { field, message } => {
            let ProblemResponse(problem) = from_parts(
                StatusCode::BAD_REQUEST,
                "IDENTITY_VALIDATION",
                "Validation error",
                format!("{field}: {message}"),
                ctx,
            );
            ProblemResponse(problem.with_errors(vec![FieldViolation {
                detail: message.clone(),
                pointer: format!("/{field}"),
            }]))
        }
        DomainError::LoginAlreadyExists { .. } => from_parts(
            StatusCode::CONFLICT,
            "IDENTITY_LOGIN_CONFLICT",
            "Login already exists",
            e.to_string(),
            ctx,
        ),
        DomainError::UserNotFound { .. } | DomainError::LoginNotFound { .. } => from_parts(
            StatusCode::NOT_FOUND,
            "IDENTITY_USER_NOT_FOUND",
            "User not found",
            e.to_string(),
            ctx,
        ),
        DomainError::InvalidCredentials => from_parts(
            StatusCode::UNAUTHORIZED,
            "IDENTITY_INVALID_CREDENTIALS",
            "Invalid credentials",
            "login name or password is incorrect",
            ctx,
        ),
        DomainError::Canceled => from_parts(
            StatusCode::SERVICE_UNAVAILABLE,
            "IDENTITY_CANCELED",
            "Service unavailable",
            "the request was canceled before it completed",
            ctx,
        ),
        DomainError::PasswordHash { .. } | DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Internal error");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "IDENTITY_INTERNAL",
                "Internal error",
                "An internal error occurred",
                ctx,
            )
        }
    }
}

/// Wire name of a request DTO field; the DTOs rename these with `camelCase`.
fn json_field(field: &str) -> &str {
    match field {
        "first_name" => "firstName",
        "middle_name" => "middleName",
        "last_name" => "lastName",
        "login_name" => "loginName",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestCtx {
        RequestCtx {
            path: "/api/user/5".into(),
            request_id: Some("rid-1".into()),
        }
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (DomainError::validation("email", "bad"), 400),
            (DomainError::login_already_exists("alice"), 409),
            (DomainError::user_not_found(5), 404),
            (DomainError::login_not_found("bob"), 404),
            (DomainError::InvalidCredentials, 401),
            (DomainError::Canceled, 503),
            (DomainError::password_hash("x"), 500),
            (DomainError::database("x"), 500),
        ];
        for (err, status) in cases {
            assert_eq!(map_domain_error(&err, &ctx()).0.status, status, "{err}");
        }
    }

    #[test]
    fn problem_carries_instance_and_request_id() {
        let p = map_domain_error(&DomainError::user_not_found(5), &ctx()).0;
        assert_eq!(p.instance, "/api/user/5");
        assert_eq!(p.request_id.as_deref(), Some("rid-1"));
        assert_eq!(p.detail, "user with id 5 not found");
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let p = map_domain_error(&DomainError::database("password=hunter2"), &ctx()).0;
        assert!(!p.detail.contains("hunter2"));
    }

    #[test]
    fn field_pointers_use_json_names() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("login_name", validator::ValidationError::new("length"));
        errors.add("email", validator::ValidationError::new("email"));
        let p = validation_failed(&errors, &ctx()).0;
        let pointers: Vec<&str> = p.errors.iter().flatten().map(|v| v.pointer.as_str()).collect();
        assert_eq!(pointers, ["/email", "/loginName"]);
        assert_eq!(json_field("middle_name"), "middleName");
    }
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query},
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use modkit::{api::problem::ProblemResponse, RequestCtx};
use tracing::{error, info};
use validator::Validate;

use crate::api::rest::dto::{
    CreateUserReq, ForgotPasswordDto, ForgotPasswordReq, LoginReq, SearchUsersParams,
    UpdatePasswordReq, UpdateStatusReq, UpdateUserReq, UserDto, UserListDto,
};
use crate::api::rest::error::{bad_request, map_domain_error, validation_failed};
use crate::contract::model::{
    ForgotPasswordCommand, SearchUserQuery, UpdatePasswordCommand, UpdateStatusCommand,
    UpdateUserCommand, UserStatus,
};
use crate::domain::auth::AuthService;
use crate::domain::service::Service;

/// Unwrap a JSON body and run its structural validation.
fn validated<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
    ctx: &RequestCtx,
) -> Result<T, ProblemResponse> {
    let Json(req) = body.map_err(|rej| bad_request(rej.body_text(), ctx))?;
    req.validate().map_err(|e| validation_failed(&e, ctx))?;
    Ok(req)
}

fn parse_id(raw: &str, ctx: &RequestCtx) -> Result<i64, ProblemResponse> {
    raw.parse::<i64>()
        .map_err(|_| bad_request("id is not valid", ctx))
}

fn parse_status(raw: &str, ctx: &RequestCtx) -> Result<UserStatus, ProblemResponse> {
    raw.parse::<UserStatus>()
        .map_err(|e| bad_request(e.to_string(), ctx))
}

/// Create a new user. Success is an empty 200.
pub async fn create_user(
    ctx: RequestCtx,
    Extension(svc): Extension<Arc<Service>>,
    body: Result<Json<CreateUserReq>, JsonRejection>,
) -> Result<StatusCode, ProblemResponse> {
    let req = validated(body, &ctx)?;
    info!(login_name = %req.login_name, "Creating user");

    match svc.create(req.into()).await {
        Ok(_) => Ok(StatusCode::OK),
        Err(e) => {
            error!("Failed to create user: {}", e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// Search users. The query string is only parsed when one is present.
pub async fn search_users(
    ctx: RequestCtx,
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
) -> Result<Json<UserListDto>, ProblemResponse> {
    let params = match uri.query() {
        Some(q) if !q.is_empty() => {
            let Query(params) = Query::<SearchUsersParams>::try_from_uri(&uri)
                .map_err(|rej| bad_request(rej.body_text(), &ctx))?;
            params
        }
        _ => SearchUsersParams::default(),
    };
    info!("Searching users with params: {:?}", params);

    let status = params
        .status
        .as_deref()
        .map(|s| parse_status(s, &ctx))
        .transpose()?;
    let query = SearchUserQuery {
        page: params.page.unwrap_or(0),
        per_page: params.per_page.unwrap_or(0),
        login_name: params.login_name,
        email: params.email,
        status,
    };

    match svc.search(query).await {
        Ok(res) => Ok(Json(UserListDto::from(res))),
        Err(e) => {
            error!("Failed to search users: {}", e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// Get a specific user by ID
pub async fn get_user(
    ctx: RequestCtx,
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
) -> Result<Json<UserDto>, ProblemResponse> {
    let id = parse_id(&raw_id, &ctx)?;
    info!("Getting user with id: {}", id);

    match svc.get_by_id(id).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to get user {}: {}", id, e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// Update the name fields of a user
pub async fn update_user(
    ctx: RequestCtx,
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateUserReq>, JsonRejection>,
) -> Result<StatusCode, ProblemResponse> {
    let id = parse_id(&raw_id, &ctx)?;
    let req = validated(body, &ctx)?;
    info!("Updating user {}", id);

    let cmd = UpdateUserCommand {
        id,
        first_name: req.first_name,
        middle_name: req.middle_name,
        last_name: req.last_name,
    };
    match svc.update(cmd).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e) => {
            error!("Failed to update user {}: {}", id, e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

pub async fn update_status(
    ctx: RequestCtx,
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateStatusReq>, JsonRejection>,
) -> Result<StatusCode, ProblemResponse> {
    let id = parse_id(&raw_id, &ctx)?;
    let req = validated(body, &ctx)?;
    let status = parse_status(&req.status, &ctx)?;
    info!("Updating status of user {} to {}", id, status);

    match svc.update_status(UpdateStatusCommand { id, status }).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e) => {
            error!("Failed to update status of user {}: {}", id, e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

pub async fn update_password(
    ctx: RequestCtx,
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdatePasswordReq>, JsonRejection>,
) -> Result<StatusCode, ProblemResponse> {
    let id = parse_id(&raw_id, &ctx)?;
    let req = validated(body, &ctx)?;
    info!("Updating password of user {}", id);

    let cmd = UpdatePasswordCommand {
        id,
        password: req.password,
    };
    match svc.update_password(cmd).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e) => {
            error!("Failed to update password of user {}: {}", id, e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// A non-numeric segment that happens to match a static route.
pub async fn invalid_id(ctx: RequestCtx) -> ProblemResponse {
    bad_request("id is not valid", &ctx)
}

/// Accepts the request; no reset message is sent.
pub async fn forgot_password(
    ctx: RequestCtx,
    Extension(svc): Extension<Arc<Service>>,
    body: Result<Json<ForgotPasswordReq>, JsonRejection>,
) -> Result<(StatusCode, Json<ForgotPasswordDto>), ProblemResponse> {
    let req = validated(body, &ctx)?;

    match svc
        .forgot_password(ForgotPasswordCommand { email: req.email })
        .await
    {
        Ok(ack) => Ok((StatusCode::ACCEPTED, Json(ack.into()))),
        Err(e) => {
            error!("Failed to handle forgot-password: {}", e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

pub async fn login(
    ctx: RequestCtx,
    Extension(auth): Extension<Arc<dyn AuthService>>,
    body: Result<Json<LoginReq>, JsonRejection>,
) -> Result<Json<UserDto>, ProblemResponse> {
    let req = validated(body, &ctx)?;
    info!(login_name = %req.login_name, "Login attempt");

    match auth.authenticate(&req.login_name, &req.password).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            info!("Login rejected: {}", e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

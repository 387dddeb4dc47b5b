use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Extension, Router,
};

use crate::api::rest::handlers;
use crate::domain::auth::AuthService;
use crate::domain::service::Service;

/// Mount the identity endpoints on `router`.
pub fn register_routes(
    router: Router,
    service: Arc<Service>,
    auth: Arc<dyn AuthService>,
) -> Router {
    let collection = post(handlers::create_user).get(handlers::search_users);
    router
        .route("/api/user/", collection.clone())
        .route("/api/user", collection)
        // The static segment wins over `{id}`; other verbs answer as a bad id would.
        .route(
            "/api/user/forgot-password",
            post(handlers::forgot_password)
                .get(handlers::invalid_id)
                .put(handlers::invalid_id),
        )
        .route(
            "/api/user/{id}",
            get(handlers::get_user).put(handlers::update_user),
        )
        .route("/api/user/{id}/status", put(handlers::update_status))
        .route("/api/user/{id}/password", put(handlers::update_password))
        .route("/api/auth/login", post(handlers::login))
        .layer(Extension(service))
        .layer(Extension(auth))
}

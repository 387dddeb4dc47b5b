// === PUBLIC CONTRACT ===
// Only the contract module should be public for other modules to consume
pub mod contract;

// Re-export the public contract components
pub use contract::model;

// === INTERNAL MODULES ===
// WARNING: These modules are internal implementation details!
// They are exposed for process wiring and comprehensive testing.
// Other modules should only use the `contract` module.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;

pub use api::rest::routes::register_routes;
pub use domain::auth::{AuthService, PasswordAuthService};
pub use domain::service::{Service, ServiceConfig};
pub use infra::storage::migrations::Migrator;
pub use infra::storage::sea_orm_repo::SeaOrmUsersRepository;

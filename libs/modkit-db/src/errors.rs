//! Backend-neutral error classification.

use sea_orm::{DbErr, SqlErr};

/// Returns true if the given SQLSTATE / driver code represents a unique constraint
/// violation across popular backends (Postgres 23505, SQLite 2067, MySQL 1062).
pub fn is_unique_violation_code(code: &str) -> bool {
    matches!(code, "23505" | "2067" | "1062")
}

/// True when a SeaORM error was caused by a unique index.
pub fn is_unique_violation(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    match err {
        DbErr::Exec(sea_orm::RuntimeErr::SqlxError(sqlx::Error::Database(db)))
        | DbErr::Query(sea_orm::RuntimeErr::SqlxError(sqlx::Error::Database(db))) => db
            .code()
            .map(|c| is_unique_violation_code(c.as_ref()))
            .unwrap_or(false),
        _ => false,
    }
}

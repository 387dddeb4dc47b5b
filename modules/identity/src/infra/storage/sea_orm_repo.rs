//! SeaORM-backed repository implementation for the domain port.
//!
//! Every statement runs through `DbHandle::bounded`, so a query that outlives the
//! operation timeout, or is still running when the handle closes, surfaces as
//! `StoreError::Canceled` instead of hanging the request.

use std::sync::Arc;

use async_trait::async_trait;
use modkit_db::{is_unique_violation, DbError, DbHandle};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use tracing::{debug, instrument};

use crate::contract::model::{SearchUserQuery, SearchUserResult, User};
use crate::domain::error::StoreError;
use crate::domain::repo::{
    NewUserRecord, PasswordUpdate, StatusUpdate, UserNamesUpdate, UsersRepository,
};
use crate::infra::storage::entity::{
    ActiveModel as UserAM, Column, Entity as UserEntity, StatusDb,
};

/// SeaORM repository impl over a shared database handle.
pub struct SeaOrmUsersRepository {
    db: Arc<DbHandle>,
}

impl SeaOrmUsersRepository {
    pub fn new(db: Arc<DbHandle>) -> Self {
        Self { db }
    }

    fn filtered(query: &SearchUserQuery) -> Select<UserEntity> {
        let mut select = UserEntity::find();
        if let Some(login) = query.login_name.as_deref().filter(|s| !s.is_empty()) {
            select = select.filter(Column::LoginName.contains(login));
        }
        if let Some(email) = query.email.as_deref().filter(|s| !s.is_empty()) {
            select = select.filter(Column::Email.contains(email));
        }
        if let Some(status) = query.status {
            select = select.filter(Column::Status.eq(StatusDb::from(status)));
        }
        select
    }

    /// Run a partial update and translate "no such row" into `StoreError::Missing`.
    async fn apply(&self, id: i64, am: UserAM, op: &'static str) -> Result<(), StoreError> {
        match self.db.bounded(am.update(self.db.seaorm())).await {
            Ok(_) => Ok(()),
            Err(DbError::Sea(DbErr::RecordNotUpdated)) => Err(StoreError::Missing { id }),
            Err(e) => Err(store_error(op, e)),
        }
    }
}

/// Row offset for a 1-based page. Drivers bind offsets as signed 64-bit values, so a
/// page past that range is pinned to `i64::MAX` and simply yields no rows.
fn page_offset(page: i64, per_page: u64) -> u64 {
    (page.max(1) as u64 - 1)
        .checked_mul(per_page)
        .map_or(i64::MAX as u64, |offset| offset.min(i64::MAX as u64))
}

/// Classify a handle error for the domain.
fn store_error(op: &'static str, err: DbError) -> StoreError {
    if err.is_canceled() {
        debug!(op, error = %err, "storage operation canceled");
        return StoreError::Canceled;
    }
    if let DbError::Sea(ref inner) = err {
        if is_unique_violation(inner) {
            return StoreError::Conflict(format!("{op}: {inner}"));
        }
    }
    StoreError::Storage(format!("{op} failed: {err}"))
}

#[async_trait]
impl UsersRepository for SeaOrmUsersRepository {
    #[instrument(name = "identity.user.store.is_user_taken", skip(self))]
    async fn is_user_taken(&self, login_name: &str) -> Result<bool, StoreError> {
        let count = self
            .db
            .bounded(
                UserEntity::find()
                    .filter(Column::LoginName.eq(login_name))
                    .count(self.db.seaorm()),
            )
            .await
            .map_err(|e| store_error("is_user_taken", e))?;
        Ok(count > 0)
    }

    #[instrument(
        name = "identity.user.store.create",
        skip(self, rec),
        fields(login_name = %rec.login_name)
    )]
    async fn create(&self, rec: NewUserRecord) -> Result<i64, StoreError> {
        let am = UserAM {
            uuid: Set(rec.uuid),
            first_name: Set(rec.first_name),
            middle_name: Set(rec.middle_name),
            last_name: Set(rec.last_name),
            login_name: Set(rec.login_name),
            password: Set(rec.password_hash),
            salt: Set(rec.salt),
            email: Set(rec.email),
            status: Set(rec.status.into()),
            created_at: Set(rec.created_at),
            created_by: Set(rec.created_by),
            updated_at: Set(None),
            ..Default::default()
        };
        let res = self
            .db
            .bounded(UserEntity::insert(am).exec(self.db.seaorm()))
            .await
            .map_err(|e| store_error("create", e))?;
        debug!(user_id = res.last_insert_id, "row inserted");
        Ok(res.last_insert_id)
    }

    #[instrument(name = "identity.user.store.get_by_id", skip(self))]
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let found = self
            .db
            .bounded(UserEntity::find_by_id(id).one(self.db.seaorm()))
            .await
            .map_err(|e| store_error("get_by_id", e))?;
        Ok(found.map(Into::into))
    }

    #[instrument(name = "identity.user.store.get_by_login", skip(self))]
    async fn get_by_login(&self, login_name: &str) -> Result<Option<User>, StoreError> {
        let found = self
            .db
            .bounded(
                UserEntity::find()
                    .filter(Column::LoginName.eq(login_name))
                    .one(self.db.seaorm()),
            )
            .await
            .map_err(|e| store_error("get_by_login", e))?;
        Ok(found.map(Into::into))
    }

    #[instrument(
        name = "identity.user.store.search",
        skip(self, query),
        fields(page = query.page, per_page = query.per_page)
    )]
    async fn search(&self, query: &SearchUserQuery) -> Result<SearchUserResult, StoreError> {
        let per_page = query.per_page.max(1) as u64;
        let offset = page_offset(query.page, per_page);

        let total = self
            .db
            .bounded(Self::filtered(query).count(self.db.seaorm()))
            .await
            .map_err(|e| store_error("search.count", e))?;

        let rows = self
            .db
            .bounded(
                Self::filtered(query)
                    .order_by_asc(Column::Id)
                    .offset(offset)
                    .limit(per_page)
                    .all(self.db.seaorm()),
            )
            .await
            .map_err(|e| store_error("search", e))?;

        Ok(SearchUserResult {
            users: rows.into_iter().map(Into::into).collect(),
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }

    #[instrument(name = "identity.user.store.update", skip(self, upd), fields(user_id = upd.id))]
    async fn update(&self, upd: UserNamesUpdate) -> Result<(), StoreError> {
        let am = UserAM {
            id: Unchanged(upd.id),
            first_name: Set(upd.first_name),
            middle_name: Set(upd.middle_name),
            last_name: Set(upd.last_name),
            updated_at: Set(Some(upd.updated_at)),
            ..Default::default()
        };
        self.apply(upd.id, am, "update").await
    }

    #[instrument(
        name = "identity.user.store.update_status",
        skip(self, upd),
        fields(user_id = upd.id)
    )]
    async fn update_status(&self, upd: StatusUpdate) -> Result<(), StoreError> {
        let am = UserAM {
            id: Unchanged(upd.id),
            status: Set(upd.status.into()),
            updated_at: Set(Some(upd.updated_at)),
            ..Default::default()
        };
        self.apply(upd.id, am, "update_status").await
    }

    #[instrument(
        name = "identity.user.store.update_password",
        skip(self, upd),
        fields(user_id = upd.id)
    )]
    async fn update_password(&self, upd: PasswordUpdate) -> Result<(), StoreError> {
        let am = UserAM {
            id: Unchanged(upd.id),
            password: Set(upd.password_hash),
            salt: Set(upd.salt),
            updated_at: Set(Some(upd.updated_at)),
            ..Default::default()
        };
        self.apply(upd.id, am, "update_password").await
    }
}

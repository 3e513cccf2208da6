//! Postgres store
//!
//! Each commit runs as one SQL transaction. Updates are version-checked in
//! the WHERE clause; a zero-row update is classified as a conflict when the
//! row still exists and as not-found when it does not.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        asset::{Asset, AssetFilter},
        asset_return::{AssetReturn, ReturnFilter, ReturnSummary},
        assignment::{Assignment, AssignmentFilter, AssignmentSummary},
        category::Category,
        code_count::CodeCount,
        location::Location,
        page::{Page, PageRequest},
        user::User,
    },
};

use super::{ChangeSet, CommitError, Store, Write};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// A zero-row version-checked write is either a stale version or a
    /// missing row; tell the two apart for the caller.
    async fn classify_miss(
        tx: &mut Transaction<'_, Postgres>,
        table: &str,
        kind: &'static str,
        id: Uuid,
    ) -> Result<CommitError, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar(&format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"))
                .bind(id)
                .fetch_one(&mut **tx)
                .await?;
        Ok(if exists {
            CommitError::Conflict(kind)
        } else {
            CommitError::NotFound(kind)
        })
    }
}

/// Map a unique-constraint violation to a duplicate-key commit error
fn duplicate(kind: &'static str) -> impl FnOnce(sqlx::Error) -> CommitError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            CommitError::Duplicate(kind)
        }
        _ => CommitError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_asset(&self, id: Uuid) -> AppResult<Option<Asset>> {
        Ok(sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_asset_by_code(&self, code: &str) -> AppResult<Option<Asset>> {
        Ok(
            sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_assets(
        &self,
        filter: &AssetFilter,
        page: &PageRequest,
    ) -> AppResult<Page<Asset>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM assets WHERE 1=1");
        let mut select = QueryBuilder::new("SELECT * FROM assets WHERE 1=1");

        for qb in [&mut count, &mut select] {
            if !filter.states.is_empty() {
                qb.push(" AND state = ANY(").push_bind(filter.states.clone()).push(")");
            }
            if let Some(category_id) = filter.category_id {
                qb.push(" AND category_id = ").push_bind(category_id);
            }
            if let Some(location_id) = filter.location_id {
                qb.push(" AND location_id = ").push_bind(location_id);
            }
            if let Some(ref search) = filter.search {
                let pattern = format!("%{search}%");
                qb.push(" AND (code ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR name ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        select
            .push(" ORDER BY code LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let items = select
            .build_query_as::<Asset>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total as u64))
    }

    async fn asset_has_assignments(&self, asset_id: Uuid) -> AppResult<bool> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM assignments WHERE asset_id = $1)",
        )
        .bind(asset_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_assignment(&self, id: Uuid) -> AppResult<Option<Assignment>> {
        Ok(
            sqlx::query_as::<_, Assignment>("SELECT * FROM assignments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_assignments(
        &self,
        filter: &AssignmentFilter,
        page: &PageRequest,
    ) -> AppResult<Page<AssignmentSummary>> {
        const FROM: &str = " FROM assignments a \
             JOIN assets s ON s.id = a.asset_id \
             JOIN users u ON u.id = a.user_id \
             WHERE 1=1";

        let mut count = QueryBuilder::new(format!("SELECT COUNT(*){FROM}"));
        let mut select = QueryBuilder::new(format!(
            "SELECT a.id, a.asset_id, s.code AS asset_code, s.name AS asset_name, \
                    a.user_id, u.first_name || ' ' || u.last_name AS assignee, \
                    a.assigned_date, a.status, \
                    (SELECT r.state FROM asset_returns r \
                      WHERE r.assignment_id = a.id \
                      ORDER BY r.created_at DESC, r.id LIMIT 1) AS latest_return_state, \
                    a.version{FROM}"
        ));

        for qb in [&mut count, &mut select] {
            if !filter.states.is_empty() {
                qb.push(" AND a.status = ANY(").push_bind(filter.states.clone()).push(")");
            }
            if let Some(user_id) = filter.user_id {
                qb.push(" AND a.user_id = ").push_bind(user_id);
            }
            if let Some(from) = filter.assigned_date_from {
                qb.push(" AND a.assigned_date >= ").push_bind(from);
            }
            if let Some(to) = filter.assigned_date_to {
                qb.push(" AND a.assigned_date <= ").push_bind(to);
            }
            if let Some(ref search) = filter.search {
                let pattern = format!("%{search}%");
                qb.push(" AND (s.code ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR s.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR u.first_name || ' ' || u.last_name ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        select
            .push(" ORDER BY a.assigned_date, s.code LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let items = select
            .build_query_as::<AssignmentSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total as u64))
    }

    async fn live_assignment_for_asset(&self, asset_id: Uuid) -> AppResult<Option<Assignment>> {
        Ok(sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments \
             WHERE asset_id = $1 AND status IN ('WAITING_FOR_ACCEPTANCE', 'ACCEPTED')",
        )
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn user_has_live_assignments(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM assignments \
             WHERE user_id = $1 AND status IN ('WAITING_FOR_ACCEPTANCE', 'ACCEPTED'))",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_return(&self, id: Uuid) -> AppResult<Option<AssetReturn>> {
        Ok(
            sqlx::query_as::<_, AssetReturn>("SELECT * FROM asset_returns WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn latest_return_for_assignment(
        &self,
        assignment_id: Uuid,
    ) -> AppResult<Option<AssetReturn>> {
        Ok(sqlx::query_as::<_, AssetReturn>(
            "SELECT * FROM asset_returns WHERE assignment_id = $1 \
             ORDER BY created_at DESC, id LIMIT 1",
        )
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_returns(
        &self,
        filter: &ReturnFilter,
        page: &PageRequest,
    ) -> AppResult<Page<ReturnSummary>> {
        const FROM: &str = " FROM asset_returns r \
             JOIN assignments a ON a.id = r.assignment_id \
             JOIN assets s ON s.id = a.asset_id \
             JOIN users u ON u.id = a.user_id \
             WHERE 1=1";

        let mut count = QueryBuilder::new(format!("SELECT COUNT(*){FROM}"));
        let mut select = QueryBuilder::new(format!(
            "SELECT r.id, r.assignment_id, s.code AS asset_code, s.name AS asset_name, \
                    u.first_name || ' ' || u.last_name AS assignee, \
                    a.assigned_date, r.returned_date, r.state, \
                    a.status AS assignment_status{FROM}"
        ));

        for qb in [&mut count, &mut select] {
            if !filter.states.is_empty() {
                qb.push(" AND r.state = ANY(").push_bind(filter.states.clone()).push(")");
            }
            if let Some(from) = filter.returned_date_from {
                qb.push(" AND r.returned_date >= ").push_bind(from);
            }
            if let Some(to) = filter.returned_date_to {
                qb.push(" AND r.returned_date <= ").push_bind(to);
            }
            if let Some(ref search) = filter.search {
                let pattern = format!("%{search}%");
                qb.push(" AND (s.code ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR s.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR u.first_name || ' ' || u.last_name ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        select
            .push(" ORDER BY r.created_at LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let items = select
            .build_query_as::<ReturnSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total as u64))
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_category(&self, id: i32) -> AppResult<Option<Category>> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn get_location(&self, id: i32) -> AppResult<Option<Location>> {
        Ok(
            sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn get_code_count(&self, key: &str) -> AppResult<Option<CodeCount>> {
        Ok(
            sqlx::query_as::<_, CodeCount>("SELECT * FROM code_counts WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), CommitError> {
        let mut tx = self.pool.begin().await?;

        for write in changes.writes {
            match write {
                Write::InsertAsset(a) => {
                    sqlx::query(
                        "INSERT INTO assets \
                         (id, code, name, specification, installed_date, state, \
                          category_id, location_id, version, \
                          created_at, updated_at, created_by, updated_by) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
                    )
                    .bind(a.id)
                    .bind(&a.code)
                    .bind(&a.name)
                    .bind(&a.specification)
                    .bind(a.installed_date)
                    .bind(a.state)
                    .bind(a.category_id)
                    .bind(a.location_id)
                    .bind(a.version)
                    .bind(a.created_at)
                    .bind(a.updated_at)
                    .bind(&a.created_by)
                    .bind(&a.updated_by)
                    .execute(&mut *tx)
                    .await
                    .map_err(duplicate("asset"))?;
                }
                Write::UpdateAsset(a) => {
                    let result = sqlx::query(
                        "UPDATE assets SET name = $1, specification = $2, \
                         installed_date = $3, state = $4, category_id = $5, \
                         location_id = $6, version = version + 1, \
                         updated_at = $7, updated_by = $8 \
                         WHERE id = $9 AND version = $10",
                    )
                    .bind(&a.name)
                    .bind(&a.specification)
                    .bind(a.installed_date)
                    .bind(a.state)
                    .bind(a.category_id)
                    .bind(a.location_id)
                    .bind(a.updated_at)
                    .bind(&a.updated_by)
                    .bind(a.id)
                    .bind(a.version)
                    .execute(&mut *tx)
                    .await?;
                    if result.rows_affected() == 0 {
                        return Err(Self::classify_miss(&mut tx, "assets", "asset", a.id).await?);
                    }
                }
                Write::DeleteAsset { id, version } => {
                    let result =
                        sqlx::query("DELETE FROM assets WHERE id = $1 AND version = $2")
                            .bind(id)
                            .bind(version)
                            .execute(&mut *tx)
                            .await?;
                    if result.rows_affected() == 0 {
                        return Err(Self::classify_miss(&mut tx, "assets", "asset", id).await?);
                    }
                }
                Write::InsertAssignment(a) => {
                    sqlx::query(
                        "INSERT INTO assignments \
                         (id, user_id, asset_id, assigned_date, note, status, version, \
                          created_at, updated_at, created_by, updated_by) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
                    )
                    .bind(a.id)
                    .bind(a.user_id)
                    .bind(a.asset_id)
                    .bind(a.assigned_date)
                    .bind(&a.note)
                    .bind(a.status)
                    .bind(a.version)
                    .bind(a.created_at)
                    .bind(a.updated_at)
                    .bind(&a.created_by)
                    .bind(&a.updated_by)
                    .execute(&mut *tx)
                    .await
                    .map_err(duplicate("assignment"))?;
                }
                Write::UpdateAssignment(a) => {
                    let result = sqlx::query(
                        "UPDATE assignments SET user_id = $1, asset_id = $2, \
                         assigned_date = $3, note = $4, status = $5, \
                         version = version + 1, updated_at = $6, updated_by = $7 \
                         WHERE id = $8 AND version = $9",
                    )
                    .bind(a.user_id)
                    .bind(a.asset_id)
                    .bind(a.assigned_date)
                    .bind(&a.note)
                    .bind(a.status)
                    .bind(a.updated_at)
                    .bind(&a.updated_by)
                    .bind(a.id)
                    .bind(a.version)
                    .execute(&mut *tx)
                    .await?;
                    if result.rows_affected() == 0 {
                        return Err(Self::classify_miss(
                            &mut tx,
                            "assignments",
                            "assignment",
                            a.id,
                        )
                        .await?);
                    }
                }
                Write::DeleteAssignment { id, version } => {
                    let result =
                        sqlx::query("DELETE FROM assignments WHERE id = $1 AND version = $2")
                            .bind(id)
                            .bind(version)
                            .execute(&mut *tx)
                            .await?;
                    if result.rows_affected() == 0 {
                        return Err(Self::classify_miss(
                            &mut tx,
                            "assignments",
                            "assignment",
                            id,
                        )
                        .await?);
                    }
                }
                Write::InsertReturn(r) => {
                    sqlx::query(
                        "INSERT INTO asset_returns \
                         (id, assignment_id, returned_date, state, version, \
                          created_at, updated_at, created_by, updated_by) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                    )
                    .bind(r.id)
                    .bind(r.assignment_id)
                    .bind(r.returned_date)
                    .bind(r.state)
                    .bind(r.version)
                    .bind(r.created_at)
                    .bind(r.updated_at)
                    .bind(&r.created_by)
                    .bind(&r.updated_by)
                    .execute(&mut *tx)
                    .await
                    .map_err(duplicate("return"))?;
                }
                Write::UpdateReturn(r) => {
                    let result = sqlx::query(
                        "UPDATE asset_returns SET returned_date = $1, state = $2, \
                         version = version + 1, updated_at = $3, updated_by = $4 \
                         WHERE id = $5 AND version = $6",
                    )
                    .bind(r.returned_date)
                    .bind(r.state)
                    .bind(r.updated_at)
                    .bind(&r.updated_by)
                    .bind(r.id)
                    .bind(r.version)
                    .execute(&mut *tx)
                    .await?;
                    if result.rows_affected() == 0 {
                        return Err(
                            Self::classify_miss(&mut tx, "asset_returns", "return", r.id).await?
                        );
                    }
                }
                Write::InsertUser(u) => {
                    sqlx::query(
                        "INSERT INTO users \
                         (id, staff_code, first_name, last_name, joined_date, status, \
                          location_id, version, created_at, updated_at, created_by, updated_by) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
                    )
                    .bind(u.id)
                    .bind(&u.staff_code)
                    .bind(&u.first_name)
                    .bind(&u.last_name)
                    .bind(u.joined_date)
                    .bind(u.status)
                    .bind(u.location_id)
                    .bind(u.version)
                    .bind(u.created_at)
                    .bind(u.updated_at)
                    .bind(&u.created_by)
                    .bind(&u.updated_by)
                    .execute(&mut *tx)
                    .await
                    .map_err(duplicate("user"))?;
                }
                Write::UpdateUser(u) => {
                    let result = sqlx::query(
                        "UPDATE users SET first_name = $1, last_name = $2, \
                         joined_date = $3, status = $4, location_id = $5, \
                         version = version + 1, updated_at = $6, updated_by = $7 \
                         WHERE id = $8 AND version = $9",
                    )
                    .bind(&u.first_name)
                    .bind(&u.last_name)
                    .bind(u.joined_date)
                    .bind(u.status)
                    .bind(u.location_id)
                    .bind(u.updated_at)
                    .bind(&u.updated_by)
                    .bind(u.id)
                    .bind(u.version)
                    .execute(&mut *tx)
                    .await?;
                    if result.rows_affected() == 0 {
                        return Err(Self::classify_miss(&mut tx, "users", "user", u.id).await?);
                    }
                }
                Write::InsertCodeCount(c) => {
                    sqlx::query(
                        "INSERT INTO code_counts (key, last_value, version) VALUES ($1, $2, $3)",
                    )
                    .bind(&c.key)
                    .bind(c.last_value)
                    .bind(c.version)
                    .execute(&mut *tx)
                    .await
                    .map_err(duplicate("code counter"))?;
                }
                Write::UpdateCodeCount(c) => {
                    let result = sqlx::query(
                        "UPDATE code_counts SET last_value = $1, version = version + 1 \
                         WHERE key = $2 AND version = $3",
                    )
                    .bind(c.last_value)
                    .bind(&c.key)
                    .bind(c.version)
                    .execute(&mut *tx)
                    .await?;
                    if result.rows_affected() == 0 {
                        let exists: bool = sqlx::query_scalar(
                            "SELECT EXISTS(SELECT 1 FROM code_counts WHERE key = $1)",
                        )
                        .bind(&c.key)
                        .fetch_one(&mut *tx)
                        .await?;
                        return Err(if exists {
                            CommitError::Conflict("code counter")
                        } else {
                            CommitError::NotFound("code counter")
                        });
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

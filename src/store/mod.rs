//! Storage layer
//!
//! All mutations flow through [`Store::commit`], which applies a whole
//! [`ChangeSet`] atomically with per-row version checks. Readers get plain
//! entity snapshots carrying the version observed at read time; that version
//! is what a later commit is checked against. There is no lock table and no
//! in-memory locking between requests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
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

/// A single entity write inside a change set.
///
/// Update writes carry the entity with the version it was loaded at; the
/// store persists it as `version + 1` and rejects the whole change set if
/// the stored version has moved on. Delete writes are version-checked the
/// same way.
#[derive(Debug, Clone)]
pub enum Write {
    InsertAsset(Asset),
    UpdateAsset(Asset),
    DeleteAsset { id: Uuid, version: i64 },
    InsertAssignment(Assignment),
    UpdateAssignment(Assignment),
    DeleteAssignment { id: Uuid, version: i64 },
    InsertReturn(AssetReturn),
    UpdateReturn(AssetReturn),
    InsertUser(User),
    UpdateUser(User),
    InsertCodeCount(CodeCount),
    UpdateCodeCount(CodeCount),
}

/// An all-or-nothing unit of work
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub writes: Vec<Write>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_asset(mut self, asset: Asset) -> Self {
        self.writes.push(Write::InsertAsset(asset));
        self
    }

    pub fn update_asset(mut self, asset: Asset) -> Self {
        self.writes.push(Write::UpdateAsset(asset));
        self
    }

    pub fn delete_asset(mut self, id: Uuid, version: i64) -> Self {
        self.writes.push(Write::DeleteAsset { id, version });
        self
    }

    pub fn insert_assignment(mut self, assignment: Assignment) -> Self {
        self.writes.push(Write::InsertAssignment(assignment));
        self
    }

    pub fn update_assignment(mut self, assignment: Assignment) -> Self {
        self.writes.push(Write::UpdateAssignment(assignment));
        self
    }

    pub fn delete_assignment(mut self, id: Uuid, version: i64) -> Self {
        self.writes.push(Write::DeleteAssignment { id, version });
        self
    }

    pub fn insert_return(mut self, asset_return: AssetReturn) -> Self {
        self.writes.push(Write::InsertReturn(asset_return));
        self
    }

    pub fn update_return(mut self, asset_return: AssetReturn) -> Self {
        self.writes.push(Write::UpdateReturn(asset_return));
        self
    }

    pub fn insert_user(mut self, user: User) -> Self {
        self.writes.push(Write::InsertUser(user));
        self
    }

    pub fn update_user(mut self, user: User) -> Self {
        self.writes.push(Write::UpdateUser(user));
        self
    }

    pub fn insert_code_count(mut self, count: CodeCount) -> Self {
        self.writes.push(Write::InsertCodeCount(count));
        self
    }

    pub fn update_code_count(mut self, count: CodeCount) -> Self {
        self.writes.push(Write::UpdateCodeCount(count));
        self
    }
}

/// Why a commit was rejected. The whole change set rolls back in every case.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A version check failed: the row was modified concurrently
    #[error("{0} was modified concurrently")]
    Conflict(&'static str),

    /// A uniqueness constraint fired (duplicate id, code or counter key)
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("storage failure: {0}")]
    Backend(String),
}

impl From<CommitError> for AppError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::NotFound(kind) => AppError::NotFound(format!("{kind} not found")),
            CommitError::Conflict(kind) => AppError::being_modified(kind),
            CommitError::Duplicate(kind) => {
                AppError::Internal(format!("unexpected duplicate {kind}"))
            }
            CommitError::Database(e) => AppError::Database(e),
            CommitError::Backend(msg) => AppError::Internal(msg),
        }
    }
}

/// Versioned entity access and atomic unit-of-work commits
#[async_trait]
pub trait Store: Send + Sync {
    // Assets
    async fn get_asset(&self, id: Uuid) -> AppResult<Option<Asset>>;
    async fn get_asset_by_code(&self, code: &str) -> AppResult<Option<Asset>>;
    async fn list_assets(&self, filter: &AssetFilter, page: &PageRequest)
        -> AppResult<Page<Asset>>;
    /// Any assignment, past or present, pins the asset against deletion
    async fn asset_has_assignments(&self, asset_id: Uuid) -> AppResult<bool>;

    // Assignments
    async fn get_assignment(&self, id: Uuid) -> AppResult<Option<Assignment>>;
    async fn list_assignments(
        &self,
        filter: &AssignmentFilter,
        page: &PageRequest,
    ) -> AppResult<Page<AssignmentSummary>>;
    async fn live_assignment_for_asset(&self, asset_id: Uuid) -> AppResult<Option<Assignment>>;
    async fn user_has_live_assignments(&self, user_id: Uuid) -> AppResult<bool>;

    // Returns
    async fn get_return(&self, id: Uuid) -> AppResult<Option<AssetReturn>>;
    async fn latest_return_for_assignment(
        &self,
        assignment_id: Uuid,
    ) -> AppResult<Option<AssetReturn>>;
    async fn list_returns(
        &self,
        filter: &ReturnFilter,
        page: &PageRequest,
    ) -> AppResult<Page<ReturnSummary>>;

    // Lookups
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn get_category(&self, id: i32) -> AppResult<Option<Category>>;
    async fn get_location(&self, id: i32) -> AppResult<Option<Location>>;
    async fn get_code_count(&self, key: &str) -> AppResult<Option<CodeCount>>;

    /// Cheap liveness probe for readiness checks
    async fn ping(&self) -> AppResult<()>;

    /// Apply every write atomically or none of them
    async fn commit(&self, changes: ChangeSet) -> Result<(), CommitError>;
}

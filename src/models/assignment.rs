//! Assignment model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::asset::Asset;
use super::enums::{AssignmentStatus, ReturnState};
use super::user::User;

/// Assignment entity: an asset reserved for a user, pending acceptance
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Assignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub asset_id: Uuid,
    pub assigned_date: NaiveDate,
    pub note: Option<String>,
    pub status: AssignmentStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl Assignment {
    pub fn new(
        user_id: Uuid,
        asset_id: Uuid,
        assigned_date: NaiveDate,
        note: Option<String>,
        actor: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            asset_id,
            assigned_date,
            note,
            status: AssignmentStatus::WaitingForAcceptance,
            version: 0,
            created_at: now,
            updated_at: now,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
        }
    }

    pub fn touch(&mut self, actor: &str) {
        self.updated_at = Utc::now();
        self.updated_by = actor.to_string();
    }
}

/// Create assignment request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewAssignment {
    pub user_id: Uuid,
    pub asset_id: Uuid,
    pub assigned_date: NaiveDate,
    pub note: Option<String>,
}

/// Update assignment request, carrying the version observed at read time
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateAssignment {
    pub user_id: Uuid,
    pub asset_id: Uuid,
    pub assigned_date: NaiveDate,
    pub note: Option<String>,
    pub version: i64,
}

/// Assignment with joined asset and user snapshots for the detail view
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignmentDetail {
    pub assignment: Assignment,
    pub asset: Asset,
    pub user: User,
    pub latest_return_state: Option<ReturnState>,
}

/// Edit view: exactly the fields an editor may change, plus the version
/// that must accompany the subsequent update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignmentEditView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub asset_id: Uuid,
    pub assigned_date: NaiveDate,
    pub note: Option<String>,
    pub version: i64,
}

impl From<Assignment> for AssignmentEditView {
    fn from(a: Assignment) -> Self {
        Self {
            id: a.id,
            user_id: a.user_id,
            asset_id: a.asset_id,
            assigned_date: a.assigned_date,
            note: a.note,
            version: a.version,
        }
    }
}

/// One row of the paged assignment list
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AssignmentSummary {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub asset_code: String,
    pub asset_name: String,
    pub user_id: Uuid,
    pub assignee: String,
    pub assigned_date: NaiveDate,
    pub status: AssignmentStatus,
    pub latest_return_state: Option<ReturnState>,
    pub version: i64,
}

/// Filter for the assignment list query
#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub search: Option<String>,
    pub states: Vec<AssignmentStatus>,
    pub user_id: Option<Uuid>,
    pub assigned_date_from: Option<NaiveDate>,
    pub assigned_date_to: Option<NaiveDate>,
}

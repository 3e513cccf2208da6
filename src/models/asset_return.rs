//! Asset return model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::{AssignmentStatus, ReturnState};

/// A request to hand an assigned asset back
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AssetReturn {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub returned_date: Option<NaiveDate>,
    pub state: ReturnState,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl AssetReturn {
    pub fn new(assignment_id: Uuid, actor: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            assignment_id,
            returned_date: None,
            state: ReturnState::WaitingForReturning,
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

/// One row of the paged return list
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ReturnSummary {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub asset_code: String,
    pub asset_name: String,
    pub assignee: String,
    pub assigned_date: NaiveDate,
    pub returned_date: Option<NaiveDate>,
    pub state: ReturnState,
    pub assignment_status: AssignmentStatus,
}

/// Filter for the return list query
#[derive(Debug, Clone, Default)]
pub struct ReturnFilter {
    pub search: Option<String>,
    pub states: Vec<ReturnState>,
    pub returned_date_from: Option<NaiveDate>,
    pub returned_date_to: Option<NaiveDate>,
}

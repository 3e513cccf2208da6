//! Asset model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::RuleViolation;

use super::enums::AssetState;

/// Asset entity. `version` is the optimistic-lock counter, incremented by
/// the store on every successful write.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Asset {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub specification: String,
    pub installed_date: NaiveDate,
    pub state: AssetState,
    pub category_id: i32,
    pub location_id: i32,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl Asset {
    pub fn new(code: String, request: NewAsset, actor: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code,
            name: request.name,
            specification: request.specification,
            installed_date: request.installed_date,
            state: AssetState::Available,
            category_id: request.category_id,
            location_id: request.location_id,
            version: 0,
            created_at: now,
            updated_at: now,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.state.is_available()
    }

    /// Reserve the asset for an assignment. Only an available asset can be
    /// reserved; this is what prevents double-booking.
    pub fn reserve(&mut self) -> Result<(), RuleViolation> {
        if !self.state.is_available() {
            return Err(RuleViolation::AssetNotAvailable);
        }
        self.state = AssetState::Assigned;
        Ok(())
    }

    /// Release a reserved asset back to the available pool. A no-op when the
    /// asset is not currently assigned.
    pub fn release(&mut self) {
        if self.state.is_assigned() {
            self.state = AssetState::Available;
        }
    }

    /// Stamp the audit trail before a mutating commit
    pub fn touch(&mut self, actor: &str) {
        self.updated_at = Utc::now();
        self.updated_by = actor.to_string();
    }
}

/// Create asset request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewAsset {
    pub name: String,
    pub specification: String,
    pub installed_date: NaiveDate,
    pub category_id: i32,
    pub location_id: i32,
}

/// Update asset request. `version` is the version the editor observed when
/// loading the edit view; a mismatch means someone else got there first.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateAsset {
    pub name: String,
    pub specification: String,
    pub installed_date: NaiveDate,
    pub state: AssetState,
    pub version: i64,
}

/// Filter for the asset list query
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub search: Option<String>,
    pub states: Vec<AssetState>,
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,
}

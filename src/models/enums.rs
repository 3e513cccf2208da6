//! Domain state machines
//!
//! Each lifecycle state is a closed enum with an explicit transition table.
//! The stored representation is the SCREAMING_SNAKE_CASE label.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// AssetState
// ---------------------------------------------------------------------------

/// Lifecycle state of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "asset_state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetState {
    Available,
    NotAvailable,
    Assigned,
    WaitingForRecycling,
    Recycled,
}

impl AssetState {
    pub const ALL: [AssetState; 5] = [
        AssetState::Available,
        AssetState::NotAvailable,
        AssetState::Assigned,
        AssetState::WaitingForRecycling,
        AssetState::Recycled,
    ];

    pub fn is_available(self) -> bool {
        self == AssetState::Available
    }

    pub fn is_assigned(self) -> bool {
        self == AssetState::Assigned
    }

    /// Transition table. `Assigned` is entered only via reserve and left only
    /// via release; the recycling pair is irreversible.
    pub fn can_transition_to(self, next: AssetState) -> bool {
        use AssetState::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Available, Assigned)
                | (Available, NotAvailable)
                | (Available, WaitingForRecycling)
                | (Assigned, Available)
                | (Assigned, NotAvailable)
                | (Assigned, WaitingForRecycling)
                | (NotAvailable, Available)
                | (NotAvailable, WaitingForRecycling)
                | (WaitingForRecycling, Recycled)
        )
    }
}

// Array binding for `state = ANY($1)` filters
impl sqlx::postgres::PgHasArrayType for AssetState {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_asset_state")
    }
}

impl std::str::FromStr for AssetState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(AssetState::Available),
            "NOT_AVAILABLE" => Ok(AssetState::NotAvailable),
            "ASSIGNED" => Ok(AssetState::Assigned),
            "WAITING_FOR_RECYCLING" => Ok(AssetState::WaitingForRecycling),
            "RECYCLED" => Ok(AssetState::Recycled),
            _ => Err(format!("unknown asset state: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// AssignmentStatus
// ---------------------------------------------------------------------------

/// Acceptance workflow of an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "assignment_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    WaitingForAcceptance,
    Accepted,
    Declined,
    Completed,
}

impl AssignmentStatus {
    /// Live assignments keep their asset reserved
    pub fn is_live(self) -> bool {
        matches!(
            self,
            AssignmentStatus::WaitingForAcceptance | AssignmentStatus::Accepted
        )
    }

    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (WaitingForAcceptance, Accepted)
                | (WaitingForAcceptance, Declined)
                | (Accepted, Completed)
        )
    }
}

impl sqlx::postgres::PgHasArrayType for AssignmentStatus {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_assignment_status")
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING_FOR_ACCEPTANCE" => Ok(AssignmentStatus::WaitingForAcceptance),
            "ACCEPTED" => Ok(AssignmentStatus::Accepted),
            "DECLINED" => Ok(AssignmentStatus::Declined),
            "COMPLETED" => Ok(AssignmentStatus::Completed),
            _ => Err(format!("unknown assignment status: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// ReturnState
// ---------------------------------------------------------------------------

/// Lifecycle of a return request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "return_state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnState {
    WaitingForReturning,
    Completed,
    Canceled,
}

impl ReturnState {
    pub fn can_transition_to(self, next: ReturnState) -> bool {
        use ReturnState::*;
        matches!(
            (self, next),
            (WaitingForReturning, Completed) | (WaitingForReturning, Canceled)
        )
    }
}

impl sqlx::postgres::PgHasArrayType for ReturnState {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_return_state")
    }
}

impl std::str::FromStr for ReturnState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING_FOR_RETURNING" => Ok(ReturnState::WaitingForReturning),
            "COMPLETED" => Ok(ReturnState::Completed),
            "CANCELED" => Ok(ReturnState::Canceled),
            _ => Err(format!("unknown return state: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// UserStatus
// ---------------------------------------------------------------------------

/// Account status of a staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(UserStatus::Active),
            "INACTIVE" => Ok(UserStatus::Inactive),
            _ => Err(format!("unknown user status: {s}")),
        }
    }
}

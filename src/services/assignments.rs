//! Assignment lifecycle service
//!
//! Creating an assignment reserves its asset; declining, deleting or
//! completing it releases the asset again. Every path that touches both
//! rows does so in a single commit so the reservation can never go out of
//! sync with the assignment.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{
        asset::Asset,
        assignment::{
            Assignment, AssignmentDetail, AssignmentEditView, AssignmentFilter, AssignmentSummary,
            NewAssignment, UpdateAssignment,
        },
        enums::{AssignmentStatus, UserStatus},
        page::{Page, PageRequest},
        user::User,
    },
    store::{ChangeSet, Store},
};

const DEFAULT_LIST_STATES: [AssignmentStatus; 3] = [
    AssignmentStatus::Accepted,
    AssignmentStatus::WaitingForAcceptance,
    AssignmentStatus::Declined,
];

#[derive(Clone)]
pub struct AssignmentService {
    store: Arc<dyn Store>,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load(&self, id: Uuid) -> AppResult<Assignment> {
        self.store
            .get_assignment(id)
            .await?
            .ok_or_else(|| AppError::NotFound("assignment not found".to_string()))
    }

    async fn load_user(&self, id: Uuid) -> AppResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }

    async fn load_asset(&self, id: Uuid) -> AppResult<Asset> {
        self.store
            .get_asset(id)
            .await?
            .ok_or_else(|| AppError::NotFound("asset not found".to_string()))
    }

    fn check_compatible(user: &User, asset: &Asset) -> AppResult<()> {
        if user.status != UserStatus::Active {
            return Err(AppError::Validation(
                "user is not active".to_string(),
            ));
        }
        if user.location_id != asset.location_id {
            return Err(AppError::Validation(
                "user and asset are in different locations".to_string(),
            ));
        }
        Ok(())
    }

    /// Create an assignment and reserve the asset in the same commit.
    ///
    /// Reservation is what makes concurrent assignment of one asset safe:
    /// both callers read the asset as available, both build a commit that
    /// bumps its version, and the store lets exactly one through.
    pub async fn create_assignment(
        &self,
        request: NewAssignment,
        actor: &str,
    ) -> AppResult<Assignment> {
        let user = self.load_user(request.user_id).await?;
        let mut asset = self.load_asset(request.asset_id).await?;

        Self::check_compatible(&user, &asset)?;
        if request.assigned_date < Utc::now().date_naive() {
            return Err(AppError::Validation(
                "assigned date cannot be in the past".to_string(),
            ));
        }

        asset.reserve()?;
        asset.touch(actor);

        let assignment = Assignment::new(
            request.user_id,
            request.asset_id,
            request.assigned_date,
            request.note,
            actor,
        );

        self.store
            .commit(
                ChangeSet::new()
                    .update_asset(asset)
                    .insert_assignment(assignment.clone()),
            )
            .await?;
        tracing::info!(assignment_id = %assignment.id, asset_id = %assignment.asset_id, "assignment created");
        Ok(assignment)
    }

    /// Edit an assignment that is still waiting for acceptance. Swapping the
    /// asset releases the old one and reserves the new one atomically.
    pub async fn update_assignment(
        &self,
        id: Uuid,
        request: UpdateAssignment,
        actor: &str,
    ) -> AppResult<Assignment> {
        let mut assignment = self.load(id).await?;

        if assignment.status != AssignmentStatus::WaitingForAcceptance {
            return Err(RuleViolation::AssignmentNotUpdatable.into());
        }
        if assignment.version != request.version {
            return Err(AppError::being_modified("assignment"));
        }
        if request.assigned_date != assignment.assigned_date
            && request.assigned_date < Utc::now().date_naive()
        {
            return Err(AppError::Validation(
                "assigned date cannot be moved into the past".to_string(),
            ));
        }

        let user = self.load_user(request.user_id).await?;
        let mut changes = ChangeSet::new();

        if request.asset_id != assignment.asset_id {
            let mut old_asset = self.load_asset(assignment.asset_id).await?;
            let mut new_asset = self.load_asset(request.asset_id).await?;

            Self::check_compatible(&user, &new_asset)?;
            new_asset.reserve()?;
            new_asset.touch(actor);
            old_asset.release();
            old_asset.touch(actor);

            changes = changes.update_asset(old_asset).update_asset(new_asset);
        } else {
            let asset = self.load_asset(assignment.asset_id).await?;
            Self::check_compatible(&user, &asset)?;
        }

        assignment.user_id = request.user_id;
        assignment.asset_id = request.asset_id;
        assignment.assigned_date = request.assigned_date;
        assignment.note = request.note;
        assignment.touch(actor);

        self.store
            .commit(changes.update_assignment(assignment.clone()))
            .await?;
        assignment.version += 1;
        Ok(assignment)
    }

    /// Accept or decline a waiting assignment. Declining releases the asset
    /// in the same commit. Completion is not reachable here; it happens when
    /// a return request completes.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: AssignmentStatus,
        version: i64,
        actor: &str,
    ) -> AppResult<Assignment> {
        let mut assignment = self.load(id).await?;

        if assignment.version != version {
            return Err(AppError::being_modified("assignment"));
        }
        if status == AssignmentStatus::Completed
            || !assignment.status.can_transition_to(status)
        {
            return Err(RuleViolation::AssignmentStatusNotUpdatable.into());
        }

        assignment.status = status;
        assignment.touch(actor);

        let mut changes = ChangeSet::new();
        if status == AssignmentStatus::Declined {
            let mut asset = self.load_asset(assignment.asset_id).await?;
            asset.release();
            asset.touch(actor);
            changes = changes.update_asset(asset);
        }

        self.store
            .commit(changes.update_assignment(assignment.clone()))
            .await?;
        assignment.version += 1;
        tracing::info!(assignment_id = %assignment.id, status = ?assignment.status, "assignment status changed");
        Ok(assignment)
    }

    /// Delete an assignment that never took effect. A waiting assignment
    /// still holds its asset, so deletion releases it; a declined one
    /// already released it.
    pub async fn delete_assignment(&self, id: Uuid, version: i64, actor: &str) -> AppResult<()> {
        let assignment = self.load(id).await?;

        if assignment.version != version {
            return Err(AppError::being_modified("assignment"));
        }
        if !matches!(
            assignment.status,
            AssignmentStatus::WaitingForAcceptance | AssignmentStatus::Declined
        ) {
            return Err(RuleViolation::AssignmentNotDeletable.into());
        }

        let mut changes = ChangeSet::new();
        if assignment.status == AssignmentStatus::WaitingForAcceptance {
            let mut asset = self.load_asset(assignment.asset_id).await?;
            asset.release();
            asset.touch(actor);
            changes = changes.update_asset(asset);
        }

        self.store
            .commit(changes.delete_assignment(id, version))
            .await?;
        Ok(())
    }

    pub async fn get_assignment_detail(&self, id: Uuid) -> AppResult<AssignmentDetail> {
        let assignment = self.load(id).await?;
        let asset = self.load_asset(assignment.asset_id).await?;
        let user = self.load_user(assignment.user_id).await?;
        let latest_return_state = self
            .store
            .latest_return_for_assignment(id)
            .await?
            .map(|r| r.state);

        Ok(AssignmentDetail {
            assignment,
            asset,
            user,
            latest_return_state,
        })
    }

    pub async fn get_assignment_edit_view(&self, id: Uuid) -> AppResult<AssignmentEditView> {
        let assignment = self.load(id).await?;
        if assignment.status != AssignmentStatus::WaitingForAcceptance {
            return Err(RuleViolation::AssignmentNotUpdatable.into());
        }
        Ok(assignment.into())
    }

    pub async fn list_assignments(
        &self,
        mut filter: AssignmentFilter,
        page: PageRequest,
    ) -> AppResult<Page<AssignmentSummary>> {
        if filter.states.is_empty() {
            filter.states = DEFAULT_LIST_STATES.to_vec();
        }
        self.store.list_assignments(&filter, &page).await
    }
}

//! Return request lifecycle service
//!
//! A return request only exists for an accepted assignment and an
//! assignment carries at most one active request. Completing a request
//! closes the assignment and releases the asset in the same commit.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{
        asset_return::{AssetReturn, ReturnFilter, ReturnSummary},
        enums::{AssignmentStatus, ReturnState},
        page::{Page, PageRequest},
    },
    store::{ChangeSet, Store},
};

/// Canceled requests stay out of the list unless asked for
const DEFAULT_LIST_STATES: [ReturnState; 2] =
    [ReturnState::WaitingForReturning, ReturnState::Completed];

#[derive(Clone)]
pub struct ReturnService {
    store: Arc<dyn Store>,
}

impl ReturnService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load(&self, id: Uuid) -> AppResult<AssetReturn> {
        self.store
            .get_return(id)
            .await?
            .ok_or_else(|| AppError::NotFound("return request not found".to_string()))
    }

    /// Open a return request for an accepted assignment. A canceled earlier
    /// request does not block a new one; a waiting or completed one does.
    pub async fn create_return(&self, assignment_id: Uuid, actor: &str) -> AppResult<AssetReturn> {
        let assignment = self
            .store
            .get_assignment(assignment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("assignment not found".to_string()))?;

        if assignment.status != AssignmentStatus::Accepted {
            return Err(RuleViolation::AssignmentNotAccepted.into());
        }

        if let Some(latest) = self.store.latest_return_for_assignment(assignment_id).await? {
            match latest.state {
                ReturnState::WaitingForReturning => {
                    return Err(RuleViolation::ReturnAlreadyRequested.into())
                }
                ReturnState::Completed => return Err(RuleViolation::AssetAlreadyReturned.into()),
                ReturnState::Canceled => {}
            }
        }

        let request = AssetReturn::new(assignment_id, actor);
        self.store
            .commit(ChangeSet::new().insert_return(request.clone()))
            .await?;
        tracing::info!(return_id = %request.id, %assignment_id, "return requested");
        Ok(request)
    }

    /// Complete or cancel a waiting return request.
    ///
    /// Completion is the cascade: stamp today's date on the request, close
    /// the assignment and put the asset back in the pool, all in one commit.
    /// Cancellation touches the request alone.
    pub async fn update_return(
        &self,
        id: Uuid,
        state: ReturnState,
        version: i64,
        actor: &str,
    ) -> AppResult<AssetReturn> {
        let mut request = self.load(id).await?;

        if request.version != version {
            return Err(AppError::being_modified("return request"));
        }
        if !request.state.can_transition_to(state) {
            return Err(RuleViolation::ReturnNotUpdatable.into());
        }

        request.state = state;
        request.touch(actor);

        let mut changes = ChangeSet::new();
        if state == ReturnState::Completed {
            request.returned_date = Some(Utc::now().date_naive());

            let mut assignment = self
                .store
                .get_assignment(request.assignment_id)
                .await?
                .ok_or_else(|| AppError::NotFound("assignment not found".to_string()))?;
            let mut asset = self
                .store
                .get_asset(assignment.asset_id)
                .await?
                .ok_or_else(|| AppError::NotFound("asset not found".to_string()))?;

            assignment.status = AssignmentStatus::Completed;
            assignment.touch(actor);
            asset.release();
            asset.touch(actor);

            changes = changes.update_assignment(assignment).update_asset(asset);
        }

        self.store
            .commit(changes.update_return(request.clone()))
            .await?;
        request.version += 1;
        tracing::info!(return_id = %request.id, state = ?request.state, "return request updated");
        Ok(request)
    }

    pub async fn list_returns(
        &self,
        mut filter: ReturnFilter,
        page: PageRequest,
    ) -> AppResult<Page<ReturnSummary>> {
        if filter.states.is_empty() {
            filter.states = DEFAULT_LIST_STATES.to_vec();
        }
        self.store.list_returns(&filter, &page).await
    }
}

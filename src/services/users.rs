//! Staff member service

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{
        enums::UserStatus,
        user::{NewUser, User},
    },
    store::{ChangeSet, CommitError, Store},
};

use super::codes::CodeService;

const CREATE_ATTEMPTS: u32 = 4;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    codes: CodeService,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, codes: CodeService) -> Self {
        Self { store, codes }
    }

    pub async fn create_user(&self, request: NewUser, actor: &str) -> AppResult<User> {
        self.store
            .get_location(request.location_id)
            .await?
            .ok_or_else(|| AppError::Validation("unknown location".to_string()))?;

        for _ in 0..CREATE_ATTEMPTS {
            let staff_code = self.codes.next_staff_code().await?;
            let user = User::new(staff_code, request.clone(), actor);
            match self
                .store
                .commit(ChangeSet::new().insert_user(user.clone()))
                .await
            {
                Ok(()) => {
                    tracing::info!(staff_code = %user.staff_code, "user created");
                    return Ok(user);
                }
                Err(CommitError::Duplicate(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Transient(
            "could not create user under concurrent load, please retry".to_string(),
        ))
    }

    pub async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }

    /// Activate or deactivate a staff member. Deactivation is refused while
    /// the user still holds a waiting or accepted assignment.
    pub async fn update_user_status(
        &self,
        id: Uuid,
        status: UserStatus,
        version: i64,
        actor: &str,
    ) -> AppResult<User> {
        let mut user = self.get_user(id).await?;

        if user.version != version {
            return Err(AppError::being_modified("user"));
        }
        if status == UserStatus::Inactive && self.store.user_has_live_assignments(id).await? {
            return Err(RuleViolation::UserHasActiveAssignments.into());
        }

        user.status = status;
        user.touch(actor);

        self.store
            .commit(ChangeSet::new().update_user(user.clone()))
            .await?;
        user.version += 1;
        Ok(user)
    }
}

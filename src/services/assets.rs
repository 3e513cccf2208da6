//! Asset lifecycle service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{
        asset::{Asset, AssetFilter, NewAsset, UpdateAsset},
        enums::AssetState,
        page::{Page, PageRequest},
    },
    store::{ChangeSet, CommitError, Store},
};

use super::codes::CodeService;

/// States the asset list shows when the caller does not filter explicitly.
/// The recycling pair only appears when asked for.
const DEFAULT_LIST_STATES: [AssetState; 3] = [
    AssetState::Available,
    AssetState::NotAvailable,
    AssetState::Assigned,
];

/// Insert retries when a generated code collides with a concurrent create
const CREATE_ATTEMPTS: u32 = 4;

#[derive(Clone)]
pub struct AssetService {
    store: Arc<dyn Store>,
    codes: CodeService,
}

impl AssetService {
    pub fn new(store: Arc<dyn Store>, codes: CodeService) -> Self {
        Self { store, codes }
    }

    /// Create an asset in the `AVAILABLE` state with a freshly generated
    /// code. The code prefix comes from the category.
    pub async fn create_asset(&self, request: NewAsset, actor: &str) -> AppResult<Asset> {
        let category = self
            .store
            .get_category(request.category_id)
            .await?
            .ok_or_else(|| AppError::Validation("unknown category".to_string()))?;
        self.store
            .get_location(request.location_id)
            .await?
            .ok_or_else(|| AppError::Validation("unknown location".to_string()))?;

        for _ in 0..CREATE_ATTEMPTS {
            let code = self.codes.next_asset_code(&category.prefix).await?;
            let asset = Asset::new(code, request.clone(), actor);
            match self
                .store
                .commit(ChangeSet::new().insert_asset(asset.clone()))
                .await
            {
                Ok(()) => {
                    tracing::info!(code = %asset.code, "asset created");
                    return Ok(asset);
                }
                // Another instance claimed the same code between allocation
                // and insert; allocate a new one and try again.
                Err(CommitError::Duplicate(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Transient(
            "could not create asset under concurrent load, please retry".to_string(),
        ))
    }

    pub async fn get_asset(&self, id: uuid::Uuid) -> AppResult<Asset> {
        self.store
            .get_asset(id)
            .await?
            .ok_or_else(|| AppError::NotFound("asset not found".to_string()))
    }

    /// Edit an asset. An assigned asset is frozen, and the edit cannot move
    /// the state along an edge the lifecycle does not allow. `ASSIGNED` is
    /// never entered through an edit, only through assignment creation.
    pub async fn update_asset(
        &self,
        id: uuid::Uuid,
        request: UpdateAsset,
        actor: &str,
    ) -> AppResult<Asset> {
        let mut asset = self.get_asset(id).await?;

        if asset.version != request.version {
            return Err(AppError::being_modified("asset"));
        }
        if asset.state.is_assigned() {
            return Err(RuleViolation::AssetNotEditable.into());
        }
        if request.state.is_assigned() || !asset.state.can_transition_to(request.state) {
            return Err(RuleViolation::AssetStateInvalid.into());
        }

        asset.name = request.name;
        asset.specification = request.specification;
        asset.installed_date = request.installed_date;
        asset.state = request.state;
        asset.touch(actor);

        self.store
            .commit(ChangeSet::new().update_asset(asset.clone()))
            .await?;
        asset.version += 1;
        Ok(asset)
    }

    /// Delete an asset. Any assignment history, live or not, pins the asset.
    pub async fn delete_asset(&self, id: uuid::Uuid, version: i64) -> AppResult<()> {
        let asset = self.get_asset(id).await?;

        if asset.version != version {
            return Err(AppError::being_modified("asset"));
        }
        if self.store.asset_has_assignments(id).await? {
            return Err(RuleViolation::AssetNotDeletable.into());
        }

        self.store
            .commit(ChangeSet::new().delete_asset(id, version))
            .await?;
        tracing::info!(code = %asset.code, "asset deleted");
        Ok(())
    }

    pub async fn list_assets(
        &self,
        mut filter: AssetFilter,
        page: PageRequest,
    ) -> AppResult<Page<Asset>> {
        if filter.states.is_empty() {
            filter.states = DEFAULT_LIST_STATES.to_vec();
        }
        self.store.list_assets(&filter, &page).await
    }
}

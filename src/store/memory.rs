//! In-memory store
//!
//! Mirrors the Postgres backend's version semantics over mutex-guarded maps:
//! one commit at a time, each write version-checked, the whole change set
//! applied or none of it. Backs the lifecycle integration tests and ad-hoc
//! setups without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
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

#[derive(Default)]
struct Inner {
    assets: HashMap<Uuid, Asset>,
    assignments: HashMap<Uuid, Assignment>,
    returns: HashMap<Uuid, AssetReturn>,
    users: HashMap<Uuid, User>,
    categories: HashMap<i32, Category>,
    locations: HashMap<i32, Location>,
    code_counts: HashMap<String, CodeCount>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn seed_category(&self, category: Category) {
        self.lock().categories.insert(category.id, category);
    }

    pub fn seed_location(&self, location: Location) {
        self.lock().locations.insert(location.id, location);
    }

    pub fn seed_user(&self, user: User) {
        self.lock().users.insert(user.id, user);
    }
}

fn matches_search(haystacks: &[&str], search: &Option<String>) -> bool {
    match search {
        None => true,
        Some(term) => {
            let term = term.to_lowercase();
            haystacks.iter().any(|h| h.to_lowercase().contains(&term))
        }
    }
}

fn paginate<T>(mut items: Vec<T>, page: &PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let start = (page.offset() as usize).min(items.len());
    let end = (start + page.limit() as usize).min(items.len());
    let items = items.drain(start..end).collect();
    Page::new(items, page, total)
}

impl Inner {
    fn latest_return(&self, assignment_id: Uuid) -> Option<&AssetReturn> {
        self.returns
            .values()
            .filter(|r| r.assignment_id == assignment_id)
            .max_by_key(|r| (r.created_at, r.id))
    }

    /// Validate one write against current state without applying it
    fn check(&self, write: &Write) -> Result<(), CommitError> {
        match write {
            Write::InsertAsset(a) => {
                if self.assets.contains_key(&a.id)
                    || self.assets.values().any(|other| other.code == a.code)
                {
                    return Err(CommitError::Duplicate("asset"));
                }
            }
            Write::UpdateAsset(a) => check_version(self.assets.get(&a.id), a.version, "asset")?,
            Write::DeleteAsset { id, version } => {
                check_version(self.assets.get(id), *version, "asset")?
            }
            Write::InsertAssignment(a) => {
                if self.assignments.contains_key(&a.id) {
                    return Err(CommitError::Duplicate("assignment"));
                }
            }
            Write::UpdateAssignment(a) => {
                check_version(self.assignments.get(&a.id), a.version, "assignment")?
            }
            Write::DeleteAssignment { id, version } => {
                check_version(self.assignments.get(id), *version, "assignment")?
            }
            Write::InsertReturn(r) => {
                if self.returns.contains_key(&r.id) {
                    return Err(CommitError::Duplicate("return"));
                }
            }
            Write::UpdateReturn(r) => check_version(self.returns.get(&r.id), r.version, "return")?,
            Write::InsertUser(u) => {
                if self.users.contains_key(&u.id)
                    || self.users.values().any(|other| other.staff_code == u.staff_code)
                {
                    return Err(CommitError::Duplicate("user"));
                }
            }
            Write::UpdateUser(u) => check_version(self.users.get(&u.id), u.version, "user")?,
            Write::InsertCodeCount(c) => {
                if self.code_counts.contains_key(&c.key) {
                    return Err(CommitError::Duplicate("code counter"));
                }
            }
            Write::UpdateCodeCount(c) => {
                check_version(self.code_counts.get(&c.key), c.version, "code counter")?
            }
        }
        Ok(())
    }

    fn apply(&mut self, write: Write) {
        match write {
            Write::InsertAsset(a) => {
                self.assets.insert(a.id, a);
            }
            Write::UpdateAsset(mut a) => {
                a.version += 1;
                self.assets.insert(a.id, a);
            }
            Write::DeleteAsset { id, .. } => {
                self.assets.remove(&id);
            }
            Write::InsertAssignment(a) => {
                self.assignments.insert(a.id, a);
            }
            Write::UpdateAssignment(mut a) => {
                a.version += 1;
                self.assignments.insert(a.id, a);
            }
            Write::DeleteAssignment { id, .. } => {
                self.assignments.remove(&id);
            }
            Write::InsertReturn(r) => {
                self.returns.insert(r.id, r);
            }
            Write::UpdateReturn(mut r) => {
                r.version += 1;
                self.returns.insert(r.id, r);
            }
            Write::InsertUser(u) => {
                self.users.insert(u.id, u);
            }
            Write::UpdateUser(mut u) => {
                u.version += 1;
                self.users.insert(u.id, u);
            }
            Write::InsertCodeCount(c) => {
                self.code_counts.insert(c.key.clone(), c);
            }
            Write::UpdateCodeCount(mut c) => {
                c.version += 1;
                self.code_counts.insert(c.key.clone(), c);
            }
        }
    }
}

/// Version check used by every update/delete
fn check_version<T: Versioned>(
    current: Option<&T>,
    expected: i64,
    kind: &'static str,
) -> Result<(), CommitError> {
    match current {
        None => Err(CommitError::NotFound(kind)),
        Some(entity) if entity.version() != expected => Err(CommitError::Conflict(kind)),
        Some(_) => Ok(()),
    }
}

trait Versioned {
    fn version(&self) -> i64;
}

macro_rules! versioned {
    ($($ty:ty),*) => {
        $(impl Versioned for $ty {
            fn version(&self) -> i64 {
                self.version
            }
        })*
    };
}

versioned!(Asset, Assignment, AssetReturn, User, CodeCount);

#[async_trait]
impl Store for MemoryStore {
    async fn get_asset(&self, id: Uuid) -> AppResult<Option<Asset>> {
        Ok(self.lock().assets.get(&id).cloned())
    }

    async fn get_asset_by_code(&self, code: &str) -> AppResult<Option<Asset>> {
        Ok(self.lock().assets.values().find(|a| a.code == code).cloned())
    }

    async fn list_assets(
        &self,
        filter: &AssetFilter,
        page: &PageRequest,
    ) -> AppResult<Page<Asset>> {
        let inner = self.lock();
        let mut assets: Vec<Asset> = inner
            .assets
            .values()
            .filter(|a| filter.states.is_empty() || filter.states.contains(&a.state))
            .filter(|a| filter.category_id.map_or(true, |c| a.category_id == c))
            .filter(|a| filter.location_id.map_or(true, |l| a.location_id == l))
            .filter(|a| matches_search(&[&a.code, &a.name], &filter.search))
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(paginate(assets, page))
    }

    async fn asset_has_assignments(&self, asset_id: Uuid) -> AppResult<bool> {
        Ok(self
            .lock()
            .assignments
            .values()
            .any(|a| a.asset_id == asset_id))
    }

    async fn get_assignment(&self, id: Uuid) -> AppResult<Option<Assignment>> {
        Ok(self.lock().assignments.get(&id).cloned())
    }

    async fn list_assignments(
        &self,
        filter: &AssignmentFilter,
        page: &PageRequest,
    ) -> AppResult<Page<AssignmentSummary>> {
        let inner = self.lock();
        let mut rows: Vec<AssignmentSummary> = inner
            .assignments
            .values()
            .filter(|a| filter.states.is_empty() || filter.states.contains(&a.status))
            .filter(|a| filter.user_id.map_or(true, |u| a.user_id == u))
            .filter(|a| filter.assigned_date_from.map_or(true, |d| a.assigned_date >= d))
            .filter(|a| filter.assigned_date_to.map_or(true, |d| a.assigned_date <= d))
            .filter_map(|a| {
                let asset = inner.assets.get(&a.asset_id)?;
                let user = inner.users.get(&a.user_id)?;
                let assignee = user.full_name();
                if !matches_search(&[&asset.code, &asset.name, &assignee], &filter.search) {
                    return None;
                }
                Some(AssignmentSummary {
                    id: a.id,
                    asset_id: a.asset_id,
                    asset_code: asset.code.clone(),
                    asset_name: asset.name.clone(),
                    user_id: a.user_id,
                    assignee,
                    assigned_date: a.assigned_date,
                    status: a.status,
                    latest_return_state: inner.latest_return(a.id).map(|r| r.state),
                    version: a.version,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.assigned_date
                .cmp(&b.assigned_date)
                .then(a.asset_code.cmp(&b.asset_code))
        });
        Ok(paginate(rows, page))
    }

    async fn live_assignment_for_asset(&self, asset_id: Uuid) -> AppResult<Option<Assignment>> {
        Ok(self
            .lock()
            .assignments
            .values()
            .find(|a| a.asset_id == asset_id && a.status.is_live())
            .cloned())
    }

    async fn user_has_live_assignments(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(self
            .lock()
            .assignments
            .values()
            .any(|a| a.user_id == user_id && a.status.is_live()))
    }

    async fn get_return(&self, id: Uuid) -> AppResult<Option<AssetReturn>> {
        Ok(self.lock().returns.get(&id).cloned())
    }

    async fn latest_return_for_assignment(
        &self,
        assignment_id: Uuid,
    ) -> AppResult<Option<AssetReturn>> {
        Ok(self.lock().latest_return(assignment_id).cloned())
    }

    async fn list_returns(
        &self,
        filter: &ReturnFilter,
        page: &PageRequest,
    ) -> AppResult<Page<ReturnSummary>> {
        let inner = self.lock();
        let mut rows: Vec<(chrono::DateTime<chrono::Utc>, ReturnSummary)> = inner
            .returns
            .values()
            .filter(|r| filter.states.is_empty() || filter.states.contains(&r.state))
            .filter(|r| {
                filter
                    .returned_date_from
                    .map_or(true, |d| r.returned_date.map_or(false, |rd| rd >= d))
            })
            .filter(|r| {
                filter
                    .returned_date_to
                    .map_or(true, |d| r.returned_date.map_or(false, |rd| rd <= d))
            })
            .filter_map(|r| {
                let assignment = inner.assignments.get(&r.assignment_id)?;
                let asset = inner.assets.get(&assignment.asset_id)?;
                let user = inner.users.get(&assignment.user_id)?;
                let assignee = user.full_name();
                if !matches_search(&[&asset.code, &asset.name, &assignee], &filter.search) {
                    return None;
                }
                Some((
                    r.created_at,
                    ReturnSummary {
                        id: r.id,
                        assignment_id: r.assignment_id,
                        asset_code: asset.code.clone(),
                        asset_name: asset.name.clone(),
                        assignee,
                        assigned_date: assignment.assigned_date,
                        returned_date: r.returned_date,
                        state: r.state,
                        assignment_status: assignment.status,
                    },
                ))
            })
            .collect();
        rows.sort_by_key(|(created_at, _)| *created_at);
        let rows = rows.into_iter().map(|(_, row)| row).collect();
        Ok(paginate(rows, page))
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn get_category(&self, id: i32) -> AppResult<Option<Category>> {
        Ok(self.lock().categories.get(&id).cloned())
    }

    async fn get_location(&self, id: i32) -> AppResult<Option<Location>> {
        Ok(self.lock().locations.get(&id).cloned())
    }

    async fn get_code_count(&self, key: &str) -> AppResult<Option<CodeCount>> {
        Ok(self.lock().code_counts.get(key).cloned())
    }

    async fn ping(&self) -> AppResult<()> {
        self.lock();
        Ok(())
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), CommitError> {
        let mut inner = self.lock();
        for write in &changes.writes {
            inner.check(write)?;
        }
        for write in changes.writes {
            inner.apply(write);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::asset::NewAsset;
    use chrono::NaiveDate;

    fn asset(code: &str) -> Asset {
        Asset::new(
            code.to_string(),
            NewAsset {
                name: "Laptop".to_string(),
                specification: "spec".to_string(),
                installed_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                category_id: 1,
                location_id: 1,
            },
            "admin",
        )
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = MemoryStore::new();
        let a = asset("LA000001");
        store
            .commit(ChangeSet::new().insert_asset(a.clone()))
            .await
            .unwrap();
        store
            .commit(ChangeSet::new().update_asset(a.clone()))
            .await
            .unwrap();
        let stored = store.get_asset(a.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let store = MemoryStore::new();
        let a = asset("LA000001");
        store
            .commit(ChangeSet::new().insert_asset(a.clone()))
            .await
            .unwrap();
        store
            .commit(ChangeSet::new().update_asset(a.clone()))
            .await
            .unwrap();
        // still carries version 0
        let err = store
            .commit(ChangeSet::new().update_asset(a))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::Conflict("asset")));
    }

    #[tokio::test]
    async fn test_failed_change_set_applies_nothing() {
        let store = MemoryStore::new();
        let a = asset("LA000001");
        let b = asset("LA000002");
        store
            .commit(ChangeSet::new().insert_asset(a.clone()))
            .await
            .unwrap();

        let mut stale = a.clone();
        stale.version = 7;
        let err = store
            .commit(ChangeSet::new().insert_asset(b.clone()).update_asset(stale))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::Conflict("asset")));
        assert!(store.get_asset(b.id).await.unwrap().is_none());
        assert_eq!(store.get_asset(a.id).await.unwrap().unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let store = MemoryStore::new();
        store
            .commit(ChangeSet::new().insert_asset(asset("LA000001")))
            .await
            .unwrap();
        let err = store
            .commit(ChangeSet::new().insert_asset(asset("LA000001")))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::Duplicate("asset")));
    }

    #[tokio::test]
    async fn test_ping_succeeds() {
        let store = MemoryStore::new();
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .commit(ChangeSet::new().update_asset(asset("LA000009")))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::NotFound("asset")));
    }
}

//! Business services
//!
//! Services own the lifecycle rules and build the change sets the store
//! commits. Every mutating operation takes the acting user explicitly; there
//! is no ambient identity.

pub mod asset_returns;
pub mod assets;
pub mod assignments;
pub mod codes;
pub mod users;

use std::sync::Arc;

use crate::store::Store;

use self::{
    asset_returns::ReturnService, assets::AssetService, assignments::AssignmentService,
    codes::CodeService, users::UserService,
};

/// All services wired to one store
#[derive(Clone)]
pub struct Services {
    pub codes: CodeService,
    pub assets: AssetService,
    pub assignments: AssignmentService,
    pub asset_returns: ReturnService,
    pub users: UserService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let codes = CodeService::new(store.clone());
        Self {
            assets: AssetService::new(store.clone(), codes.clone()),
            assignments: AssignmentService::new(store.clone()),
            asset_returns: ReturnService::new(store.clone()),
            users: UserService::new(store.clone(), codes.clone()),
            codes,
        }
    }
}

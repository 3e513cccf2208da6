//! Domain models

pub mod asset;
pub mod asset_return;
pub mod assignment;
pub mod category;
pub mod code_count;
pub mod enums;
pub mod location;
pub mod page;
pub mod user;

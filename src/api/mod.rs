//! API handlers for the OAM REST endpoints

pub mod asset_returns;
pub mod assets;
pub mod assignments;
pub mod health;
pub mod openapi;
pub mod users;

use std::str::FromStr;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, AppState};

/// Header naming the user performing the request
pub const ACTING_USER_HEADER: &str = "x-acting-user";

/// Extractor for the acting user recorded in audit fields.
///
/// Requests without the header are attributed to `system`.
pub struct Actor(pub String);

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTING_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("system");

        Ok(Actor(actor.to_string()))
    }
}

/// Parse a comma-separated list of state labels from a query parameter.
/// `None` or an empty string means "no filter".
fn parse_states<T>(raw: Option<&str>) -> Result<Vec<T>, AppError>
where
    T: FromStr<Err = String>,
{
    match raw {
        None => Ok(Vec::new()),
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<T>().map_err(AppError::Validation))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::AssetState;

    #[test]
    fn test_parse_states_list() {
        let states: Vec<AssetState> = parse_states(Some("AVAILABLE, ASSIGNED")).unwrap();
        assert_eq!(states, vec![AssetState::Available, AssetState::Assigned]);
    }

    #[test]
    fn test_parse_states_empty_and_invalid() {
        let states: Vec<AssetState> = parse_states(None).unwrap();
        assert!(states.is_empty());
        assert!(parse_states::<AssetState>(Some("BROKEN")).is_err());
    }
}

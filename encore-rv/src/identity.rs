//! Caller identity
//!
//! The authenticating gateway in front of encore-rv sets `x-user-id` and
//! optionally `x-user-name`; handlers that act on behalf of a user take a
//! [`CurrentUser`].

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use encore_common::models::DEFAULT_USER_NAME;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, USER_ID_HEADER).ok_or(ApiError::Unauthorized)?;
        let name =
            header_value(parts, USER_NAME_HEADER).unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
        Ok(Self { id, name })
    }
}

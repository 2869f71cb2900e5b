//! Caller identity extracted from request headers.
//!
//! Authentication itself happens upstream; this service trusts the
//! `x-user-id` and `x-role` headers it is handed.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::Actor;

use crate::error::ApiError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the caller's role; `admin` marks an administrator.
pub const ROLE_HEADER: &str = "x-role";

fn user_id(parts: &Parts) -> Result<UserId, ApiError> {
    let value = parts
        .headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER} header")))
}

fn is_admin(parts: &Parts) -> bool {
    parts
        .headers
        .get(ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"))
}

/// The authenticated caller acting as a customer.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl CurrentUser {
    /// Returns the caller as an order owner.
    pub fn actor(&self) -> Actor {
        Actor::Owner(self.0)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id(parts).map(CurrentUser)
    }
}

/// The authenticated caller acting as an administrator.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = user_id(parts)?;
        if !is_admin(parts) {
            return Err(ApiError::Forbidden("administrator role required".to_string()));
        }
        Ok(AdminUser(user_id))
    }
}

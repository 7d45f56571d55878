use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Deserialize;

use crate::error::AppError;

/// Caller role as resolved by the upstream gateway.
///
/// Roles below `User` are privileged and may operate on blobs they do not
/// own; `User` is the restricted role bound by ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum Role {
    Admin,
    Moderator,
    User,
}

impl Role {
    /// Whether the role is subject to ownership checks.
    pub fn is_restricted(self) -> bool {
        matches!(self, Role::User)
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::Admin),
            1 => Ok(Role::Moderator),
            2 => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Resolved caller identity extracted from the `X-Current-User` header.
///
/// Authentication itself happens upstream; the gateway verifies the caller
/// and injects this header as JSON before the request reaches this service.
/// Add this as a handler parameter to require an identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("X-Current-User")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::AuthMissing)?;

        serde_json::from_str(header)
            .map_err(|_| AppError::Validation("Invalid X-Current-User header".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_from_wire_integer() {
        assert_eq!(Role::try_from(0), Ok(Role::Admin));
        assert_eq!(Role::try_from(1), Ok(Role::Moderator));
        assert_eq!(Role::try_from(2), Ok(Role::User));
        assert!(Role::try_from(7).is_err());
    }

    #[test]
    fn only_user_role_is_restricted() {
        assert!(Role::User.is_restricted());
        assert!(!Role::Admin.is_restricted());
        assert!(!Role::Moderator.is_restricted());
    }

    #[test]
    fn identity_deserializes_from_header_json() {
        let user: AuthUser =
            serde_json::from_str(r#"{"userId":"u1","username":"alice","role":2}"#).unwrap();
        assert_eq!(user.user_id, "u1");
        assert_eq!(user.role, Role::User);
    }
}

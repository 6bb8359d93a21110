use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::accounts::jwt::JwtKeys;
use crate::accounts::repo_types::{Role, User};
use crate::error::AppError;
use crate::state::AppState;

/// Name of the session cookie carrying the signed token.
pub const SESSION_COOKIE: &str = "token";

/// Authenticates the request: cookie -> token verification -> user lookup.
/// A stale token for a deleted account fails like any other bad token.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| AppError::Unauthenticated("Authorization token is missing".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired session token");
            AppError::Unauthenticated("Invalid or expired token".into())
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token for a user that no longer exists");
                AppError::Unauthenticated("Invalid or expired token".into())
            })?;

        Ok(CurrentUser(user))
    }
}

fn gate(user: User, required: Role) -> Result<User, AppError> {
    if user.role.permits(required) {
        Ok(user)
    } else {
        warn!(user_id = %user.id, role = %user.role, required = %required, "role gate denied");
        Err(AppError::Forbidden(
            "You do not have permission to access this resource".into(),
        ))
    }
}

pub struct RequireAdmin(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        Ok(RequireAdmin(gate(user, Role::Admin)?))
    }
}

pub struct RequireShipper(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireShipper {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        Ok(RequireShipper(gate(user, Role::Shipper)?))
    }
}

pub struct RequireCarrier(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireCarrier {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        Ok(RequireCarrier(gate(user, Role::Carrier)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn user_with_role(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "T".into(),
            email: "t@x.com".into(),
            password_hash: "h".into(),
            role,
            is_verified: true,
            verification_code: None,
            verification_code_expires_at: None,
            reset_code: None,
            reset_code_expires_at: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn admin_passes_every_gate() {
        for required in [Role::Admin, Role::Shipper, Role::Carrier] {
            assert!(gate(user_with_role(Role::Admin), required).is_ok());
        }
    }

    #[test]
    fn exact_role_passes_its_gate_only() {
        assert!(gate(user_with_role(Role::Shipper), Role::Shipper).is_ok());
        assert!(matches!(
            gate(user_with_role(Role::Shipper), Role::Carrier),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            gate(user_with_role(Role::User), Role::Admin),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            gate(user_with_role(Role::Carrier), Role::Admin),
            Err(AppError::Forbidden(_))
        ));
    }
}

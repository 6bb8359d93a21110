use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration as TimeDuration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    accounts::{
        dto::{
            LoginRequest, MessageResponse, PublicUser, ResetPasswordRequest, ResetTokenRequest,
            SignupRequest, UpdateProfileRequest, UserResponse, VerifyAccountRequest,
        },
        extractors::{CurrentUser, RequireAdmin, SESSION_COOKIE},
        jwt::JwtKeys,
        otp,
        password::{hash_password, verify_password},
        repo_types::{Role, User},
        validate::{is_strong_password, is_valid_email, PASSWORD_POLICY_MESSAGE},
    },
    error::AppError,
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/verify-account", post(verify_account))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/resetToken", post(request_password_reset))
        .route("/reset-password/:user_id", put(reset_password))
        .route("/update-user-role/:user_id", put(update_profile))
        .route("/", get(list_users))
        .route("/:user_id", get(get_user))
        .route("/delete/:user_id", delete(delete_user))
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.name.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation("All fields are required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email format".into()));
    }
    if !is_strong_password(&payload.password) {
        warn!("password fails strength policy");
        return Err(AppError::Validation(PASSWORD_POLICY_MESSAGE.into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict(
            "Email already exists, register with another email".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;
    let (code, expires_at) = otp::issue_code();

    // The unique index on LOWER(email) backstops concurrent signups; a
    // duplicate insert comes back as Conflict.
    let user = User::create(
        &state.db,
        payload.name.trim(),
        &payload.email,
        &hash,
        &code,
        expires_at,
    )
    .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");

    // The row is already persisted; a failed send degrades the response
    // without rolling anything back.
    state
        .mailer
        .send_verification(&user.email, &code)
        .await
        .map_err(AppError::Dependency)?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User successfully created. Check your email for the verification token."
                .into(),
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_account(
    State(state): State<AppState>,
    Json(payload): Json<VerifyAccountRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if payload.verification_token.is_empty() {
        return Err(AppError::Validation("Verification token is required".into()));
    }

    let user = User::find_by_verification_code(&state.db, &payload.verification_token)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid verification token".into()))?;

    if otp::is_expired(user.verification_code_expires_at) {
        return Err(AppError::Expired(
            "Verification token has expired. Request a new one".into(),
        ));
    }

    User::mark_verified(&state.db, user.id).await?;
    info!(user_id = %user.id, "account verified");

    Ok(Json(MessageResponse {
        message: "Account verified successfully".into(),
    }))
}

#[instrument(skip(state, payload, jar))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            AppError::NotFound("Email not found".into())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Auth("Invalid password".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(keys.ttl.as_secs() as i64))
        .build();

    info!(user_id = %user.id, "user logged in");
    Ok((
        jar.add(cookie),
        Json(UserResponse {
            message: "Login successful".into(),
            user: PublicUser::from(&user),
        }),
    ))
}

/// Stateless logout: instructs the client to drop the cookie. The token
/// itself stays cryptographically valid until its natural expiry.
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (
        jar,
        Json(MessageResponse {
            message: "Logged out successfully".into(),
        }),
    )
}

#[instrument(skip(state, payload, _actor))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Json(mut payload): Json<ResetTokenRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".into()))?;

    let (code, expires_at) = otp::issue_code();
    User::set_reset_code(&state.db, user.id, &code, expires_at).await?;
    info!(user_id = %user.id, "reset code issued");

    state
        .mailer
        .send_password_reset(&user.email, &code)
        .await
        .map_err(AppError::Dependency)?;

    Ok(Json(MessageResponse {
        message: "Reset password token sent to email".into(),
    }))
}

#[instrument(skip(state, payload, _actor))]
pub async fn reset_password(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if payload.reset_token.is_empty() || payload.new_password.is_empty() {
        return Err(AppError::Validation(
            "User ID, reset token, and new password are required".into(),
        ));
    }

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    // Only the reset column is consulted; a verification code can never
    // satisfy this check.
    if user.reset_code.as_deref() != Some(payload.reset_token.as_str()) {
        warn!(user_id = %user.id, "reset token mismatch");
        return Err(AppError::Auth("Invalid reset token".into()));
    }
    if otp::is_expired(user.reset_code_expires_at) {
        return Err(AppError::Expired(
            "Reset token has expired. Request a new one".into(),
        ));
    }
    if !is_strong_password(&payload.new_password) {
        return Err(AppError::Validation(PASSWORD_POLICY_MESSAGE.into()));
    }

    let hash = hash_password(&payload.new_password)?;
    User::apply_password_reset(&state.db, user.id, &hash).await?;
    info!(user_id = %user.id, "password reset");

    Ok(Json(MessageResponse {
        message: "Password has been reset successfully".into(),
    }))
}

#[instrument(skip(state, payload, actor))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    // The admin gate already authenticated the actor; role changes are
    // additionally restricted to Admins by design.
    let role = match payload.role.as_deref() {
        Some(raw) => {
            if actor.role != Role::Admin {
                return Err(AppError::Forbidden("Only admins can update roles".into()));
            }
            Some(
                raw.parse::<Role>()
                    .map_err(|_| AppError::Validation("Invalid role provided".into()))?,
            )
        }
        None => None,
    };

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let email = match payload.email.as_deref() {
        Some(raw) => {
            let normalized = raw.trim().to_lowercase();
            if !is_valid_email(&normalized) {
                return Err(AppError::Validation("Invalid email format".into()));
            }
            if let Some(existing) = User::find_by_email(&state.db, &normalized).await? {
                if existing.id != user_id {
                    return Err(AppError::Conflict(
                        "Email is already taken by another user".into(),
                    ));
                }
            }
            Some(normalized)
        }
        None => None,
    };

    let user = User::update_profile(&state.db, user_id, name, email.as_deref(), role)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, actor = %actor.id, "profile updated");
    Ok(Json(UserResponse {
        message: "Profile updated successfully".into(),
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, _actor))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_actor): RequireAdmin,
) -> Result<Json<Vec<User>>, AppError> {
    let users = User::list(&state.db).await?;
    Ok(Json(users))
}

#[instrument(skip(state, _actor))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_actor): RequireAdmin,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not Found".into()))?;
    Ok(Json(user))
}

#[instrument(skip(state, _actor))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(_actor): RequireAdmin,
    Path(user_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    if !User::delete(&state.db, user_id).await? {
        return Err(AppError::NotFound("User not Found".into()));
    }
    info!(user_id = %user_id, "user deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_serialization() {
        let response = UserResponse {
            message: "Login successful".into(),
            user: PublicUser {
                id: Uuid::new_v4(),
                name: "A".into(),
                email: "test@example.com".into(),
                role: Role::User,
                is_verified: true,
            },
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("\"isVerified\":true"));
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("password"));
    }

    #[test]
    fn request_bodies_use_camel_case_wire_names() {
        let verify: VerifyAccountRequest =
            serde_json::from_str(r#"{"verificationToken":"123456"}"#).unwrap();
        assert_eq!(verify.verification_token, "123456");

        let reset: ResetPasswordRequest =
            serde_json::from_str(r#"{"resetToken":"654321","newPassword":"Aa1!aa"}"#).unwrap();
        assert_eq!(reset.reset_token, "654321");
        assert_eq!(reset.new_password, "Aa1!aa");
    }

    #[test]
    fn update_profile_accepts_partial_bodies() {
        let update: UpdateProfileRequest = serde_json::from_str(r#"{"role":"Shipper"}"#).unwrap();
        assert_eq!(update.role.as_deref(), Some("Shipper"));
        assert!(update.name.is_none());
        assert!(update.email.is_none());
    }

    #[test]
    fn absent_body_fields_deserialize_to_empty_strings() {
        let signup: SignupRequest = serde_json::from_str(r#"{"email":"a@x.com","name":"A"}"#).unwrap();
        assert!(signup.password.is_empty());

        let verify: VerifyAccountRequest = serde_json::from_str("{}").unwrap();
        assert!(verify.verification_token.is_empty());

        let reset: ResetPasswordRequest = serde_json::from_str(r#"{"resetToken":"123456"}"#).unwrap();
        assert!(reset.new_password.is_empty());
    }

    async fn post_json(uri: &str, body: &'static str) -> axum::http::StatusCode {
        use axum::{body::Body, http::header, http::Request};
        use tower::ServiceExt;

        let app = crate::app::build_app(AppState::fake());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn signup_without_password_is_a_validation_failure() {
        let status = post_json("/api/users/signup", r#"{"email":"a@x.com","name":"A"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_account_without_token_is_a_validation_failure() {
        let status = post_json("/api/users/verify-account", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

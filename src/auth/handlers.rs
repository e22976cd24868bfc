use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Form, Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginForm, MessageResponse, RefreshRequest, RequestEmailBody, SignupRequest,
            TokenResponse, UpdateAvatarRequest, UserResponse,
        },
        extractors::AuthUser,
        password::{hash_password, verify_password},
        repo,
        services::{is_valid_email, JwtKeys},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/confirm/:token", get(confirm_email))
        .route("/auth/request_email", post(request_email))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users/avatar", patch(update_avatar))
}

/// Sign a confirmation token and send the verification mail on a detached
/// task. Delivery failure must never fail the request that triggered it.
fn spawn_confirmation_email(state: &AppState, email: String, username: String) {
    let keys = JwtKeys::from_ref(state);
    let mailer = state.mailer.clone();
    let base_url = state.config.base_url.clone();
    tokio::spawn(async move {
        let token = match keys.sign_confirm(&email) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, email = %email, "failed to sign confirmation token");
                return;
            }
        };
        let confirm_url = format!("{}/api/auth/confirm/{}", base_url, token);
        if let Err(e) = mailer.send_confirmation(&email, &username, &confirm_url).await {
            error!(error = %e, email = %email, "failed to send confirmation email");
        }
    });
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }
    if payload.username.trim().is_empty() {
        return Err(ApiError::Validation("Username must not be empty".into()));
    }

    if repo::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Account already exists".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = repo::create(&state.db, payload.username.trim(), &payload.email, &hash)
        .await
        .map_err(ApiError::from_db)?;

    spawn_confirmation_email(&state, user.email.clone(), user.username.clone());

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = form.username.trim().to_lowercase();

    let user = repo::find_by_email(&state.db, &email).await?.ok_or_else(|| {
        warn!(email = %email, "login unknown email");
        ApiError::Unauthorized("Invalid credentials".into())
    })?;

    // Confirmation gating comes before password verification: a correct
    // password must not turn this into a credentials failure.
    if !user.confirmed {
        warn!(user_id = %user.id, "login before email confirmation");
        return Err(ApiError::Unauthorized("Email not confirmed".into()));
    }

    if !verify_password(&form.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    repo::set_refresh_token(&state.db, user.id, Some(&refresh_token)).await?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse::bearer(access_token, refresh_token)))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".into()))?;

    let user = repo::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".into()))?;

    if user.refresh_token.as_deref() != Some(payload.refresh_token.as_str()) {
        // A token that was already rotated out means the session can no
        // longer be trusted; revoke it entirely.
        warn!(user_id = %user.id, "stale refresh token presented");
        repo::set_refresh_token(&state.db, user.id, None).await?;
        return Err(ApiError::Unauthorized("Invalid refresh token".into()));
    }

    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    repo::set_refresh_token(&state.db, user.id, Some(&refresh_token)).await?;

    info!(user_id = %user.id, "token pair rotated");
    Ok(Json(TokenResponse::bearer(access_token, refresh_token)))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, ApiError> {
    repo::set_refresh_token(&state.db, user_id, None).await?;
    info!(user_id = %user_id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, token))]
pub async fn confirm_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let email = keys
        .verify_confirm(&token)
        .map_err(|_| ApiError::Validation("Invalid token for email verification".into()))?;

    let user = repo::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::Validation("Verification error".into()))?;

    if user.confirmed {
        return Ok(Json(MessageResponse::new("Your email is already confirmed")));
    }

    repo::confirm_email(&state.db, &email).await?;
    info!(user_id = %user.id, "email confirmed");
    Ok(Json(MessageResponse::new("Email confirmed")))
}

#[instrument(skip(state, payload))]
pub async fn request_email(
    State(state): State<AppState>,
    Json(payload): Json<RequestEmailBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    if let Some(user) = repo::find_by_email(&state.db, &email).await? {
        if user.confirmed {
            return Ok(Json(MessageResponse::new("Your email is already confirmed")));
        }
        spawn_confirmation_email(&state, user.email.clone(), user.username.clone());
    }

    // Identical response whether or not the account exists.
    Ok(Json(MessageResponse::new(
        "Check your email for a confirmation link",
    )))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateAvatarRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    let updated = repo::set_avatar_url(&state.db, &user.email, payload.avatar.as_deref()).await?;
    info!(user_id = %user_id, "avatar updated");
    Ok(Json(UserResponse::from(updated)))
}

#[cfg(test)]
mod dto_tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user() -> crate::auth::repo_types::User {
        crate::auth::repo_types::User {
            id: uuid::Uuid::new_v4(),
            username: "agent007".into(),
            email: "agent007@gmail.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            refresh_token: Some("refresh-token".into()),
            avatar: Some("https://www.gravatar.com/avatar/abc".into()),
            confirmed: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn user_response_never_exposes_credentials() {
        let json = serde_json::to_string(&UserResponse::from(sample_user())).unwrap();
        assert!(json.contains("agent007@gmail.com"));
        assert!(json.contains("avatar"));
        assert!(!json.contains("password"));
        assert!(!json.contains("refresh_token"));
    }

    #[test]
    fn user_row_serialization_skips_secret_fields() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("refresh_token"));
    }

    #[test]
    fn token_response_is_a_bearer_pair() {
        let json = serde_json::to_string(&TokenResponse::bearer(
            "access".into(),
            "refresh".into(),
        ))
        .unwrap();
        assert!(json.contains("\"access_token\":\"access\""));
        assert!(json.contains("\"refresh_token\":\"refresh\""));
        assert!(json.contains("\"token_type\":\"bearer\""));
    }
}

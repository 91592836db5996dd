//! Authentication routes
//!
//! Registration, login, token verification and profile management.

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::services::{ProfileForm, ProfileService, UserService};
use crate::state::AppState;
use crate::uploads::StoredAvatar;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use taskboard_shared::{AuthResponse, LoginRequest, PublicUser, RegisterRequest, VerifyResponse};
use tracing::debug;
use uuid::Uuid;

const AVATAR_FIELD: &str = "profileImage";

/// Create auth routes
pub fn auth_routes(max_request_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", get(verify))
        .route("/me", get(get_me))
        .route("/user/:id", get(get_user))
        .route(
            "/profile",
            put(update_profile).layer(DefaultBodyLimit::max(max_request_bytes)),
        )
}

/// `/users` routes; the profile update is also reachable here
pub fn users_routes(max_request_bytes: usize) -> Router<AppState> {
    Router::new().route(
        "/profile",
        put(update_profile).layer(DefaultBodyLimit::max(max_request_bytes)),
    )
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let response = UserService::register(&state.db, state.jwt(), req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = UserService::login(&state.db, state.jwt(), req).await?;
    Ok(Json(response))
}

/// GET /api/auth/verify
///
/// Returns the authoritative public identity behind the bearer token.
async fn verify(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<VerifyResponse>> {
    let user = UserService::get_public(&state.db, auth_user.user_id)
        .await?
        .ok_or(ApiError::UnknownSubject)?;
    Ok(Json(VerifyResponse { user }))
}

/// GET /api/auth/me
async fn get_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = ProfileService::get_profile(&state.db, auth_user.user_id).await?;
    Ok(Json(user))
}

/// GET /api/auth/user/:id
async fn get_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicUser>> {
    let user_id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest("Invalid user id".to_string()))?;
    let user = UserService::get_public(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

/// PUT /api/auth/profile
///
/// Multipart form with optional `name`, `username`, `bio`, `location` and a
/// `profileImage` file.
async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<PublicUser>> {
    let mut form = ProfileForm::default();
    let mut avatar: Option<StoredAvatar> = None;

    if let Err(err) =
        read_profile_form(&state, auth_user.user_id, &mut multipart, &mut form, &mut avatar).await
    {
        if let Some(stored) = &avatar {
            state.avatars().discard(stored).await;
        }
        return Err(err);
    }

    let user = ProfileService::update_profile(
        &state.db,
        state.avatars(),
        auth_user.user_id,
        form,
        avatar,
    )
    .await?;
    Ok(Json(user))
}

async fn read_profile_form(
    state: &AppState,
    user_id: Uuid,
    multipart: &mut Multipart,
    form: &mut ProfileForm,
    avatar: &mut Option<StoredAvatar>,
) -> Result<(), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid form data: {}", e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == AVATAR_FIELD {
            // Browsers send an empty part when no file was chosen
            if field.file_name().map_or(true, str::is_empty) {
                continue;
            }
            let content_type = field.content_type().map(str::to_string);
            let stored = state
                .avatars()
                .store(user_id, content_type.as_deref(), field)
                .await?;
            if let Some(replaced) = avatar.replace(stored) {
                state.avatars().discard(&replaced).await;
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid form data: {}", e.body_text())))?;
        match name.as_str() {
            "name" => form.name = Some(value),
            "username" => form.username = Some(value),
            "bio" => form.bio = Some(value),
            "location" => form.location = Some(value),
            other => debug!(field = other, "Ignoring unknown profile field"),
        }
    }
    Ok(())
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::error::AccountError;
use crate::state::AppState;

use super::dto::{
    ChangePasswordRequest, LoginRequest, LoginResponse, PublicUser, RegisterRequest,
    RegisterResponse, UpdateUserRequest,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route("/users/me/password", put(change_password))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AccountError> {
    let user = state
        .accounts
        .register(&payload.username, &payload.email, &payload.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            email: user.email,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AccountError> {
    let session = state
        .accounts
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(LoginResponse {
        token: session.token,
        subject_id: session.user.id,
        username: session.user.username,
    }))
}

/// Tokens are stateless, so logout is an acknowledgement only.
async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[instrument(skip(state))]
async fn get_me(
    State(state): State<AppState>,
    AuthUser(subject): AuthUser,
) -> Result<Json<PublicUser>, AccountError> {
    let user = state.accounts.user_by_id(subject).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
async fn list_users(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
) -> Result<Json<Vec<PublicUser>>, AccountError> {
    let users = state.accounts.list_users().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
async fn get_user(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, AccountError> {
    let user = state.accounts.user_by_id(id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
async fn update_user(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AccountError> {
    let user = state
        .accounts
        .update_profile(id, payload.username, payload.email)
        .await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
async fn delete_user(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AccountError> {
    state.accounts.delete_account(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
async fn change_password(
    State(state): State<AppState>,
    AuthUser(subject): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AccountError> {
    state
        .accounts
        .change_password(subject, &payload.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{extract::State, Json};

use crate::{
    error::AppError,
    middleware::CurrentSession,
    models::{CreateUser, LoginRequest, Token, User},
    session::SessionProvider,
};

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = CreateUser,
    responses(
        (status = 200, description = "Account created", body = User),
        (status = 400, description = "Invalid email, weak password or email already registered")
    ),
    tag = "auth"
)]
pub async fn sign_up(
    State(sessions): State<SessionProvider>,
    Json(payload): Json<CreateUser>,
) -> Result<Json<User>, AppError> {
    sessions.sign_up(payload).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = Token),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn sign_in(
    State(sessions): State<SessionProvider>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Token>, AppError> {
    let (_, token) = sessions.sign_in(payload).await?;
    Ok(Json(token))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session revoked"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "auth"
)]
pub async fn sign_out(
    State(sessions): State<SessionProvider>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<serde_json::Value>, AppError> {
    sessions.sign_out(&session).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

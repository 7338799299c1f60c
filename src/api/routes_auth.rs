use super::*;

use crate::auth::{ProfileUpdate, PublicUser, RegisterRequest};

fn session_cookie(token: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    )
}

pub(super) async fn health() -> Json<ApiResponse<HealthInfo>> {
    Json(ApiResponse::success(HealthInfo {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Hashing is CPU bound, so registration runs off the async workers.
pub(super) async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>), ApiError> {
    let auth = state.auth.clone();
    let user = tokio::task::spawn_blocking(move || auth.register(&req)).await??;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PublicUser::from(&user))),
    ))
}

pub(super) async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.auth.clone();
    let (user, session) =
        tokio::task::spawn_blocking(move || auth.login(&req.username, &req.password)).await??;
    let cookie = session_cookie(&session.token, state.session_ttl_secs);
    let body = LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: PublicUser::from(&user),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(ApiResponse::success(body))))
}

pub(super) async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = guard::token_from_headers(&headers) {
        state.auth.logout(&token)?;
    }
    Ok((
        [(header::SET_COOKIE, session_cookie("", 0))],
        Json(ApiResponse::ok("logged out")),
    ))
}

pub(super) async fn session_info(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> ApiResult<SessionInfo> {
    let user = state.auth.user(&session.username)?;
    Ok(Json(ApiResponse::success(SessionInfo {
        user: PublicUser::from(&user),
        expires_at: session.expires_at,
    })))
}

pub(super) async fn get_me(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> ApiResult<PublicUser> {
    let user = state.auth.user(&session.username)?;
    Ok(Json(ApiResponse::success(PublicUser::from(&user))))
}

pub(super) async fn update_me(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<PublicUser> {
    let user = state.auth.update_profile(&session.username, &update)?;
    Ok(Json(ApiResponse::success(PublicUser::from(&user))))
}

pub(super) async fn change_password(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    ApiJson(req): ApiJson<PasswordChange>,
) -> ApiResult<()> {
    let auth = state.auth.clone();
    tokio::task::spawn_blocking(move || {
        auth.change_password(
            &session.username,
            &req.current_password,
            &req.new_password,
            Some(&session.token),
        )
    })
    .await??;
    Ok(Json(ApiResponse::ok("password changed")))
}

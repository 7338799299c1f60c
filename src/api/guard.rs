use super::*;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::content::SessionRecord;
use crate::validation::validate_player_id;

pub const SESSION_COOKIE: &str = "codyssey_session";

/// Session token from `Authorization: Bearer` or the session cookie.
pub(super) fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolves the request's session, if any, into a request extension.
/// Bad or expired tokens are treated as anonymous; routes that need a
/// session reject the request themselves.
pub(super) async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = token_from_headers(req.headers()) {
        match state.auth.session(&token) {
            Ok(session) => {
                req.extensions_mut().insert(session);
            }
            Err(AuthError::SessionNotFound) | Err(AuthError::SessionExpired) => {}
            Err(e) => warn!("Session lookup failed: {}", e),
        }
    }
    next.run(req).await
}

/// A request made with a live session.
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionRecord);

impl<S: Send + Sync> FromRequestParts<S> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionRecord>()
            .cloned()
            .map(AuthSession)
            .ok_or_else(|| ApiError::Unauthorized("login required".to_string()))
    }
}

impl AuthSession {
    /// Players may only touch their own inventory and progress; admins may touch any.
    pub fn ensure_player(&self, player_id: &str) -> Result<(), ApiError> {
        validate_player_id(player_id)?;
        if self.0.user_id == player_id || self.0.is_admin() {
            Ok(())
        } else {
            warn!(
                target: "security",
                "{} denied access to player {}",
                escape_log(&self.0.username),
                escape_log(player_id)
            );
            Err(ApiError::Forbidden("not your player".to_string()))
        }
    }
}

/// A request made with an admin session.
#[derive(Debug, Clone)]
pub struct AdminSession(pub SessionRecord);

impl<S: Send + Sync> FromRequestParts<S> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthSession(session) = AuthSession::from_request_parts(parts, state).await?;
        if !session.is_admin() {
            warn!(target: "security", "Admin route refused for {}", escape_log(&session.username));
            return Err(ApiError::Forbidden("admin only".to_string()));
        }
        Ok(AdminSession(session))
    }
}

use super::*;

use crate::auth::PublicUser;
use crate::content::{PlayerProgressRecord, ProgressStatus};
use crate::validation::ProfileError;

/// Response envelope used by every route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiResponse::err(self.message()))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(format!("not found: {}", what)),
            StoreError::InvalidRecord(msg) => ApiError::BadRequest(msg),
            e @ StoreError::InsufficientItems { .. } => ApiError::Conflict(e.to_string()),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            other => {
                error!("Store failure: {}", other);
                ApiError::Internal("internal storage error".to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::SessionNotFound | AuthError::SessionExpired => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::UsernameTaken(_) => ApiError::Conflict(err.to_string()),
            AuthError::InvalidUsername(_) | AuthError::InvalidProfile(_) => {
                ApiError::BadRequest(err.to_string())
            }
            AuthError::Store(store) => store.into(),
            AuthError::Hash(msg) => {
                error!("Password hashing failure: {}", msg);
                ApiError::Internal("internal error".to_string())
            }
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("Blocking task failed: {}", err);
        ApiError::Internal("internal error".to_string())
    }
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PlayerQuery {
    pub player_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AmountQuery {
    pub player_id: String,
    pub item_id: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AmountResponse {
    pub player_id: String,
    pub item_id: u32,
    pub amount: i64,
}

/// Signed inventory delta.
#[derive(Debug, Serialize, Deserialize)]
pub struct InventoryDelta {
    pub player_id: String,
    pub item_id: u32,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplyPackageRequest {
    pub player_id: String,
    pub package_id: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub player_id: String,
    pub subquest_id: u32,
    pub status: ProgressStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdvanceRequest {
    pub player_id: String,
    pub completed_subquest_id: u32,
    /// Optional expectation; the server rejects it if it disagrees with the content.
    #[serde(default)]
    pub next_subquest_id: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdvanceResponse {
    pub completed_subquest_id: u32,
    pub active_subquest_id: Option<u32>,
    pub progress: Vec<PlayerProgressRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub user: PublicUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user: PublicUser,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthInfo {
    pub status: String,
    pub version: String,
}

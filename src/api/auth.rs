use axum::{
    Json,
    extract::{FromRequestParts, Query, State},
    http::{HeaderMap, StatusCode, header::HOST, request::Parts},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::{Expiry, Session};

use super::validation::validate_redirect;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::db::StoreError;
use crate::services::{Identity, SignupRequest};

/// Session key holding the logged-in username
pub const USER_KEY: &str = "user";

/// "Remember me" sessions outlive the inactivity window by this much
const REMEMBER_DAYS: i64 = 30;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub security_question: String,
    pub security_answer: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Serialize)]
pub struct IdentityResponse {
    pub username: String,
    pub is_authenticated: bool,
    pub is_anonymous: bool,
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct SecurityQuestionQuery {
    pub username: String,
}

#[derive(Serialize)]
pub struct SecurityQuestionResponse {
    pub question: String,
}

// ============================================================================
// Identity extraction
// ============================================================================

/// Builds the request's [`Identity`] from the session cookie.
///
/// The session id serves as the credential: a stored username only counts as
/// authenticated while it is attached to a live session.
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::internal(msg))?;

        let store = state.store().clone();

        let Some(username) = session
            .get::<String>(USER_KEY)
            .await
            .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        else {
            return Ok(Self::anonymous(store));
        };

        let credential = session.id().map(|id| id.to_string()).unwrap_or_default();

        match Self::load(store.clone(), username, &credential).await {
            Ok(identity) => Ok(identity),
            Err(StoreError::UserNotFound(name)) => {
                tracing::warn!("Session refers to missing user {name}, clearing it");
                let _ = session.flush().await;
                Ok(Self::anonymous(store))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Reject anything but a logged-in, active user.
pub fn require_member(identity: &Identity) -> Result<(), ApiError> {
    if identity.is_anonymous() || !identity.is_authenticated() {
        return Err(ApiError::Unauthorized("Not authenticated".to_string()));
    }

    if !identity.is_active() {
        return Err(ApiError::Forbidden(
            "This account has been deactivated".to_string(),
        ));
    }

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/signup
/// Create an account and log it in
pub async fn signup(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(form): Json<SignupForm>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let remember = form.remember;
    let result = state
        .auth()
        .signup(SignupRequest {
            username: form.username,
            password: form.password,
            password_confirm: form.password_confirm,
            security_question: form.security_question,
            security_answer: form.security_answer,
        })
        .await?;

    start_session(&session, &result.username, remember).await?;
    tracing::info!("Account created: {}", result.username);

    Ok(Json(ApiResponse::success(LoginResponse {
        username: result.username,
        redirect: None,
    })))
}

/// POST /auth/login
/// Authenticate with username and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let redirect = validate_redirect(payload.next.as_deref(), host)?;

    let result = state
        .auth()
        .login(&payload.username, &payload.password)
        .await?;

    start_session(&session, &result.username, payload.remember).await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        username: result.username,
        redirect,
    })))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/me
/// Describe the identity attached to this request
pub async fn current_identity(identity: Identity) -> Json<ApiResponse<IdentityResponse>> {
    Json(ApiResponse::success(IdentityResponse {
        username: identity.username().to_string(),
        is_authenticated: identity.is_authenticated(),
        is_anonymous: identity.is_anonymous(),
        is_active: identity.is_active(),
    }))
}

/// GET /auth/security-question?username=
pub async fn security_question(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SecurityQuestionQuery>,
) -> Result<Json<ApiResponse<SecurityQuestionResponse>>, ApiError> {
    let question = state.auth().security_question(&query.username).await?;
    Ok(Json(ApiResponse::success(SecurityQuestionResponse {
        question,
    })))
}

/// POST /session/timezone
/// Remember the browser's timezone for rendering log times
pub async fn set_timezone(
    session: Session,
    Json(payload): Json<super::TimezoneRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let tz = super::validation::validate_timezone(&payload.timezone)?;

    session
        .insert(super::logbook::TIMEZONE_KEY, tz.name())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store timezone: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Timezone set to {}", tz.name()),
    })))
}

// ============================================================================
// Helpers
// ============================================================================

async fn start_session(session: &Session, username: &str, remember: bool) -> Result<(), ApiError> {
    // New id on every login so a pre-login cookie cannot be reused
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    session
        .insert(USER_KEY, username)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    if remember {
        session.set_expiry(Some(Expiry::OnInactivity(time::Duration::days(
            REMEMBER_DAYS,
        ))));
    }

    Ok(())
}

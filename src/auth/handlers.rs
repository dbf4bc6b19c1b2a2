use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{ErrorBody, LoginRequest, PublicUser, RegisterRequest, RegisterResponse},
        error::AuthError,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::DuplicateCredential => (StatusCode::CONFLICT, self.to_string()),
            AuthError::InvalidCredential => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password".into())
            }
            AuthError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AuthError::StoreUnavailable(e) => {
                error!(error = %e, "user store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable".into())
            }
            AuthError::Hashing(e) => {
                error!(error = %e, "password hashing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Self-service registration; admin accounts only come from bootstrap.
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    let id = state
        .auth
        .register(&payload.username, &payload.email, &payload.password, false)
        .await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { id })))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state
        .auth
        .authenticate(&payload.username, &payload.password)
        .await?;
    Ok(Json(PublicUser::from(user)))
}

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{ApiResponse, CredentialsRequest, PublicUser},
        extractors::AuthUser,
    },
    error::AccountError,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/new", post(register))
        .route("/user/authenticate", post(authenticate))
        .route("/user/me", get(me))
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, Response>;

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = match &self {
            AccountError::InvalidEmail | AccountError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AccountError::InvalidCredentials | AccountError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AccountError::NotFound => StatusCode::NOT_FOUND,
            AccountError::Hashing(_)
            | AccountError::TokenSigning(_)
            | AccountError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if self.is_internal() {
            error!(error = ?self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ApiResponse::failure(message))).into_response()
    }
}

fn malformed(rejection: JsonRejection) -> Response {
    warn!(error = %rejection, "malformed json body");
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::failure("bad request: malformed json data")),
    )
        .into_response()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<PublicUser> {
    let Json(req) = payload.map_err(malformed)?;
    let session = state
        .accounts
        .register(&req.email, &req.password)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Json(ApiResponse::success(session.into())))
}

#[instrument(skip(state, payload))]
pub async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<PublicUser> {
    let Json(req) = payload.map_err(malformed)?;
    let session = state
        .accounts
        .authenticate(&req.email, &req.password)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Json(ApiResponse::success(session.into())))
}

#[instrument(skip(state, identity))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> ApiResult<PublicUser> {
    let user = state
        .accounts
        .find_by_id(identity.user_id)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Json(ApiResponse::success(user.into())))
}

use std::sync::MutexGuard;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::{Database, StoreError};
use crate::identity;
use crate::models::SkillCategory;
use crate::state::AppState;

/// Shares counted per (session, slug) before further POSTs are rejected.
/// The budget is aggregated across share types; per-type budgets would let
/// a client multiply it by inventing type names.
pub const MAX_SHARES_PER_SESSION: i64 = 5;

/// Success envelope: `{ "data": T }`. A unit payload serializes to
/// `{ "data": null }`, matching the creation responses.
#[derive(Serialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
pub struct ShareTotal {
    pub total: i64,
}

/// Every failure a handler can produce. The `IntoResponse` impl below is
/// the single place that maps failures to status codes and the
/// `{ "message": … }` envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthenticated")]
    Unauthenticated,
    #[error("Conflict")]
    Conflict,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEndorsement => ApiError::Conflict,
            e @ StoreError::UnknownSkill(_) => ApiError::Validation(e.to_string()),
            StoreError::Db(e) => {
                tracing::error!("storage failure: {e}");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { message: self.to_string() })).into_response()
    }
}

fn lock_store(state: &AppState) -> Result<MutexGuard<'_, Database>, ApiError> {
    state
        .store
        .lock()
        .map_err(|_| ApiError::Internal("store lock poisoned".to_string()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndorseBody {
    pub skill_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ShareBody {
    #[serde(rename = "type")]
    pub share_type: Option<String>,
}

/// GET /api/endorsements
pub async fn list_endorsements(
    State(state): State<AppState>,
) -> Result<Json<Data<Vec<SkillCategory>>>, ApiError> {
    let store = lock_store(&state)?;
    let categories = store.list_endorsements_by_category()?;
    Ok(Json(Data { data: categories }))
}

/// POST /api/endorsements
///
/// Check and insert run under one store lock, so in-process requests are
/// serialized; across processes the UNIQUE constraint still turns the
/// losing insert into the same 409.
pub async fn endorse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<EndorseBody>,
) -> Result<Response, ApiError> {
    let user_id = state
        .auth
        .resolve(&headers)
        .ok_or(ApiError::Unauthenticated)?;
    let skill_id = body
        .skill_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("missing skillId".to_string()))?;

    let store = lock_store(&state)?;
    if !store.skill_exists(&skill_id)? {
        return Err(ApiError::Validation(format!("unknown skill: {skill_id}")));
    }
    if store.count_endorsement(&skill_id, &user_id)? {
        return Err(ApiError::Conflict);
    }
    store.create_endorsement(&skill_id, &user_id)?;
    tracing::info!(skill = %skill_id, "endorsement recorded");

    Ok((StatusCode::CREATED, Json(Data { data: () })).into_response())
}

/// GET /api/shares/:slug
pub async fn share_total(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Data<ShareTotal>>, ApiError> {
    let store = lock_store(&state)?;
    let total = store.count_shares_by_slug(&slug)?;
    Ok(Json(Data {
        data: ShareTotal { total },
    }))
}

/// POST /api/shares/:slug
///
/// A freshly minted session gets its cookie on the response whatever the
/// outcome, so the client's next attempt lands in the same session.
pub async fn record_share(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ShareBody>,
) -> Response {
    let (session_id, minted) = identity::resolve_session(&headers);

    let mut response = match try_record_share(&state, &slug, &session_id, body) {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };

    if minted {
        if let Some(cookie) = identity::session_cookie(&session_id) {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
    }
    response
}

fn try_record_share(
    state: &AppState,
    slug: &str,
    session_id: &str,
    body: ShareBody,
) -> Result<Response, ApiError> {
    let share_type = body
        .share_type
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("missing type".to_string()))?;

    let store = lock_store(state)?;
    let current = store.count_user_shares(slug, session_id)?;
    if current >= MAX_SHARES_PER_SESSION {
        return Err(ApiError::Conflict);
    }
    store.add_share(slug, session_id, &share_type)?;
    tracing::info!(slug, share_type = %share_type, "share recorded");

    Ok((StatusCode::CREATED, Json(Data { data: () })).into_response())
}

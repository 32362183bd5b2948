//! HTTP surface: `POST /route-planner` and `GET /health`.
//!
//! The planner is synchronous (blocking directions lookups on a rayon pool),
//! so each request runs it on the blocking thread pool. A request whose
//! client goes away drops the handler future, which cancels the plan at the
//! next stage boundary.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::api::{ErrorBody, RoutePlanRequest, RoutePlanResponse, SuccessBody};
use crate::error::{PlanError, ValidationError};
use crate::planner::Planner;
use crate::traits::{DirectionsProvider, StationCatalog};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    MalformedBody(String),
    #[error("{0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::Validation(err) => ApiError::Validation(err),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, ErrorBody::new(err.to_string(), Some(err.field()))),
            ApiError::MalformedBody(message) => (StatusCode::BAD_REQUEST, ErrorBody::new(message, None)),
            ApiError::Internal(message) => {
                error!(error = %message, "route planning failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new("Internal server error", None))
            }
        };
        (status, Json(body)).into_response()
    }
}

pub fn router<D, C>(planner: Arc<Planner<D, C>>) -> Router
where
    D: DirectionsProvider + 'static,
    C: StationCatalog + 'static,
{
    Router::new()
        .route("/route-planner", post(plan_route::<D, C>))
        .route("/health", get(health::<D, C>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(planner)
}

async fn plan_route<D, C>(
    State(planner): State<Arc<Planner<D, C>>>,
    payload: Result<Json<RoutePlanRequest>, JsonRejection>,
) -> Result<Json<SuccessBody<RoutePlanResponse>>, ApiError>
where
    D: DirectionsProvider + 'static,
    C: StationCatalog + 'static,
{
    let Json(request) = payload?;
    let trip = request.into_trip_request(Utc::now())?;

    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let result = tokio::task::spawn_blocking(move || planner.plan(&trip, &cancel))
        .await
        .map_err(|err| ApiError::Internal(format!("planner task failed: {}", err)))??;
    guard.disarm();

    Ok(Json(SuccessBody::new(RoutePlanResponse::from(&result))))
}

async fn health<D, C>(State(planner): State<Arc<Planner<D, C>>>) -> impl IntoResponse
where
    D: DirectionsProvider + 'static,
    C: StationCatalog + 'static,
{
    Json(serde_json::json!({
        "status": "ok",
        "stations": planner.catalog().stations().len(),
    }))
}

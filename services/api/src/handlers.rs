//! Axum Handlers for the Request API
//!
//! Each endpoint performs one step of the support cycle or of the class
//! review. Endpoints keep no turn context: callers send the conversation
//! slice they want judged. They do share the supporter's and summarizer's
//! private histories, so the documented order matters:
//! `checksupport → extensions` and `rate → mainpoints → improvements`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    models::{
        ErrorResponse, ExtensionsResponse, HelpPayload, HelpResponse, ImprovementsPayload,
        ImprovementsResponse, MainPointsResponse, QueriesPayload, RateResponse, SupportResponse,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Ask the supporter whether the teacher's answer needs support.
///
/// Starts a fresh support cycle: the supporter's history is cleared first.
#[utoipa::path(
    post,
    path = "/checksupport",
    request_body = QueriesPayload,
    responses(
        (status = 200, description = "Classification result", body = SupportResponse),
        (status = 400, description = "Malformed query entry", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn check_support(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueriesPayload>,
) -> Result<Json<SupportResponse>, ApiError> {
    let messages = payload.to_messages().map_err(ApiError::BadRequest)?;
    state.supporter.clear_history().await;
    let support = state.supporter.classify_needs_support(&messages).await?;
    info!(support, "Support classified");
    Ok(Json(SupportResponse { support }))
}

/// Ask the supporter for extensions. Only meaningful after `/checksupport`.
#[utoipa::path(
    post,
    path = "/extensions",
    responses(
        (status = 200, description = "Suggested extensions", body = ExtensionsResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn generate_extensions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExtensionsResponse>, ApiError> {
    let extensions = state.supporter.propose_extension(&[]).await?;
    Ok(Json(ExtensionsResponse { extensions }))
}

/// Rate the class. Starts a fresh review: the summarizer's history is cleared first.
#[utoipa::path(
    post,
    path = "/rate",
    request_body = QueriesPayload,
    responses(
        (status = 200, description = "Score and reason", body = RateResponse),
        (status = 400, description = "Malformed query entry", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn rate_class(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueriesPayload>,
) -> Result<Json<RateResponse>, ApiError> {
    let messages = payload.to_messages().map_err(ApiError::BadRequest)?;
    state.summarizer.clear_history().await;
    let rate = state.summarizer.rate(messages).await?;
    Ok(Json(RateResponse { rate }))
}

/// Extract the main points of the class. Only meaningful after `/rate`.
#[utoipa::path(
    post,
    path = "/mainpoints",
    responses(
        (status = 200, description = "Main points", body = MainPointsResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn generate_points(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MainPointsResponse>, ApiError> {
    let main_points = state.summarizer.extract_main_points(vec![]).await?;
    Ok(Json(MainPointsResponse { main_points }))
}

/// Recommend improvements based on the given main points. Only meaningful after `/mainpoints`.
#[utoipa::path(
    post,
    path = "/improvements",
    request_body = ImprovementsPayload,
    responses(
        (status = 200, description = "Recommendations", body = ImprovementsResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn generate_improvements(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ImprovementsPayload>,
) -> Result<Json<ImprovementsResponse>, ApiError> {
    let improvements = state
        .summarizer
        .recommend_improvements(vec![], &payload.mainpoints)
        .await?;
    Ok(Json(ImprovementsResponse { improvements }))
}

/// Find a short reading tailored to one student.
#[utoipa::path(
    post,
    path = "/help",
    request_body = HelpPayload,
    responses(
        (status = 200, description = "Personalized help, or null when there is none", body = HelpResponse),
        (status = 400, description = "Malformed query entry", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn generate_help(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<HelpPayload>,
) -> Result<Json<HelpResponse>, ApiError> {
    let context = QueriesPayload {
        queries: payload.queries,
    }
    .to_messages()
    .map_err(ApiError::BadRequest)?;
    let help = state
        .tutor
        .generate_help(&payload.name, &payload.background, &context)
        .await?;
    Ok(Json(HelpResponse { help }))
}

//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the request endpoints, the lecture socket, and OpenAPI
//! documentation.

use crate::{
    handlers,
    models::{
        ErrorResponse, ExtensionsResponse, HelpPayload, HelpResponse, ImprovementsPayload,
        ImprovementsResponse, MainPointsResponse, QueriesPayload, RateResponse, SupportResponse,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::check_support,
        handlers::generate_extensions,
        handlers::rate_class,
        handlers::generate_points,
        handlers::generate_improvements,
        handlers::generate_help,
    ),
    components(
        schemas(
            QueriesPayload, ImprovementsPayload, HelpPayload, SupportResponse,
            ExtensionsResponse, RateResponse, MainPointsResponse, ImprovementsResponse,
            HelpResponse, ErrorResponse
        )
    ),
    tags(
        (name = "Classroom API", description = "Support cycle and class review for a simulated classroom")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/checksupport", post(handlers::check_support))
        .route("/extensions", post(handlers::generate_extensions))
        .route("/rate", post(handlers::rate_class))
        .route("/mainpoints", post(handlers::generate_points))
        .route("/improvements", post(handlers::generate_improvements))
        .route("/help", post(handlers::generate_help))
        .route("/simulate/{topic}", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

//! HTTP surface for the testimonial dashboard.
//!
//! ```text
//! GET    /healthz
//! GET    /public/testimony/{user_id}
//! POST   /testimony
//! PATCH  /testimony/{id}
//! DELETE /testimony/{id}
//! ```
//!
//! Mutations resolve the principal from the session and scope the store call
//! to it; a request without a live session is rejected with 401.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::require_principal;
use crate::error::ServiceError;
use crate::services::testimonials as service;
use crate::state::AppState;
use crate::types::{NewTestimonial, Testimonial, TestimonialPatch};
use crate::util::parse_record_id;

/// Build the router with all routes, tracing and (when configured) CORS.
pub fn router(state: AppState) -> Router {
    let cors = state.config.allowed_origin.as_deref().and_then(cors_layer);

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/public/testimony/{user_id}", get(list_testimony))
        .route("/testimony", post(create_testimony))
        .route(
            "/testimony/{id}",
            patch(update_testimony).delete(delete_testimony),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Credentialed CORS for the dashboard origin. Credentials rule out a
/// wildcard, so the origin must be exact.
fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(e) => {
            log::warn!("Ignoring invalid allowedOrigin {:?}: {}", origin, e);
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, ServiceError> {
    state.with_db(|db| Ok(db.ping()?)).await?;
    Ok(Json(HealthResponse { status: "ok" }))
}

async fn list_testimony(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Testimonial>>, ServiceError> {
    let testimonials = state
        .with_db(move |db| service::list_testimonials(db, &user_id))
        .await?;
    Ok(Json(testimonials))
}

async fn create_testimony(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewTestimonial>, JsonRejection>,
) -> Result<(StatusCode, Json<Testimonial>), ServiceError> {
    let Json(new) = body.map_err(|e| ServiceError::BadRequest(e.body_text()))?;
    let cookie = state.config.session_cookie.clone();

    let created = state
        .with_db(move |db| {
            let principal = require_principal(db, &headers, &cookie)?;
            service::create_testimonial(db, &principal, new)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_testimony(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: Result<Json<TestimonialPatch>, JsonRejection>,
) -> Result<Json<Testimonial>, ServiceError> {
    let id = parse_record_id(&raw_id).map_err(ServiceError::BadRequest)?;
    let Json(patch) = body.map_err(|e| ServiceError::BadRequest(e.body_text()))?;
    let cookie = state.config.session_cookie.clone();

    let updated = state
        .with_db(move |db| {
            let principal = require_principal(db, &headers, &cookie)?;
            service::update_testimonial(db, &principal, id, patch)
        })
        .await?;
    Ok(Json(updated))
}

async fn delete_testimony(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let id = parse_record_id(&raw_id).map_err(ServiceError::BadRequest)?;
    let cookie = state.config.session_cookie.clone();

    state
        .with_db(move |db| {
            let principal = require_principal(db, &headers, &cookie)?;
            service::delete_testimonial(db, &principal, id)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

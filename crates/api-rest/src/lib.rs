//! REST API for the AllergoProba order lifecycle.
//!
//! ## Purpose
//! Exposes the [`OrderService`] operations over HTTP with OpenAPI/Swagger documentation.
//!
//! ## Intended use
//! The workspace's `allergo-run` binary builds an [`AppState`] from its startup configuration
//! and serves [`router`]. Tests drive the same router in-process.
//!
//! Status codes: unknown order → 404, malformed input → 400, rejected status transition → 409,
//! anything else → 500. Error bodies are short fixed strings; details go to the log.

pub mod dto;

use allergo_core::{OrderError, OrderService};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use dto::{CreateOrderReq, HealthRes, OrderRes, PatientRes, UploadResultsReq};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server
///
/// Contains shared state that needs to be accessible to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub order_service: OrderService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_order,
        get_order,
        list_patient_orders,
        patient_referral,
        patient_results,
        mark_blood_taken,
        upload_results,
    ),
    components(schemas(
        HealthRes,
        CreateOrderReq,
        dto::PatientReq,
        UploadResultsReq,
        OrderRes,
        PatientRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full application router, Swagger UI included.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/orders", post(create_order))
        .route("/orders/:code", get(get_order))
        .route("/patients/:iin/orders", get(list_patient_orders))
        .route("/patient/:code/referral", get(patient_referral))
        .route("/patient/:code/results", get(patient_results))
        .route("/lab/:code/blood-taken", post(mark_blood_taken))
        .route("/lab/:code/results", post(upload_results))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, &'static str);

/// Maps a core error onto a status code and a fixed body, logging the detail.
fn api_error(context: &'static str, e: OrderError) -> ApiError {
    match e {
        OrderError::NotFound(_) => {
            tracing::debug!("{context}: {e}");
            (StatusCode::NOT_FOUND, "Order not found")
        }
        OrderError::Validation(_) => {
            tracing::warn!("{context}: {e}");
            (StatusCode::BAD_REQUEST, "Invalid request")
        }
        OrderError::InvalidTransition { .. } => {
            tracing::warn!("{context}: {e}");
            (StatusCode::CONFLICT, "Invalid status transition")
        }
        other => {
            tracing::error!("{context}: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "AllergoProba REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderReq,
    responses(
        (status = 200, description = "Order created and patient notified", body = OrderRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Create a new allergy-panel order
///
/// Assigns a fresh 5-digit code, builds the referral deep link and QR image, stores the order
/// as `sent_to_telegram` and sends the patient a "new order" message when a chat is known.
///
/// # Errors
/// Returns `400 Bad Request` if the payload fails validation, `500` otherwise.
#[axum::debug_handler]
async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderReq>,
) -> Result<Json<OrderRes>, ApiError> {
    match state.order_service.create(req.into()) {
        Ok(order) => Ok(Json(order.into())),
        Err(e) => Err(api_error("Create order error", e)),
    }
}

#[utoipa::path(
    get,
    path = "/orders/{code}",
    params(("code" = String, Path, description = "5-digit order code")),
    responses(
        (status = 200, description = "Order", body = OrderRes),
        (status = 404, description = "Order not found")
    )
)]
#[axum::debug_handler]
async fn get_order(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<OrderRes>, ApiError> {
    state
        .order_service
        .get(&code)
        .map(|order| Json(order.into()))
        .map_err(|e| api_error("Get order error", e))
}

#[utoipa::path(
    get,
    path = "/patients/{iin}/orders",
    params(("iin" = String, Path, description = "12-character patient IIN")),
    responses(
        (status = 200, description = "All orders for the patient, oldest first", body = [OrderRes]),
        (status = 500, description = "Internal server error")
    )
)]
/// List every order placed for one patient
///
/// An unknown or malformed IIN yields an empty list.
#[axum::debug_handler]
async fn list_patient_orders(
    State(state): State<AppState>,
    Path(iin): Path<String>,
) -> Result<Json<Vec<OrderRes>>, ApiError> {
    let orders = state
        .order_service
        .find_by_iin(&iin)
        .map_err(|e| api_error("Find orders by IIN error", e))?;
    Ok(Json(orders.into_iter().map(OrderRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/patient/{code}/referral",
    params(("code" = String, Path, description = "5-digit order code")),
    responses(
        (status = 200, description = "Order with its referral deep link and QR image", body = OrderRes),
        (status = 404, description = "Order not found")
    )
)]
/// Patient-facing referral view
#[axum::debug_handler]
async fn patient_referral(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<OrderRes>, ApiError> {
    state
        .order_service
        .referral(&code)
        .map(|order| Json(order.into()))
        .map_err(|e| api_error("Referral view error", e))
}

#[utoipa::path(
    get,
    path = "/patient/{code}/results",
    params(("code" = String, Path, description = "5-digit order code")),
    responses(
        (status = 200, description = "Order with its results, if uploaded", body = OrderRes),
        (status = 404, description = "Order not found")
    )
)]
/// Patient-facing results view
///
/// `results` is `null` until the lab uploads them.
#[axum::debug_handler]
async fn patient_results(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<OrderRes>, ApiError> {
    state
        .order_service
        .results(&code)
        .map(|order| Json(order.into()))
        .map_err(|e| api_error("Results view error", e))
}

#[utoipa::path(
    post,
    path = "/lab/{code}/blood-taken",
    params(("code" = String, Path, description = "5-digit order code")),
    responses(
        (status = 200, description = "Order moved to blood_taken", body = OrderRes),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition rejected by the guarded policy")
    )
)]
/// Lab marks the blood sample as taken
#[axum::debug_handler]
async fn mark_blood_taken(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<OrderRes>, ApiError> {
    state
        .order_service
        .mark_blood_taken(&code)
        .map(|order| Json(order.into()))
        .map_err(|e| api_error("Mark blood taken error", e))
}

#[utoipa::path(
    post,
    path = "/lab/{code}/results",
    params(("code" = String, Path, description = "5-digit order code")),
    request_body = UploadResultsReq,
    responses(
        (status = 200, description = "Results stored and patient notified", body = OrderRes),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition rejected by the guarded policy")
    )
)]
/// Lab uploads per-allergen results
///
/// Replaces any earlier results, moves the order to `results_ready` and sends the patient a
/// "results ready" message when a chat is known.
#[axum::debug_handler]
async fn upload_results(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<UploadResultsReq>,
) -> Result<Json<OrderRes>, ApiError> {
    match state.order_service.upload_results(&code, req.results) {
        Ok(order) => Ok(Json(order.into())),
        Err(e) => Err(api_error("Upload results error", e)),
    }
}

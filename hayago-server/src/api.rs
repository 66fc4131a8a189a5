use std::sync::Arc;

use axum::{
    BoxError, Json, Router,
    error_handling::HandleErrorLayer,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Duration, Utc};
use hayago_core::{Coordinate, geometry::measure::path_length_km, geometry::route_feature};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tower::{ServiceBuilder, limit::ConcurrencyLimitLayer, timeout::TimeoutLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::{
    config::ServerConfig,
    error::ApiError,
    store::{LocationPayload, LocationStore},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LocationStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            store: Arc::new(LocationStore::new(config.nearby.clone())),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(ConcurrencyLimitLayer::new(state.config.concurrency_limit));

    Router::new()
        .route("/location", post(update_location))
        .route("/location/batch", post(update_locations_batch))
        .route("/location/{driver_id}", get(driver_history))
        .route("/location/{driver_id}/latest", get(latest_location))
        .route("/drivers/nearby", get(nearby_drivers))
        .route("/trips/{trip_id}/route", get(trip_route))
        .route("/health", get(health))
        .layer(middleware)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_middleware_error(err: BoxError) -> (StatusCode, Json<Value>) {
    let (status, message) = if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled internal error: {err}"),
        )
    };
    (status, Json(json!({"status": "error", "message": message})))
}

fn parse_payload(value: Value) -> Result<LocationPayload, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid location data: {e}")))
}

async fn update_location(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let location = parse_payload(body)?.validate(now)?;
    let fix = state.store.record(location, now);
    debug!(driver_id = %fix.driver_id, id = fix.id, "location recorded");

    Ok(Json(json!({
        "status": "success",
        "message": "Location updated successfully",
        "location_id": fix.id,
    })))
}

async fn update_locations_batch(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let locations = match body.get("locations") {
        None | Some(Value::Null) => {
            return Err(ApiError::BadRequest("No locations provided".to_string()));
        }
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return Err(ApiError::BadRequest("Locations must be a list".to_string())),
    };

    let now = Utc::now();
    let mut processed = 0usize;
    let mut failed = Vec::new();
    for (index, item) in locations.into_iter().enumerate() {
        match parse_payload(item).and_then(|payload| payload.validate(now)) {
            Ok(location) => {
                state.store.record(location, now);
                processed += 1;
            }
            Err(e) => failed.push(json!({"index": index, "error": e.to_string()})),
        }
    }
    info!(processed, failed = failed.len(), "location batch stored");

    Ok(Json(json!({
        "status": "success",
        "message": format!("Processed {processed} locations"),
        "processed_count": processed,
        "failed_count": failed.len(),
        "failed_locations": failed,
    })))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    hours: Option<i64>,
    limit: Option<usize>,
}

async fn driver_history(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, ApiError> {
    let defaults = &state.config.history;
    let hours = params.hours.unwrap_or(defaults.default_hours);
    let limit = params.limit.unwrap_or(defaults.default_limit);
    let since = history_start(Utc::now(), hours)?;
    let locations = state.store.history(&driver_id, since, limit);

    Ok(Json(json!({
        "status": "success",
        "driver_id": driver_id,
        "count": locations.len(),
        "locations": locations,
    })))
}

fn history_start(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, ApiError> {
    if hours < 0 {
        return Err(ApiError::BadRequest(
            "Hours must not be negative".to_string(),
        ));
    }
    Duration::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| ApiError::BadRequest(format!("Hours out of range: {hours}")))
}

async fn latest_location(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let location = state
        .store
        .latest(&driver_id)
        .ok_or_else(|| ApiError::NotFound("No location found for driver".to_string()))?;
    Ok(Json(json!({"status": "success", "location": location})))
}

#[derive(Debug, Deserialize)]
struct NearbyParams {
    latitude: f64,
    longitude: f64,
    radius: Option<f64>,
}

async fn nearby_drivers(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<Value>, ApiError> {
    let center = Coordinate::new(params.latitude, params.longitude)?;
    let radius = params
        .radius
        .unwrap_or(state.store.nearby_config().default_radius_km);
    if radius.is_nan() || radius <= 0.0 {
        return Err(ApiError::BadRequest(
            "Radius must be greater than 0".to_string(),
        ));
    }
    let drivers = state.store.nearby(center, radius, Utc::now());

    Ok(Json(json!({
        "status": "success",
        "count": drivers.len(),
        "radius_km": radius,
        "drivers": drivers,
    })))
}

async fn trip_route(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let route = state.store.trip_route(&trip_id);
    if route.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No locations logged for trip {trip_id}"
        )));
    }

    let mut properties = Map::new();
    properties.insert("trip_id".to_string(), json!(trip_id));
    properties.insert("points".to_string(), json!(route.len()));
    properties.insert("distance_km".to_string(), json!(path_length_km(&route)));
    let feature = route_feature(&route, properties)?;

    Ok(Json(json!(feature)))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let stats = state.store.stats();
    Json(json!({
        "status": "healthy",
        "total_locations": stats.total_locations,
        "active_drivers": stats.active_drivers,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use tower::ServiceExt;

    use super::*;

    fn app() -> (Router, AppState) {
        let state = AppState::new(ServerConfig::default());
        (router(state.clone()), state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn location_is_stored_and_served() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            post_json(
                "/location",
                json!({"driver_id": "DRV-1", "latitude": 37.7749, "longitude": -122.4194, "speed": 30.0}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["location_id"], 1);

        let (status, body) = send(&app, get("/location/DRV-1/latest")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["latitude"], 37.7749);
        assert_eq!(body["location"]["speed"], 30.0);

        let (_, body) = send(&app, get("/location/DRV-1?hours=1")).await;
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn history_window_out_of_range_is_rejected() {
        let (app, _) = app();
        for hours in ["9223372036854775807", "2562047788015", "-1"] {
            let (status, body) = send(&app, get(&format!("/location/DRV-1?hours={hours}"))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "hours={hours}");
            assert_eq!(body["status"], "error");
        }

        let (status, body) = send(&app, get("/location/DRV-1?hours=0")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn invalid_location_is_rejected() {
        let (app, state) = app();
        let (status, body) = send(
            &app,
            post_json("/location", json!({"driver_id": "DRV-1", "latitude": 95.0, "longitude": 0.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, body) = send(
            &app,
            post_json("/location", json!({"latitude": 1.0, "longitude": 1.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing required field: driver_id");
        assert_eq!(state.store.stats().total_locations, 0);
    }

    #[tokio::test]
    async fn batch_reports_failed_items() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            post_json(
                "/location/batch",
                json!({"locations": [
                    {"driver_id": "DRV-1", "latitude": 1.0, "longitude": 1.0},
                    {"driver_id": "DRV-1", "latitude": 1.0},
                    {"driver_id": "DRV-2", "latitude": 2.0, "longitude": 2.0},
                ]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["processed_count"], 2);
        assert_eq!(body["failed_count"], 1);
        assert_eq!(body["failed_locations"][0]["index"], 1);

        let (status, _) = send(&app, post_json("/location/batch", json!({"locations": 5}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_driver_has_no_latest_location() {
        let (app, _) = app();
        let (status, body) = send(&app, get("/location/ghost/latest")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No location found for driver");
    }

    #[tokio::test]
    async fn nearby_lists_closest_first() {
        let (app, _) = app();
        for (id, lat) in [("far", 37.80), ("near", 37.7750), ("outside", 38.5)] {
            send(
                &app,
                post_json(
                    "/location",
                    json!({"driver_id": id, "latitude": lat, "longitude": -122.4194}),
                ),
            )
            .await;
        }

        let (status, body) = send(
            &app,
            get("/drivers/nearby?latitude=37.7749&longitude=-122.4194"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["radius_km"], 5.0);
        assert_eq!(body["drivers"][0]["driver_id"], "near");
        assert_eq!(body["drivers"][1]["driver_id"], "far");
    }

    #[tokio::test]
    async fn logged_trip_route_is_a_feature() {
        let (app, _) = app();
        for (minute, lat) in [(1, 37.70), (2, 37.71)] {
            send(
                &app,
                post_json(
                    "/location",
                    json!({
                        "driver_id": "DRV-1",
                        "latitude": lat,
                        "longitude": -122.40,
                        "trip_id": "TRIP-1",
                        "timestamp": format!("2025-06-01T12:0{minute}:00Z"),
                    }),
                ),
            )
            .await;
        }

        let (status, body) = send(&app, get("/trips/TRIP-1/route")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "Feature");
        assert_eq!(body["geometry"]["type"], "LineString");
        assert_eq!(body["geometry"]["coordinates"][0], json!([-122.40, 37.70]));
        let distance = body["properties"]["distance_km"].as_f64().unwrap();
        assert!((distance - 1.11).abs() < 0.01);

        let (status, _) = send(&app, get("/trips/TRIP-2/route")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_counts_locations() {
        let (app, _) = app();
        send(
            &app,
            post_json("/location", json!({"driver_id": "DRV-1", "latitude": 1.0, "longitude": 1.0})),
        )
        .await;
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["total_locations"], 1);
        assert_eq!(body["active_drivers"], 1);
    }
}

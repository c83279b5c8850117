//! HTTP API routes
//!
//! All bodies, including errors, carry a `success` flag. Errors are
//! `{success: false, error}`; unexpected failures are logged and reported
//! as a generic "Server Error".

use crate::constants::api::API_PREFIX;
use crate::coord::Coordinate;
use crate::error::Error;
use crate::location::{LocationUpdate, SharingSettings};
use crate::server::auth::AuthUser;
use crate::server::state::AppState;
use crate::store::schema::HobbyCategory;
use crate::store::{ContentKind, NearbyItem, NearbyQuery};

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/events/nearby", get(events_nearby_handler))
        .route("/hobbies/nearby", get(hobbies_nearby_handler))
        .route("/users/location", post(location_update_handler))
        .route("/users/location/settings", post(location_settings_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/health", get(health_handler));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Nearby query response
#[derive(Debug, Serialize, Deserialize)]
pub struct NearbyResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<NearbyItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub version: String,
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default = "success")]
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
}

fn success() -> bool {
    true
}

/// API error response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            success: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(message) => Self::bad_request(message),
            Error::Unauthorized(message) => Self {
                status: StatusCode::UNAUTHORIZED,
                message,
            },
            Error::NotFound(message) => Self {
                status: StatusCode::NOT_FOUND,
                message,
            },
            other => {
                error!(error = %other, "request failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Server Error".to_string(),
                }
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Parse the raw query string of a nearby request
///
/// Parameters are read by hand so that a missing or malformed value is
/// reported in the JSON error body instead of axum's plain-text rejection.
fn parse_nearby_query(
    params: &HashMap<String, String>,
    category_key: &str,
    default_radius_km: f64,
) -> Result<NearbyQuery, ApiError> {
    let number = |key: &str| -> Result<Option<f64>, ApiError> {
        match params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("{} must be a number", key))),
        }
    };

    let (latitude, longitude) = match (number("latitude")?, number("longitude")?) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            return Err(ApiError::bad_request(
                "Please provide latitude and longitude",
            ))
        }
    };

    let coordinate = Coordinate::new(latitude, longitude);
    coordinate.validate()?;

    let radius_km = number("radius")?.unwrap_or(default_radius_km);
    if radius_km <= 0.0 {
        return Err(ApiError::bad_request("radius must be positive"));
    }

    let category = params
        .get(category_key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<HobbyCategory>())
        .transpose()?;

    Ok(NearbyQuery {
        coordinate,
        radius_km,
        category,
    })
}

async fn nearby(
    state: &AppState,
    kind: ContentKind,
    category_key: &str,
    params: &HashMap<String, String>,
) -> Result<Json<NearbyResponse>, ApiError> {
    let query = parse_nearby_query(params, category_key, state.default_radius_km())?;
    let data = state.store.nearby(kind, &query, state.max_results()).await;

    debug!(?kind, count = data.len(), radius_km = query.radius_km, "nearby query");

    Ok(Json(NearbyResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// GET /api/v1/events/nearby
async fn events_nearby_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<NearbyResponse>, ApiError> {
    nearby(&state, ContentKind::Event, "hobbyType", &params).await
}

/// GET /api/v1/hobbies/nearby
async fn hobbies_nearby_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<NearbyResponse>, ApiError> {
    nearby(&state, ContentKind::Hobby, "category", &params).await
}

/// POST /api/v1/users/location
async fn location_update_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<LocationUpdate>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(update) = body?;
    state.store.set_user_location(&user_id, update).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/v1/users/location/settings
async fn location_settings_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<SharingSettings>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(settings) = body?;
    state.store.set_user_settings(&user_id, settings).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/v1/auth/refresh
async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = body?;
    let pair = state.tokens.refresh(&request.refresh_token)?;
    Ok(Json(TokenResponse {
        success: true,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// GET /api/v1/health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::testing::seeded_store;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn create_test_state() -> Arc<AppState> {
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        Arc::new(AppState::with_store(config, seeded_store().await))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post(
        app: Router,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        let response = app
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_nearby_missing_latitude() {
        let app = create_router(create_test_state().await);
        let (status, body) = get(app, "/api/v1/events/nearby?longitude=-74.00").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("latitude"));
    }

    #[tokio::test]
    async fn test_nearby_unparsable_and_out_of_range() {
        let state = create_test_state().await;

        for uri in [
            "/api/v1/events/nearby?latitude=abc&longitude=-74.00",
            "/api/v1/events/nearby?latitude=91&longitude=-74.00",
            "/api/v1/events/nearby?latitude=40.71&longitude=-74.00&radius=0",
            "/api/v1/events/nearby?latitude=40.71&longitude=-74.00&radius=-3",
            "/api/v1/events/nearby?latitude=40.71&longitude=-74.00&hobbyType=knitting-circle",
        ] {
            let (status, body) = get(create_router(state.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["success"], false);
        }
    }

    #[tokio::test]
    async fn test_nearby_radius_filter_sorted() {
        let app = create_router(create_test_state().await);
        let (status, body) = get(
            app,
            "/api/v1/events/nearby?latitude=40.71&longitude=-74.00&radius=5",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let response: NearbyResponse = serde_json::from_value(body).unwrap();
        assert!(response.success);
        assert_eq!(response.count, 3);
        assert_eq!(response.data.len(), 3);
        assert!(response.data.iter().all(|item| item.distance <= 5.0));
        assert!(response
            .data
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_nearby_default_radius() {
        let app = create_router(create_test_state().await);
        let (_, body) = get(app, "/api/v1/events/nearby?latitude=40.71&longitude=-74.00").await;
        // the 8 km document is inside the 10 km default
        assert_eq!(body["count"], 4);
    }

    #[tokio::test]
    async fn test_nearby_result_cap() {
        let mut config = Config::default();
        config.nearby.max_results = 2;
        let state = Arc::new(AppState::with_store(config, seeded_store().await));

        let (_, body) = get(
            create_router(state),
            "/api/v1/events/nearby?latitude=40.71&longitude=-74.00&radius=20",
        )
        .await;
        assert_eq!(body["count"], 2);
    }

    #[tokio::test]
    async fn test_events_hobby_type_filter() {
        let app = create_router(create_test_state().await);
        let (_, body) = get(
            app,
            "/api/v1/events/nearby?latitude=40.71&longitude=-74.00&hobbyType=music",
        )
        .await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["title"], "Near Jam");
        assert_eq!(body["data"][0]["location"]["type"], "Point");
    }

    #[tokio::test]
    async fn test_hobbies_category_filter() {
        let state = create_test_state().await;

        let (_, body) = get(
            create_router(state.clone()),
            "/api/v1/hobbies/nearby?latitude=40.71&longitude=-74.00&category=arts",
        )
        .await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["title"], "Pottery Circle");

        let (_, body) = get(
            create_router(state),
            "/api/v1/hobbies/nearby?latitude=40.71&longitude=-74.00&category=music",
        )
        .await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_location_update_requires_auth() {
        let app = create_router(create_test_state().await);
        let (status, body) = post(
            app,
            "/api/v1/users/location",
            None,
            serde_json::json!({"longitude": -74.0, "latitude": 40.71, "timestamp": "2024-05-01T12:00:00Z"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_location_update_and_settings() {
        let state = create_test_state().await;
        let pair = state.tokens.issue_pair("user-7").unwrap();

        let (status, body) = post(
            create_router(state.clone()),
            "/api/v1/users/location",
            Some(&pair.access_token),
            serde_json::json!({"longitude": -74.0, "latitude": 40.71, "timestamp": "2024-05-01T12:00:00Z"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = post(
            create_router(state.clone()),
            "/api/v1/users/location/settings",
            Some(&pair.access_token),
            serde_json::json!({"isLocationSharingEnabled": false, "geofenceRadius": 2500}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let record = state.store.user_location("user-7").await.unwrap();
        assert_eq!(record.last_update.unwrap().latitude, 40.71);
        assert_eq!(record.settings.unwrap().geofence_radius, 2500);
    }

    #[tokio::test]
    async fn test_location_update_invalid_coordinates() {
        let state = create_test_state().await;
        let pair = state.tokens.issue_pair("user-7").unwrap();

        let (status, body) = post(
            create_router(state.clone()),
            "/api/v1/users/location",
            Some(&pair.access_token),
            serde_json::json!({"longitude": -74.0, "latitude": 120.0, "timestamp": "2024-05-01T12:00:00Z"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = post(
            create_router(state),
            "/api/v1/users/location",
            Some(&pair.access_token),
            serde_json::json!({"latitude": 40.0}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_refresh_flow() {
        let state = create_test_state().await;
        let pair = state.tokens.issue_pair("user-7").unwrap();

        let (status, body) = post(
            create_router(state.clone()),
            "/api/v1/auth/refresh",
            None,
            serde_json::json!({"refreshToken": pair.refresh_token}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let tokens: TokenResponse = serde_json::from_value(body).unwrap();
        assert!(tokens.success);
        assert!(!tokens.access_token.is_empty());

        // an access token cannot be used to refresh
        let (status, body) = post(
            create_router(state),
            "/api/v1/auth/refresh",
            None,
            serde_json::json!({"refreshToken": pair.access_token}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(create_test_state().await);
        let (status, body) = get(app, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = serde_json::from_value(body).unwrap();
        assert!(health.success);
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let err = ApiError::from(Error::Storage("disk on fire".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Server Error");
    }
}

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use appointment_cell::router::appointment_routes;
use availability_cell::router::availability_routes;
use shared_database::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .nest("/availability", availability_routes(state.clone()))
        .nest("/appointments", appointment_routes(state));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use shared_utils::test_utils::TestConfig;

    fn test_app() -> Router {
        let state = Arc::new(AppState::new(TestConfig::default().to_app_config()));
        create_router(state)
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_routes_require_authentication() {
        for uri in [
            format!("/api/availability/{}", Uuid::new_v4()),
            format!("/api/appointments/{}", Uuid::new_v4()),
        ] {
            let response = test_app()
                .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}

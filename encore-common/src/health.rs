//! Liveness endpoint mounted by every Encore service

use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub module: String,
    pub version: String,
}

impl HealthStatus {
    pub fn ok(module: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            module: module.to_string(),
            version: version.to_string(),
        }
    }
}

/// `GET /health` reporting a fixed module name and version
///
/// The payload never changes after startup, so it is built once and cloned
/// per request.
pub fn health_routes<S>(module: &str, version: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let status = HealthStatus::ok(module, version);
    Router::new().route(
        "/health",
        get(move || {
            let status = status.clone();
            async move { Json(status) }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_reports_module_and_version() {
        let app: Router = health_routes("encore-test", "1.2.3");

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: HealthStatus = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, HealthStatus::ok("encore-test", "1.2.3"));
    }
}

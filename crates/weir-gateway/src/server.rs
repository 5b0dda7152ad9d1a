// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the webhook endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use weir_core::WeirError;

use crate::handlers::{self, AppState};

/// Server bind configuration (mirrors ServerConfig from weir-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the gateway router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::get_index))
        .route("/health", get(handlers::get_health))
        .route("/webhook/{target}/incoming", post(handlers::post_incoming))
        .route("/webhook/{target}/outgoing", post(handlers::post_outgoing))
        .route("/webhook/{target}/lifecycle", post(handlers::post_lifecycle))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process shuts down.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), WeirError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WeirError::Gateway {
            message: format!("failed to bind gateway to {addr}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| WeirError::Gateway {
            message: "gateway server error".to_string(),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use weir_core::store::{EventStore, UpsertOutcome};
    use weir_core::{Event, WeirError};
    use weir_pipeline::{Pipeline, PipelineSettings};

    struct CountingStore {
        applied: AtomicUsize,
    }

    #[async_trait]
    impl EventStore for CountingStore {
        async fn apply(&self, _event: &Event) -> Result<UpsertOutcome, WeirError> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            Ok(UpsertOutcome {
                message_inserted: true,
            })
        }

        async fn health_check(&self) -> Result<(), WeirError> {
            Ok(())
        }
    }

    fn make_app() -> (Router, Arc<CountingStore>, Pipeline) {
        let store = Arc::new(CountingStore {
            applied: AtomicUsize::new(0),
        });
        let mut stores: HashMap<String, Arc<dyn EventStore>> = HashMap::new();
        stores.insert("primary".to_string(), store.clone());
        stores.insert("vip".to_string(), store.clone());

        let pipeline = Pipeline::start(
            PipelineSettings {
                queue_capacity: 16,
                workers: 1,
                ..PipelineSettings::default()
            },
            stores,
            CancellationToken::new(),
        );
        let state = AppState {
            ingress: pipeline.ingress(),
            health: pipeline.health(),
            targets: Arc::new(vec!["primary".to_string(), "vip".to_string()]),
        };
        (build_router(state), store, pipeline)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn message_body() -> Value {
        json!({
            "contact": {"id": 1, "phone": "+15550001111"},
            "channel": {"id": 7, "name": "whatsapp"},
            "message": {
                "messageId": 42,
                "timestamp": 1_770_000_000_000i64,
                "message": {"type": "text", "text": "hi"},
            },
        })
    }

    #[tokio::test]
    async fn incoming_webhook_is_accepted() {
        let (app, store, pipeline) = make_app();
        let response = app
            .oneshot(post_json("/webhook/primary/incoming", message_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "accepted");

        pipeline.shutdown().await;
        assert_eq!(store.applied.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_target_is_404() {
        let (app, _store, pipeline) = make_app();
        let response = app
            .oneshot(post_json("/webhook/nonexistent/incoming", message_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn unkeyable_contact_is_400() {
        let (app, _store, pipeline) = make_app();
        let mut body = message_body();
        body["contact"] = json!({});
        let response = app
            .oneshot(post_json("/webhook/primary/incoming", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn lifecycle_rejects_wrong_event_type() {
        let (app, _store, pipeline) = make_app();
        let response = app
            .oneshot(post_json(
                "/webhook/vip/lifecycle",
                json!({"event_type": "message.received", "contact": {"id": 1}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn lifecycle_accepts_matching_event_type() {
        let (app, store, pipeline) = make_app();
        let response = app
            .oneshot(post_json(
                "/webhook/vip/lifecycle",
                json!({
                    "event_type": "contact.lifecycle.updated",
                    "lifecycle": "customer",
                    "contact": {"id": 1, "phone": "+15550001111"},
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        pipeline.shutdown().await;
        assert_eq!(store.applied.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn health_exposes_queue_and_breaker() {
        let (app, _store, pipeline) = make_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["queue"]["max_size"], 16);
        assert_eq!(json["queue"]["workers"], 1);
        assert_eq!(json["circuit_breaker"]["status"], "CLOSED");
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn index_lists_endpoints_per_target() {
        let (app, _store, pipeline) = make_app();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        let endpoints: Vec<String> = json["endpoints"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert!(endpoints.contains(&"POST /webhook/primary/incoming".to_string()));
        assert!(endpoints.contains(&"POST /webhook/vip/lifecycle".to_string()));
        assert!(endpoints.contains(&"GET /health".to_string()));
        pipeline.shutdown().await;
    }
}

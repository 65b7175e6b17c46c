//! Application router.
//!
//! One route set for every authentication strategy. It is served at the
//! root and mirrored under `/api`.

use std::sync::Arc;

use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::application::{LoginHandler, RelaySettings, StreamRelay};
use crate::ports::UpstreamConnector;

use super::auth::{auth_routes, AuthHandlers};
use super::chat::{chat_routes, ChatHandlers};
use super::middleware::{session_middleware, AuthStrategy};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the full router.
///
/// `/auth/login` is only mounted for [`AuthStrategy::Login`]; the other
/// strategies take their session from configuration.
pub fn app_router(
    strategy: AuthStrategy,
    connector: Arc<dyn UpstreamConnector>,
    relay: RelaySettings,
) -> Router {
    let relay = Arc::new(StreamRelay::new(relay));

    let mut api = chat_routes(ChatHandlers::new(relay)).route_layer(
        middleware::from_fn_with_state(strategy.resolver(), session_middleware),
    );

    if let Some(store) = strategy.login_store() {
        let login = LoginHandler::new(connector, Arc::clone(store));
        api = api.merge(auth_routes(AuthHandlers::new(Arc::new(login))));
    }

    tracing::info!(strategy = strategy.name(), "routes configured");

    Router::new()
        .route("/health", get(health))
        .merge(api.clone())
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http()),
        )
}

//! HTTP routing.

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::bundle_ctrl::bundle_handler;
use crate::controller::{
    conditional_delete_handler, conditional_update_handler, create_handler, delete_handler,
    everything_handler, history_handler, read_handler, search_handler, search_post_handler,
    update_handler, vread_handler,
};
use crate::error::RestError;
use crate::state::AppState;

/// Builds the full routing table from spec'd HTTP surface.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(bundle_handler))
        .route(
            "/{resource_type}",
            get(search_handler)
                .post(create_handler)
                .put(conditional_update_handler)
                .delete(conditional_delete_handler),
        )
        .route("/{resource_type}/_search", post(search_post_handler))
        .route(
            "/{resource_type}/{id}",
            get(read_handler).put(update_handler).delete(delete_handler),
        )
        .route("/{resource_type}/{id}/_history", get(history_handler))
        .route("/{resource_type}/{id}/_history/{vid}", get(vread_handler))
        .route("/{resource_type}/{id}/$everything", get(everything_handler))
        .layer(middleware::from_fn_with_state(state.clone(), mutex_guard))
        .layer(middleware::from_fn_with_state(state.clone(), read_only_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// In read-only mode every verb other than GET, HEAD or OPTIONS is 405.
async fn read_only_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method();
    let read_allowed =
        method == Method::GET || method == Method::HEAD || method == Method::OPTIONS;
    if state.config().read_only && !read_allowed {
        return RestError::ReadOnly.into_response();
    }
    next.run(request).await
}

/// Serialises requests that carry the same `X-Mutex-Name` header. Requests
/// selecting a database via `Db` are assumed re-entrant and pass through.
async fn mutex_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mutex_name = request
        .headers()
        .get("X-Mutex-Name")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let db = request
        .headers()
        .get("Db")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if mutex_name.is_empty() || !db.is_empty() {
        let mut response = next.run(request).await;
        response
            .headers_mut()
            .insert("X-Mutex-Used", "0".parse().expect("static header value"));
        return response;
    }

    let guard = state.mutexes().lock(&mutex_name).await;
    let mut response = next.run(request).await;
    state.mutexes().unlock(guard);
    response
        .headers_mut()
        .insert("X-Mutex-Used", "1".parse().expect("static header value"));
    response
}

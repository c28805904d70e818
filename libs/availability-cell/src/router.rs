use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn availability_routes(state: Arc<AppState>) -> Router {
    let auth_state = Arc::new(state.config.clone());

    Router::new()
        .route("/", post(handlers::submit_availability))
        // GET takes a doctor id, PUT/DELETE a slot id.
        .route(
            "/{id}",
            get(handlers::get_availability)
                .put(handlers::update_availability)
                .delete(handlers::delete_availability),
        )
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(state)
}

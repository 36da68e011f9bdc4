use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().nest("/bags", bag_routes())
}

fn bag_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::bag::list_bags).post(handlers::bag::create_bag),
        )
        .route("/storage", get(handlers::bag::storage_summary))
        .route(
            "/{bag_id}",
            get(handlers::bag::get_bag).delete(handlers::bag::delete_bag),
        )
        .nest("/files/{file_id}", file_routes())
}

fn file_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::bag::get_file_bags).put(handlers::bag::update_bag),
        )
        .route("/content", get(handlers::bag::show_content))
        .route("/validate", post(handlers::bag::validate_bag))
}

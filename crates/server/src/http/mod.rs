use axum::{Router, routing::get};
use db::DBService;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::routes;

pub fn router(db: DBService) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::tasks::router(&db))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

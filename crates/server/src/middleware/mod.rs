use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use db::{DBService, models::task::Task};

/// Loads the task named by the `{task_id}` path segment and inserts it as a
/// request extension, so the id lookup always happens before handler
/// validation. Misses become empty-body 404s.
pub async fn load_task_middleware(
    State(db): State<DBService>,
    Path(task_id): Path<i64>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    match Task::find_by_id(&db.conn, task_id).await {
        Ok(Some(task)) => {
            request.extensions_mut().insert(task);
            Ok(next.run(request).await)
        }
        Ok(None) => {
            tracing::warn!("Task {task_id} not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(error) => {
            tracing::error!("Failed to fetch task {task_id}: {error}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

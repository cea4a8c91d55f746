use std::sync::atomic::{AtomicU32, Ordering};

use axum::Router;
use db::DBService;

/// Router backed by a throwaway on-disk SQLite database with migrations
/// applied, so every test gets an isolated store.
pub async fn test_app() -> Router {
    static NEXT: AtomicU32 = AtomicU32::new(0);
    let dir = std::env::temp_dir().join(format!(
        "tasks-server-test-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let url = format!("sqlite://{}/db.sqlite?mode=rwc", dir.to_string_lossy());

    let db = DBService::new(&url).await.unwrap();
    crate::http::router(db)
}

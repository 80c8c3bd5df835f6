use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planner_backend::api::router;
use planner_backend::state::AppState;
use planner_backend::storage::{MemoryStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "planner_backend=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // DATABASE_URL selects the sqlite backend; without it records live in
    // memory for the lifetime of the process.
    let storage: Arc<dyn Storage> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("using sqlite storage at {}", database_url);
            Arc::new(SqliteStorage::new(pool))
        }
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory storage");
            Arc::new(MemoryStorage::new())
        }
    };

    let state = AppState { storage };
    let app = router(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use taskhook_scheduler::{ReqwestTransport, Scheduler};
use taskhook_server::{
    app::{self, AppState},
    config::ServerConfig,
    db::PgTaskStore,
};
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(
        listen_addr = %config.listen_addr,
        max_connections = config.database.max_connections,
        "Loaded configuration"
    );

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    // Start the scheduling loop
    let store = Arc::new(PgTaskStore::new(db_pool.clone()));
    let transport = Arc::new(ReqwestTransport::new().expect("failed to build HTTP client"));
    let scheduler = Scheduler::from_config(store, transport, &config.scheduler);
    let (stop_scheduler, scheduler_stopped) = oneshot::channel::<()>();
    let scheduler_task = tokio::spawn(scheduler.run(async {
        let _ = scheduler_stopped.await;
    }));

    let app = app::router(Arc::new(AppState::new(db_pool)));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // The scheduler finishes its current cycle before exiting.
    tracing::info!("Waiting for scheduler to stop...");
    let _ = stop_scheduler.send(());
    if let Err(e) = scheduler_task.await {
        tracing::error!(error = %e, "Scheduler task failed");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

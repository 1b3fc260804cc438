use {
    lms_pay::{
        AppState,
        adapters::http,
        config::Config,
        domain::ports::SystemClock,
        infra::postgres::{enrollment_repo::PgEnrollmentService, order_repo::PgOrderStore},
        services::{reconciler::Reconciler, sweep::run_expiry_sweep},
    },
    sqlx::postgres::PgPoolOptions,
    std::{net::SocketAddr, sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    config.warn_on_permissive_defaults();

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let reconciler = Reconciler::new(
        Arc::new(PgOrderStore::new(pool.clone())),
        Arc::new(PgEnrollmentService::new(pool.clone())),
        Arc::new(SystemClock),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep = tokio::spawn(run_expiry_sweep(
        reconciler.clone(),
        config.sweep_interval,
        shutdown_rx,
    ));

    let listen_addr = config.listen_addr.clone();
    let state = AppState::new(config, reconciler).expect("failed to build application state");
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .expect("failed to bind listen address");
    tracing::info!("listening on {listen_addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweep.await {
        tracing::error!("expiry sweep task failed: {e}");
    }
    tracing::info!("shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

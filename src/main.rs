use std::net::TcpListener;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use pioneer_auth::auth::handlers::{login, logout, refresh, register, verify};
use pioneer_auth::{health_check, sweep, AppError, AppState, Settings};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

const VERIFICATION_SWEEP_PERIOD: Duration = Duration::from_secs(60);
const REFRESH_SWEEP_PERIOD: Duration = Duration::from_secs(3600);

#[actix_web::main]
async fn main() -> pioneer_auth::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully");

    info!("Starting server at {}:{}", config.server.host, config.server.port);

    // Initialize application state
    let state = AppState::new(config.clone()).await?;

    // Background sweeps, stopped explicitly on shutdown
    let verification = state.verification.clone();
    let verification_sweep = sweep::spawn_sweeper(
        "verification-attempts",
        VERIFICATION_SWEEP_PERIOD,
        move || {
            let store = verification.clone();
            async move {
                store.sweep_attempts().await;
            }
        },
    );

    let refresh_tokens = state.refresh_tokens.clone();
    let refresh_sweep = sweep::spawn_sweeper("refresh-tokens", REFRESH_SWEEP_PERIOD, move || {
        let store = refresh_tokens.clone();
        async move {
            match store.delete_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "expired refresh tokens deleted"),
                Err(e) => error!(error = %e, "refresh token sweep failed"),
            }
        }
    });

    let state_data = web::Data::new(state.clone());

    // Create and bind TCP listener
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;

    let workers = config.server.workers as usize;
    let cors_settings = config.cors.clone();

    // Start HTTP server
    HttpServer::new(move || {
        let cors = if cors_settings.enabled {
            let cors_config = Cors::default();

            let cors_config = if cors_settings.allow_any_origin {
                cors_config
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
            } else {
                cors_config
                    .allowed_origin("http://localhost:8080")
                    .allowed_origin("http://127.0.0.1:8080")
                    .allowed_methods(vec!["GET", "POST"])
                    .allowed_headers(vec!["Authorization", "Content-Type"])
                    .supports_credentials()
            };

            cors_config.max_age(cors_settings.max_age as usize)
        } else {
            Cors::default()
        };

        App::new()
            .wrap(cors)
            .app_data(state_data.clone())
            .route("/health", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/verify", web::post().to(verify))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
    })
    .listen(listener)?
    .workers(workers)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    // Deterministic shutdown: stop the sweeps, then close the pool
    refresh_sweep.stop().await;
    verification_sweep.stop().await;
    state.shutdown().await?;

    Ok(())
}

mod analysis;
mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod photos;
mod repos;
mod services;
mod state;
mod stores;
#[cfg(test)]
mod test_utils;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{Router, http};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    analysis::{AnalysisTools, AudioAnalyzer, ToolCommand},
    config::Config,
    photos::LocalPhotoStorage,
    repos::{PgPhotoRepo, PgStatusRepo, PgUserRepo, Repos},
    services::{
        Credentials, EmailSenderImpl, HttpEmbeddingClient, JwtTokenService, NominatimGeocoder,
        OtpManager,
    },
    state::AppState,
    stores::{InMemoryOtpStore, Stores, TokenBucketLimiter},
};

#[derive(Parser)]
#[command(name = "api")]
#[command(about = "Memora API server")]
struct Args {
    /// Run database migrations and exit
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    dotenv::dotenv().ok();

    let args = Args::parse();
    let config = envy::prefixed("MEMORA_").from_env::<Config>()?;

    // Initialize Sentry for error tracking (must be done early, guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let database = PgPoolOptions::new()
        .max_connections(25)
        .connect(&config.database_url)
        .await?;

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&database).await?;
        tracing::info!("Migrations complete");
        return Ok(());
    }

    let repos = Repos {
        users: Arc::new(PgUserRepo::new(database.clone())),
        photos: Arc::new(PgPhotoRepo::new(database.clone())),
        status: Arc::new(PgStatusRepo::new(database)),
    };

    let stores = Stores {
        rate_limiter: Arc::new(TokenBucketLimiter::new(
            config.rate_limit_burst,
            config.rate_limit_per_second,
        )),
        otp: Arc::new(InMemoryOtpStore::new()),
    };

    let tokens = JwtTokenService::new(
        &config.jwt_secret,
        chrono::Duration::hours(config.token_ttl_hours),
    );
    if !tokens.has_key() {
        tracing::warn!("MEMORA_JWT_SECRET is empty, logins will fail until it is set");
    }

    let credentials = Credentials::new(repos.users.clone(), config.bcrypt_cost)?;

    let email = EmailSenderImpl::new(
        config.resend_api_key.clone(),
        config.smtp_url.clone(),
        config.email_from.clone(),
    )?;
    let otp = OtpManager::new(
        stores.otp.clone(),
        Arc::new(email),
        chrono::Duration::seconds(config.otp_ttl_secs),
    );

    let tools = AnalysisTools {
        extractor: ToolCommand::parse(&config.extractor_cmd)
            .context("MEMORA_EXTRACTOR_CMD is empty")?,
        transcoder: ToolCommand::parse(&config.transcoder_cmd)
            .context("MEMORA_TRANSCODER_CMD is empty")?,
        inference: ToolCommand::parse(&config.inference_cmd)
            .context("MEMORA_INFERENCE_CMD is empty")?,
    };
    let mut analyzer = AudioAnalyzer::new(tools, Duration::from_secs(config.tool_timeout_secs))?
        .with_max_download_bytes(config.max_audio_bytes);
    if let Some(root) = config.scratch_dir.as_deref().filter(|dir| !dir.is_empty()) {
        analyzer = analyzer.with_scratch_root(root);
    }

    let state = AppState {
        config: config.clone(),
        repos,
        stores,
        credentials,
        tokens: Arc::new(tokens),
        otp,
        photo_storage: Arc::new(LocalPhotoStorage::new(&config.upload_dir)),
        geocoder: Arc::new(NominatimGeocoder::new(&config.geocoder_url)?),
        embedder: Arc::new(HttpEmbeddingClient::new(&config.embedding_service_url)?),
        analyzer: Arc::new(analyzer),
    };

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let app = Router::new()
        .nest("/health", handlers::health::router())
        .merge(handlers::auth::router())
        .nest("/2fa", handlers::two_factor::router())
        .nest("/photos", handlers::photos::router(config.max_upload_bytes))
        .nest("/analyze", handlers::analyze::router())
        .nest("/search", handlers::search::router())
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .with_state(state)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        // Multipart framing on top of the largest allowed photo
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes + 64 * 1024));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}

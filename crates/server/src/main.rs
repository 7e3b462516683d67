//! A REST API exposing Chilean public data behind a single JSend interface.
//!
//! - `/api/v1/rut/*`: validation, check digit calculation and generation of RUTs, plus the
//!   economic activities the SII publishes for a taxpayer.
//! - `/api/v1/economy/indicators`: the Banco Central daily indicators.
//! - `/api/v1/economy/currencies`: today's exchange rates from the Banco Central, searchable by
//!   name or ISO 4217 code.
//! - `/api/v1/economy/crypto`: cryptocurrency prices from CoinMarketCap, searchable by name or
//!   symbol.
//! - `/api/v1/weather/stations`: the latest readings of the MeteoChile weather stations,
//!   searchable by name or looked up by code.
//!
//! Configuration is read from the environment, see [`config::Config`].

mod cache;
mod config;
mod error;
mod jsend;
mod routes;
mod tracing_config;
mod upstream;

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use cache::ResponseCache;
use config::Config;
use error::ServerError;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use upstream::{
    ActivityService, CryptoService, CurrencyService, IndicatorService, WeatherService,
    bcentral::BancoCentralClient, coinmarketcap::CoinMarketCapClient,
    meteochile::MeteoChileClient, sii::SiiClient,
};

/// How often rate limiter state for clients that have fully refilled is dropped.
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Global state shared for all requests.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Source of taxpayer names and activities, the SII in production.
    activities: Arc<dyn ActivityService>,
    /// Source of exchange rates, the Banco Central in production.
    currencies: Arc<dyn CurrencyService>,
    /// Source of the daily indicators, the Banco Central in production.
    indicators: Arc<dyn IndicatorService>,
    /// Source of cryptocurrency prices, CoinMarketCap in production.
    crypto: Arc<dyn CryptoService>,
    /// Source of weather station readings, MeteoChile in production.
    weather: Arc<dyn WeatherService>,
    /// Cache of successful responses to the upstream backed endpoints.
    cache: Arc<ResponseCache>,
}

pub fn router(app_state: AppState) -> Router {
    // Everything but generation is deterministic for a while, so responses are cached.
    let v1 = Router::new()
        .route("/rut/validate", get(routes::rut::validate))
        .route("/rut/digit", get(routes::rut::digit))
        .route("/rut/activities", get(routes::rut::activities))
        .route("/economy/indicators", get(routes::economy::indicators))
        .route("/economy/currencies", get(routes::economy::currencies))
        .route("/economy/crypto", get(routes::economy::crypto))
        .route("/weather/stations", get(routes::weather::stations))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&app_state.cache),
            cache::cache_responses,
        ))
        .route("/rut/generate", get(routes::rut::generate));

    Router::new()
        .nest("/api", {
            Router::new()
                .route("/health", get(|| async { "OK" }))
                .nest("/v1", v1)
        })
        .fallback(|| async { ServerError::NotFound })
        // State and middleware
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CompressionLayer::new()
                .br(true)
                .gzip(true)
                .no_deflate()
                .no_zstd(),
        )
}

/// Resolves once the process receives a shutdown signal.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(
            err = (&e as &dyn std::error::Error),
            "Failed to listen for the shutdown signal"
        );
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let config = Config::from_env(&env).context("Failed to load configuration")?;

    tracing_config::init_tracing(config.log.format);
    tracing::debug!(?config, "Loaded configuration");

    let client = upstream::http_client(config.upstream.timeout)
        .context("Failed to build the upstream HTTP client")?;

    let cache = Arc::new(
        ResponseCache::builder()
            .time_to_live(config.cache.time_to_live)
            .book_keeping_interval(config.cache.book_keeping_interval)
            .build(),
    );

    let bcentral = Arc::new(BancoCentralClient::new(
        client.clone(),
        config.upstream.bcentral_url,
    ));
    let app_state = AppState {
        activities: Arc::new(SiiClient::new(client.clone(), config.upstream.sii_url)),
        currencies: Arc::clone(&bcentral) as Arc<dyn CurrencyService>,
        indicators: bcentral,
        crypto: Arc::new(CoinMarketCapClient::new(
            client.clone(),
            config.upstream.coinmarketcap_url,
        )),
        weather: Arc::new(MeteoChileClient::new(client, config.upstream.meteochile_url)),
        cache: Arc::clone(&cache),
    };

    let governor_config = GovernorConfigBuilder::default()
        .period(config.rate_limit.duration_between_refill)
        .burst_size(config.rate_limit.bucket_size.get())
        .finish()
        .context("Invalid rate limit configuration")?;
    let governor_config = Arc::new(governor_config);

    let limiter = Arc::clone(governor_config.limiter());
    let handle_rate_limit_cleanup = tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            tracing::trace!(clients = limiter.len(), "Cleaning up rate limiter state");
            limiter.retain_recent();
        }
    });

    let app = router(app_state).layer(GovernorLayer {
        config: governor_config,
    });

    let listener = tokio::net::TcpListener::bind((config.server.host, config.server.port))
        .await
        .context("Failed to bind the listener")?;

    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    handle_rate_limit_cleanup.abort();
    cache::shutdown(cache).await?;

    tracing::info!("Server shutdown");
    Ok(())
}

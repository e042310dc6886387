use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use dotenv::dotenv;
use reqwest::Client;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::FmtSubscriber;
use url::Url;

use crate::{
    bot::{BotContext, game::GameRegistry},
    client::{stats_client::HttpStatsClient, telegram_client::TelegramClient},
    common::app_state::AppState,
    config::config::{CONFIG, StorageBackend, StorageConfig},
    health::handlers::health_routes,
    quiz::models::QuestionBank,
    stats::{
        db::PgStore, error::StoreError, file_store::FileStore, handlers::stats_routes,
        service::StatsService, store::StatsStore, supabase::SupabaseStore,
    },
    submission::submitter::ResultService,
};

mod bot;
mod client;
mod common;
mod config;
mod health;
mod identity;
mod quiz;
mod stats;
mod submission;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() {
    // Initialize .env
    dotenv().ok();

    // Initialize logging
    let level = CONFIG
        .server
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing");

    // Initialize state
    let client = Client::new();
    let store = build_store(&CONFIG.storage, &client)
        .await
        .unwrap_or_else(|e| panic!("Failed to initialize {:?} storage: {}", CONFIG.storage.backend, e));
    let stats = StatsService::new(store, CONFIG.game.points_per_correct);
    let telegram = TelegramClient::new(client.clone(), &CONFIG.bot.token);
    let state = AppState::new(stats.clone(), telegram);

    // Initialize bot
    if CONFIG.bot.token.is_empty() {
        warn!("No bot token configured, running the HTTP API only");
    } else {
        let ctx = build_bot_context(stats, &client);
        tokio::spawn(bot::run(CONFIG.bot.clone(), ctx));
    }

    // Initialize routes
    let app = app(state, &CONFIG.server.cors_origin);

    // Initialize webserver
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", CONFIG.server.address, CONFIG.server.port))
            .await
            .unwrap();

    info!(
        "Server listening on address: {}",
        listener.local_addr().unwrap()
    );
    axum::serve(listener, app).await.unwrap();
}

fn app(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .nest("/health", health_routes(state.clone()))
        .nest("/api", stats_routes(state.clone()))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origin == "*" {
        return cors.allow_origin(Any);
    }

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            warn!("Invalid cors origin {}: {}, allowing any origin", origin, e);
            cors.allow_origin(Any)
        }
    }
}

async fn build_store(
    config: &StorageConfig,
    client: &Client,
) -> Result<Arc<dyn StatsStore>, StoreError> {
    let store: Arc<dyn StatsStore> = match config.backend {
        StorageBackend::Postgres => Arc::new(PgStore::connect(&config.database_url).await?),
        StorageBackend::File => Arc::new(FileStore::new(&config.data_dir)),
        StorageBackend::Supabase => Arc::new(SupabaseStore::new(
            client.clone(),
            &config.supabase_url,
            &config.supabase_key,
        )?),
    };

    store.init().await?;
    info!("Using {} stats storage", store.backend());

    Ok(store)
}

fn build_bot_context(stats: StatsService, client: &Client) -> Arc<BotContext> {
    let bank = QuestionBank::bundled().unwrap_or_else(|e| panic!("{}", e));

    let results: Arc<dyn ResultService> = match CONFIG.stats_api.base_url.as_deref() {
        Some(base_url) if !base_url.is_empty() => {
            info!("Bot saves results through {}", base_url);
            let remote = HttpStatsClient::new(client.clone(), base_url);

            let probe = remote.clone();
            tokio::spawn(async move {
                if let Err(e) = probe.health_check().await {
                    warn!("Stats api is not reachable yet: {}", e);
                }
            });

            Arc::new(remote)
        }
        _ => Arc::new(stats.clone()),
    };

    let webapp_url = match CONFIG.bot.webapp_url.as_str() {
        "" => None,
        raw => match raw.parse::<Url>() {
            Ok(url) => Some(url),
            Err(e) => {
                error!("Invalid bot.webapp_url {}: {}", raw, e);
                None
            }
        },
    };

    Arc::new(BotContext {
        bank,
        games: GameRegistry::new(),
        stats,
        results,
        game_config: CONFIG.game.clone(),
        fallback_identity: CONFIG.fallback_identity.clone(),
        webapp_url,
    })
}

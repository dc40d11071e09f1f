use std::sync::Arc;

use anyhow::Result;
use secrecy::ExposeSecret;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tieshop::bot::{callback_handler, message_handler};
use tieshop::catalog::seed_catalog_if_empty;
use tieshop::config::{AppConfig, StoreConfig};
use tieshop::context::ShopContext;
use tieshop::db::PgStore;
use tieshop::dialogue::SessionMode;
use tieshop::json_store::JsonStore;
use tieshop::localization::init_localization;
use tieshop::store::Store;
use tieshop::web::{self, WebState};

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // LOG_FORMAT=json for structured log shipping, text otherwise
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn open_store(config: &AppConfig) -> Result<Store> {
    let store = match &config.store {
        StoreConfig::Postgres { database_url } => {
            info!("Connecting to PostgreSQL");
            Store::Postgres(PgStore::connect(database_url.expose_secret()).await?)
        }
        StoreConfig::Json { path } => {
            info!(path = %path.display(), "Opening JSON store");
            Store::Json(JsonStore::open(path).await?)
        }
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file before the filter reads RUST_LOG
    let _ = dotenv::dotenv();
    init_tracing();

    info!("Starting Tie Shop bot");

    let config = AppConfig::from_env()?;
    init_localization()?;

    let store = open_store(&config).await?;
    if let Some(seed_path) = &config.catalog_seed_path {
        match seed_catalog_if_empty(&store, seed_path).await {
            Ok(0) => {}
            Ok(count) => info!(count, "Seeded catalog"),
            Err(e) => error!(error = %e, path = %seed_path.display(), "Catalog seeding failed"),
        }
    }
    tokio::fs::create_dir_all(&config.images_dir).await?;

    let bot = Bot::new(config.bot_token.expose_secret());
    let ctx = Arc::new(ShopContext::new(store, bot.clone(), &config));
    info!(
        store = ctx.store.backend_name(),
        admins = ctx.admins.len(),
        "Shop context ready"
    );

    if let Some(web_config) = &config.web {
        let state = WebState::new(Arc::clone(&ctx), web_config.admin_password.clone());
        let addr = web_config.socket_addr();
        tokio::spawn(async move {
            if let Err(e) = web::serve(state, addr).await {
                error!(error = %e, "Web server stopped");
            }
        });
    }

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<SessionMode>, SessionMode>()
                .endpoint(message_handler),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<SessionMode>, SessionMode>()
                .endpoint(callback_handler),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![InMemStorage::<SessionMode>::new(), ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

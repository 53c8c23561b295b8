//! Wicket - chat-to-wallet session link gateway

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wicket::{
    chat::{DirectMessenger, LogMessenger, RestMessenger},
    config::Args,
    db::MongoClient,
    notifier::ChangeNotifier,
    resolver::AddressResolver,
    server,
    store::LinkStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wicket={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Wicket - chat-to-wallet gateway");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Web origin: {}", args.web_origin);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Notifier: {}", if args.notifier_enabled { "enabled" } else { "disabled" });
    info!("======================================");

    // Connect to MongoDB (optional in dev mode, falls back to memory)
    let store = match connect_store(&args).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB unavailable (dev mode, using in-memory store): {}", e);
                Arc::new(LinkStore::memory())
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Direct-message delivery for the change notifier
    let messenger: Arc<dyn DirectMessenger> = match args.chat_bot_token.as_deref() {
        Some(token) => Arc::new(RestMessenger::new(&args.chat_api_url, token)),
        None => {
            warn!("No bot token configured, notifications are logged only");
            Arc::new(LogMessenger)
        }
    };

    // Start the standing change notifier
    let notifier_handle = if args.notifier_enabled {
        let resolver = Arc::new(AddressResolver::new(Arc::clone(&store)));
        let notifier = ChangeNotifier::new(Arc::clone(&store), resolver, messenger);
        match notifier.spawn().await {
            Ok(handle) => Some(handle),
            Err(e) => {
                if args.dev_mode {
                    warn!("Notifier failed to start (dev mode, continuing): {}", e);
                    None
                } else {
                    error!("Notifier failed to start: {}", e);
                    std::process::exit(1);
                }
            }
        }
    } else {
        info!("Change notifier disabled by configuration");
        None
    };

    // Run the server until failure or shutdown signal
    let state = Arc::new(server::AppState::new(args, store));
    tokio::select! {
        result = server::run(state) => {
            if let Err(e) = result {
                error!("Server error: {:?}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    // Stop the notifier before exiting
    if let Some(handle) = notifier_handle {
        handle.stop().await;
    }
    info!("Wicket shut down");

    Ok(())
}

/// Connect to MongoDB and open the link collections
async fn connect_store(args: &Args) -> wicket::Result<LinkStore> {
    let client = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
    LinkStore::mongo(&client).await
}

use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use allergo_core::config::{
    default_chat_id_from_env_value, notify_timeout_from_env_value,
    transition_policy_from_env_value,
};
use allergo_core::constants::{
    DEFAULT_BOT_USERNAME, DEFAULT_PUBLIC_BASE_URL, DEFAULT_TELEGRAM_API_BASE,
};
use allergo_core::{
    CoreConfig, InMemoryOrderStore, JsonFileOrderStore, OrderService, OrderStore, QrPngEncoder,
    RandomCodeGenerator, ReferralBuilder, TelegramConfig, TelegramNotifier,
};
use api_rest::{AppState, router};

/// Main entry point for the AllergoProba server
///
/// Resolves configuration from the environment once, wires the order service and serves the
/// REST API (with Swagger UI at `/swagger-ui`).
///
/// # Environment Variables
/// - `ALLERGO_REST_ADDR`: REST server address (default: "0.0.0.0:8001")
/// - `PUBLIC_BASE_URL`: base for patient-facing links in messages
/// - `TELEGRAM_BOT_USERNAME`: bot used in referral deep links (default: "allergoproba_bot")
/// - `TELEGRAM_BOT_TOKEN`: enables message delivery when set
/// - `TELEGRAM_DEFAULT_CHAT_ID`: fallback chat for patients without one
/// - `TELEGRAM_API_BASE`: Bot API base URL (default: "https://api.telegram.org")
/// - `NOTIFY_TIMEOUT_SECS`: per-message delivery timeout (default: 10)
/// - `TRANSITION_POLICY`: "permissive" (default) or "guarded"
/// - `ORDER_DATA_DIR`: keep orders as JSON files under this directory instead of in memory
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("allergo_run=info".parse()?)
                .add_directive("allergo_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("ALLERGO_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8001".into());

    let telegram = TelegramConfig::new(
        std::env::var("TELEGRAM_BOT_TOKEN").ok(),
        default_chat_id_from_env_value(std::env::var("TELEGRAM_DEFAULT_CHAT_ID").ok())?,
        &std::env::var("TELEGRAM_API_BASE")
            .unwrap_or_else(|_| DEFAULT_TELEGRAM_API_BASE.into()),
        notify_timeout_from_env_value(std::env::var("NOTIFY_TIMEOUT_SECS").ok())?,
    )?;
    if telegram.bot_token().is_none() {
        tracing::warn!("TELEGRAM_BOT_TOKEN is not set; patient notifications are disabled");
    }

    let bot_username =
        std::env::var("TELEGRAM_BOT_USERNAME").unwrap_or_else(|_| DEFAULT_BOT_USERNAME.into());
    let cfg = Arc::new(CoreConfig::new(
        &std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.into()),
        &bot_username,
        telegram,
        transition_policy_from_env_value(std::env::var("TRANSITION_POLICY").ok())?,
    )?);

    let store: Arc<dyn OrderStore> = match std::env::var("ORDER_DATA_DIR").ok() {
        Some(dir) if !dir.trim().is_empty() => {
            Arc::new(JsonFileOrderStore::open(&PathBuf::from(dir))?)
        }
        _ => {
            tracing::info!("ORDER_DATA_DIR is not set; orders are kept in memory");
            Arc::new(InMemoryOrderStore::new())
        }
    };

    let notifier = Arc::new(TelegramNotifier::new(cfg.telegram())?);
    let referrals = ReferralBuilder::new(cfg.bot_username(), Arc::new(QrPngEncoder));
    let order_service = OrderService::new(
        cfg.clone(),
        store,
        Arc::new(RandomCodeGenerator),
        referrals,
        notifier,
    );

    tracing::info!(
        policy = ?cfg.transition_policy(),
        "++ Starting AllergoProba REST on {}",
        rest_addr
    );

    let app = router(AppState { order_service });
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

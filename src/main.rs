use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hypernet_monitor::alerting::EvaluationService;
use hypernet_monitor::notifications::{AlertNotifier, ResendSender};
use hypernet_monitor::providers::{Inventory, MvpsClient, OneProviderClient, ProviderAdapter};
use hypernet_monitor::remote_config::{
    FirebaseAuth, FirebaseConfigStore, FirebaseDatabase, MobileConfigService, ServiceAccountKey, StoreError,
};
use hypernet_monitor::server::config::{FirebaseConfig, ServerConfig};
use hypernet_monitor::services::notes_service::NotesService;
use hypernet_monitor::web::{create_axum_router, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "monitor.log");
    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false).json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

fn build_inventory(config: &ServerConfig) -> Inventory {
    let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

    match &config.mvps {
        Some(mvps) => adapters.push(Arc::new(MvpsClient::new(
            &mvps.api_key,
            &mvps.api_user,
            mvps.base_url.as_deref(),
        ))),
        None => warn!("MVPS_API_KEY or MVPS_API_USER is not set, MVPS servers will not be listed."),
    }

    match &config.oneprovider {
        Some(op) => adapters.push(Arc::new(OneProviderClient::new(
            &op.api_key,
            &op.client_key,
            op.base_url.as_deref(),
            op.unlimited_ips.clone(),
        ))),
        None => warn!(
            "ONEPROVIDER_API_KEY or ONEPROVIDER_CLIENT_KEY is not set, OneProvider servers will not be listed."
        ),
    }

    Inventory::new(adapters)
}

fn firebase_auth(config: &FirebaseConfig) -> FirebaseAuth {
    match (&config.client_email, &config.private_key, &config.database_secret) {
        (Some(client_email), Some(private_key), _) => FirebaseAuth::ServiceAccount(ServiceAccountKey {
            client_email: client_email.clone(),
            private_key: private_key.clone(),
            token_uri: config.token_uri.clone(),
        }),
        (_, _, Some(secret)) => FirebaseAuth::DatabaseSecret(secret.clone()),
        _ => {
            warn!("No database credentials configured, mobile-config requests are unauthenticated.");
            FirebaseAuth::None
        }
    }
}

fn build_mobile_config(config: &FirebaseConfig) -> Result<Option<Arc<MobileConfigService>>, StoreError> {
    if !config.is_configured() {
        warn!("No mobile-config database configured, enrichment and config updates are disabled.");
        return Ok(None);
    }
    let auth = firebase_auth(config);
    let ios = config
        .ios_database_url
        .as_deref()
        .map(|url| FirebaseDatabase::new(url, auth.clone()))
        .transpose()?;
    let android = config
        .android_database_url
        .as_deref()
        .map(|url| FirebaseDatabase::new(url, auth.clone()))
        .transpose()?;
    let store = Arc::new(FirebaseConfigStore::new(ios, android));
    Ok(Some(Arc::new(MobileConfigService::new(store))))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for the shutdown signal.");
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Logging needs the configured log directory, so configuration errors go
    // to stderr.
    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting monitoring server.");

    let inventory = build_inventory(&config);
    info!(providers = ?inventory.providers(), "Provider inventory ready.");
    let mobile_config = build_mobile_config(&config.firebase)?;

    let notifier: Arc<dyn AlertNotifier> = Arc::new(ResendSender::new(
        config.email.resend_api_key.clone(),
        config.email.to.clone(),
        Some(config.email.from.clone()),
        Some(config.email.api_url.clone()),
    ));

    let evaluation_service = Arc::new(EvaluationService::new(
        inventory.clone(),
        mobile_config.clone(),
        notifier,
        config.alerts.sync_availability,
    ));

    if config.alerts.check_interval_seconds > 0 {
        tokio::spawn(
            evaluation_service
                .clone()
                .start_periodic_evaluation(config.alerts.check_interval_seconds),
        );
    } else {
        info!("Periodic alert evaluation disabled.");
    }

    let app = create_axum_router(AppState {
        auth: config.auth.clone(),
        inventory,
        mobile_config,
        evaluation_service,
        notes: NotesService::new(&config.data_dir),
    });

    let listener = tokio::net::TcpListener::bind(&config.http.listen_addr).await?;
    info!(addr = %config.http.listen_addr, "HTTP server listening.");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

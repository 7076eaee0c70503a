use clap::Parser;
use review_sentiment::{
    api::{build_router, AppState, HtmlRenderer, WebSettings},
    auth::{run_purge_loop, IdentityProvider, SessionStore, SupabaseAuthClient, UnconfiguredProvider},
    config::Config,
    ml::{ArtifactLoader, PredictionPipeline},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions are swept
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "review-sentiment")]
#[command(about = "Review sentiment web service", version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<String>,

    /// Directory that relative artifact paths are resolved against (default: the current working directory)
    #[arg(long, default_value = ".")]
    app_root: PathBuf,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load_from(args.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        let mut config = Config::default();
        config.apply_provider_env(|key| std::env::var(key).ok());
        config
    });
    if let Some(port) = args.port {
        config.server.http_port = port;
    }

    init_tracing(&config);

    tracing::info!("Starting Review Sentiment v{}", env!("CARGO_PKG_VERSION"));

    if config.auth.uses_insecure_secret() {
        tracing::warn!("⚠️  SECRET_KEY is not set, using the insecure development secret");
    }

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = review_sentiment::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    } else {
        tracing::info!("⚠️  Prometheus metrics disabled in configuration");
    }

    // Load the model once; serving continues in degraded mode if this fails
    let model = ArtifactLoader::from_config(&config.artifacts, &args.app_root).load_or_degrade();
    let pipeline = PredictionPipeline::new(model, config.analysis.pacing_delay());

    // Identity provider
    let identity: Arc<dyn IdentityProvider> = match (&config.auth.provider_url, &config.auth.provider_key) {
        (Some(url), Some(key)) if config.auth.provider_configured() => {
            let client = SupabaseAuthClient::new(url, key, config.auth.request_timeout_secs)?;
            tracing::info!(provider = %url, "✅ Identity provider configured");
            Arc::new(client)
        }
        _ => {
            tracing::warn!("⚠️  SUPABASE_URL / SUPABASE_KEY not set, signup and login are disabled");
            Arc::new(UnconfiguredProvider)
        }
    };

    // Session store and its sweeper
    let sessions = Arc::new(SessionStore::new(
        config.auth.session_secret.clone(),
        config.auth.session_ttl(),
    ));
    tokio::spawn(run_purge_loop(sessions.clone(), SESSION_PURGE_INTERVAL));
    tracing::info!("✅ Session store initialized");

    let views = Arc::new(HtmlRenderer::new()?);
    let state = AppState::new(
        pipeline,
        identity,
        sessions,
        views,
        WebSettings::from_config(&config),
    );
    let app = build_router(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Analyze: http://{}/analyze", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "review_sentiment={},tower_http={}",
            config.observability.log_level, config.observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

use std::sync::Arc;

use axum::http::Method;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use lifeos_onboarding::config::AppConfig;
use lifeos_onboarding::onboarding::{
    HostedProfileBackend, OnboardingRouteState, OnboardingSession, SessionDeps, onboarding_routes,
};
use lifeos_onboarding::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("Life OS onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding/status", config.port);
    match &config.backend {
        Some(backend) => eprintln!("   Hosted backend: {}", backend.base_url),
        None => eprintln!("   Hosted backend: disabled (local only)"),
    }

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);

    // ── Session ──────────────────────────────────────────────────────────
    let mut deps = SessionDeps::new(Arc::clone(&db)).with_config(config.onboarding.clone());
    if let Some(backend) = &config.backend {
        deps = deps.with_backend(Arc::new(HostedProfileBackend::new(backend)));
    }

    let mut session = OnboardingSession::open(deps).await;
    session.on_complete(|data| {
        tracing::info!(
            mode = %data.setup_mode,
            automations = data.automations.len(),
            "Onboarding finished"
        );
    });

    let state = OnboardingRouteState {
        session: Arc::new(Mutex::new(session)),
        db,
        local_user: config.onboarding.local_user.clone(),
        max_automations: config.onboarding.max_automations,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);

    let app = onboarding_routes(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Onboarding server started");
    axum::serve(listener, app).await?;

    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use talent_engine::{
    config::Config,
    database::{pool::create_pool, PgRecordStore},
    middleware::policy::RolePolicy,
    routes,
    services::outreach_service::OpenAiMessageGenerator,
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("talent_engine=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let pool = create_pool(&config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; triggered engagements will be marked failed");
    }

    let http_client = Client::builder()
        .timeout(config.engine.generation_timeout + Duration::from_secs(5))
        .build()?;
    let generator = OpenAiMessageGenerator::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        http_client,
    );

    let addr: SocketAddr = config.server_address.parse()?;
    let state = AppState::new(
        config,
        Arc::new(PgRecordStore::new(pool)),
        Arc::new(generator),
        Arc::new(RolePolicy),
    );
    let app = routes::router(state);

    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

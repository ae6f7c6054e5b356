use mock_server::MockConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let config = MockConfig {
        required_token: std::env::var("MOCK_REQUIRED_TOKEN").ok().filter(|t| !t.is_empty()),
        pending_polls: std::env::var("MOCK_PENDING_POLLS")
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0),
        bare_count: std::env::var("MOCK_BARE_COUNT").is_ok_and(|v| v == "1" || v == "true"),
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, auth = config.required_token.is_some(), "mock explorer listening");
    mock_server::run_with(listener, config).await
}

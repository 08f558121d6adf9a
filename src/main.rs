use deskplan::infrastructure::DEFAULT_ADDRESS;
use deskplan::{start_server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse address
    let address = std::env::var("DESKPLAN_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDRESS.to_string())
        .parse()?;

    // Configure and start server
    let config = ServerConfig::new(address);
    start_server(config).await?;

    Ok(())
}

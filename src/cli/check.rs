//! Check command implementation

use crate::cli::{load_config_with_overrides, CheckArgs};
use crate::client::BackendClient;
use colored::Colorize;

/// Ping the backend root.
pub async fn handle_check(client: &BackendClient) -> Result<String, Box<dyn std::error::Error>> {
    match client.ping().await {
        Ok(message) if message.is_empty() => Ok(format!(
            "{} Backend reachable at {}",
            "✓".green(),
            client.base_url()
        )),
        Ok(message) => Ok(format!(
            "{} Backend reachable at {}: {}",
            "✓".green(),
            client.base_url(),
            message
        )),
        Err(e) => Err(format!("Backend unreachable at {}: {}", client.base_url(), e).into()),
    }
}

pub async fn run_check(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args.backend)?;
    let client = BackendClient::new(&config.backend)?;
    println!("{}", handle_check(&client).await?);
    Ok(())
}

//! Logs command implementation

use crate::cli::output::{format_logs_json, format_logs_table};
use crate::cli::{load_config_with_overrides, LogsArgs};
use crate::client::BackendClient;

/// Fetch and format recent log records.
pub async fn handle_logs(
    args: &LogsArgs,
    client: &BackendClient,
    default_limit: u32,
) -> Result<String, Box<dyn std::error::Error>> {
    let limit = args.limit.unwrap_or(default_limit);
    let records = client.fetch_logs(limit).await?;

    if args.json {
        Ok(format_logs_json(&records)?)
    } else if records.is_empty() {
        Ok("No traffic logs recorded yet.".to_string())
    } else {
        Ok(format_logs_table(&records))
    }
}

pub async fn run_logs(args: LogsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args.backend)?;
    let client = BackendClient::new(&config.backend)?;
    println!(
        "{}",
        handle_logs(&args, &client, config.polling.logs_limit).await?
    );
    Ok(())
}

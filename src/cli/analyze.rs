//! Analyze command implementation

use crate::cli::output::{format_stats_json, format_stats_table};
use crate::cli::{load_config_with_overrides, AnalyzeArgs};
use crate::client::BackendClient;

/// Submit the image and format the result, writing the annotated image if requested.
pub async fn handle_analyze(
    args: &AnalyzeArgs,
    client: &BackendClient,
) -> Result<String, Box<dyn std::error::Error>> {
    let result = client.analyze_image(&args.image).await?;

    let mut output = if args.json {
        format_stats_json(&result.stats)?
    } else {
        format_stats_table(&result.stats)
    };

    if let Some(ref path) = args.output {
        let bytes = result.image.decode()?;
        tokio::fs::write(path, &bytes).await?;
        if !args.json {
            output.push_str(&format!(
                "\n✓ Annotated image written to {} ({} bytes)",
                path.display(),
                bytes.len()
            ));
        }
    }

    Ok(output)
}

pub async fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args.backend)?;
    let client = BackendClient::new(&config.backend)?;
    println!("{}", handle_analyze(&args, &client).await?);
    Ok(())
}

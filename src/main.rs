use clap::Parser;
use traffic_guard::cli::{
    analyze, check, handle_completions, handle_config_init, logs, upload, watch, Cli, Commands,
    ConfigCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Watch(args) => watch::run_watch(args).await,
        Commands::Analyze(args) => analyze::run_analyze(args).await,
        Commands::Upload(args) => upload::run_upload(args).await,
        Commands::Logs(args) => logs::run_logs(args).await,
        Commands::Check(args) => check::run_check(args).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

//! Watch command implementation
//!
//! Runs a [`DashboardController`] for the lifetime of the command, renders
//! whatever the active view publishes and reads control commands from stdin.

use crate::cli::output::{
    format_analytics_table, format_logs_table, format_slot_line, format_stats_table, SlotView,
};
use crate::cli::{load_config_with_overrides, WatchArgs};
use crate::config::TrafficGuardConfig;
use crate::dashboard::{DashboardController, DashboardWatch, Slot, SlotState, View};
use crate::logging::init_tracing;
use crate::stream::SourceRef;
use colored::Colorize;
use serde_json::json;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Minimum time between two renders; frames arrive much faster than a terminal can show.
const RENDER_INTERVAL: Duration = Duration::from_millis(250);

pub const HELP: &str = "commands: view <live|uploads|admin|analytics>, source <ref>, \
voice on|off, upload <path>, analyze <path>, help, quit";

/// A control command read from stdin.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchCommand {
    View(View),
    Source(SourceRef),
    Voice(bool),
    Upload(PathBuf),
    Analyze(PathBuf),
    Help,
    Quit,
}

impl FromStr for WatchCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (verb, rest) = match s.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (s, ""),
        };

        let require = |what: &str| {
            if rest.is_empty() {
                Err(format!("'{}' needs {}", verb, what))
            } else {
                Ok(rest)
            }
        };

        match verb.to_lowercase().as_str() {
            "view" => require("a view name")?.parse().map(WatchCommand::View),
            "source" => Ok(WatchCommand::Source(SourceRef::new(require("a source")?))),
            "voice" => match require("on or off")?.to_lowercase().as_str() {
                "on" | "true" | "1" => Ok(WatchCommand::Voice(true)),
                "off" | "false" | "0" => Ok(WatchCommand::Voice(false)),
                other => Err(format!("Invalid voice setting: {} (expected on or off)", other)),
            },
            "upload" => Ok(WatchCommand::Upload(PathBuf::from(require("a file path")?))),
            "analyze" => Ok(WatchCommand::Analyze(PathBuf::from(require("a file path")?))),
            "help" | "?" => Ok(WatchCommand::Help),
            "quit" | "exit" | "q" => Ok(WatchCommand::Quit),
            _ => Err(format!("Unknown command: {}. {}", verb, HELP)),
        }
    }
}

/// Apply watch-specific flags on top of the loaded configuration.
pub fn apply_watch_overrides(
    mut config: TrafficGuardConfig,
    args: &WatchArgs,
) -> Result<TrafficGuardConfig, Box<dyn std::error::Error>> {
    if let Some(view) = args.view {
        config.dashboard.default_view = view;
    }
    if let Some(ref source) = args.source {
        config.dashboard.default_source = source.clone();
    }
    if args.voice {
        config.alerts.voice_enabled = true;
    }
    config.validate()?;
    Ok(config)
}

pub async fn run_watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args.backend)?;
    let config = apply_watch_overrides(config, &args)?;

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    tracing::info!(
        backend = %config.backend.url,
        view = %config.dashboard.default_view,
        source = %config.dashboard.default_source,
        "Starting traffic-guard watch"
    );

    let controller = Arc::new(DashboardController::from_config(&config)?);
    controller.start().await;

    let cancel = CancellationToken::new();
    let render_task = tokio::spawn(render_loop(
        controller.subscribe(),
        args.json,
        cancel.clone(),
    ));

    if !args.json {
        eprintln!("{}", HELP.dimmed());
    }

    let result = command_loop(&controller).await;

    controller.dispose().await;
    cancel.cancel();
    if let Err(e) = render_task.await {
        tracing::warn!(error = %e, "Render task ended abnormally");
    }

    result
}

/// Read commands until `quit` or Ctrl-C.
async fn command_loop(controller: &DashboardController) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Interrupted, shutting down");
                return Ok(());
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<WatchCommand>() {
                    Ok(WatchCommand::Quit) => return Ok(()),
                    Ok(command) => {
                        if execute_until(controller, command, interrupted()).await {
                            tracing::info!("Interrupted during command, shutting down");
                            return Ok(());
                        }
                    }
                    Err(e) => eprintln!("{}", e.yellow()),
                },
                // Keep rendering until Ctrl-C when stdin is not interactive
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
        }
    }
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Run `command` unless `interrupt` resolves first. Returns true if interrupted.
async fn execute_until<I>(
    controller: &DashboardController,
    command: WatchCommand,
    interrupt: I,
) -> bool
where
    I: Future<Output = ()>,
{
    tokio::select! {
        _ = interrupt => true,
        _ = execute(controller, command) => false,
    }
}

async fn execute(controller: &DashboardController, command: WatchCommand) {
    match command {
        WatchCommand::View(view) => controller.set_active_view(view).await,
        WatchCommand::Source(source) => controller.set_live_source(source).await,
        WatchCommand::Voice(enabled) => controller.set_voice_enabled(enabled),
        WatchCommand::Upload(path) => match controller.upload_video(&path).await {
            Ok(source) => eprintln!("{} Uploaded {} as {}", "✓".green(), path.display(), source),
            Err(e) => eprintln!("{} Upload failed: {}", "✗".red(), e),
        },
        WatchCommand::Analyze(path) => {
            if let Err(e) = controller.analyze_image(&path).await {
                eprintln!("{} Analysis failed: {}", "✗".red(), e);
            }
        }
        WatchCommand::Help => eprintln!("{}", HELP),
        WatchCommand::Quit => {}
    }
}

async fn render_loop(mut watch: DashboardWatch, json: bool, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(RENDER_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut force = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                for block in render_changes(&mut watch, json, force) {
                    println!("{}", block);
                }
                force = false;
            }
        }
    }
}

fn take_changed<T: Clone>(rx: &mut watch::Receiver<T>, force: bool) -> Option<T> {
    if force || rx.has_changed().unwrap_or(false) {
        Some(rx.borrow_and_update().clone())
    } else {
        None
    }
}

/// Render what changed in the active view since the last call.
///
/// With `force`, or after a view switch, the whole view is rendered.
pub fn render_changes(watch: &mut DashboardWatch, json: bool, force: bool) -> Vec<String> {
    let view_changed = force || watch.view.has_changed().unwrap_or(false);
    let view = *watch.view.borrow_and_update();
    let mut out = Vec::new();

    if view_changed && !json {
        out.push(format!("── {} ──", view.as_str().to_uppercase()).bold().to_string());
    }

    match view {
        View::Live => {
            if let Some(state) = take_changed(&mut watch.live, view_changed) {
                out.push(render_slot(view, Slot::Live, &state, json));
            }
        }
        View::Uploads => {
            if let Some(Some(result)) = take_changed(&mut watch.image_result, view_changed) {
                out.push(if json {
                    json!({"view": view, "image_result": result.stats}).to_string()
                } else {
                    format!("Image analysis\n{}", format_stats_table(&result.stats))
                });
            }
            if let Some(state) = take_changed(&mut watch.upload, view_changed) {
                if state.source.is_some() {
                    out.push(render_slot(view, Slot::Upload, &state, json));
                } else if !json {
                    out.push("No video uploaded yet.".dimmed().to_string());
                }
            }
        }
        View::Admin => {
            if let Some(records) = take_changed(&mut watch.logs, view_changed) {
                out.push(if json {
                    json!({"view": view, "logs": records}).to_string()
                } else {
                    format_logs_table(&records)
                });
            }
        }
        View::Analytics => {
            if let Some(Some(analytics)) = take_changed(&mut watch.analytics, view_changed) {
                out.push(if json {
                    json!({
                        "view": view,
                        "summary": analytics.summary,
                        "total": analytics.total(),
                        "trends": analytics.trends,
                    })
                    .to_string()
                } else {
                    format_analytics_table(&analytics)
                });
            }
        }
    }

    out
}

fn render_slot(view: View, slot: Slot, state: &SlotState, json: bool) -> String {
    if json {
        serde_json::to_string(&SlotView::new(view, slot.name(), state))
            .unwrap_or_else(|e| json!({"error": e.to_string()}).to_string())
    } else {
        format_slot_line(slot.name(), state)
    }
}

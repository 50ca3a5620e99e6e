//! Output formatting helpers for CLI commands

use crate::client::{DailyAnalytics, LogRecord};
use crate::dashboard::{SlotState, View};
use crate::stream::{Category, ConnectionStatus, Density, SignalState, StatsSnapshot};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;

/// View model for one slot's published state, without the frame payload.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub view: View,
    pub slot: &'static str,
    pub source: Option<String>,
    pub status: ConnectionStatus,
    pub stats: Option<StatsSnapshot>,
    /// Length of the base64 frame, 0 before the first frame
    pub frame_bytes: usize,
}

impl SlotView {
    pub fn new(view: View, slot: &'static str, state: &SlotState) -> Self {
        Self {
            view,
            slot,
            source: state.source.as_ref().map(|s| s.to_string()),
            status: state.status,
            stats: state.stats().cloned(),
            frame_bytes: state.frame().map(|f| f.encoded_len()).unwrap_or(0),
        }
    }
}

pub fn density_colored(density: Density) -> String {
    match density {
        Density::Low => density.as_str().green().to_string(),
        Density::Moderate => density.as_str().yellow().to_string(),
        Density::High => density.as_str().red().bold().to_string(),
    }
}

pub fn signal_colored(signal: SignalState) -> String {
    match signal {
        SignalState::Green => "GREEN".green().to_string(),
        SignalState::Red => "RED".red().to_string(),
    }
}

pub fn status_colored(status: ConnectionStatus) -> String {
    match status {
        ConnectionStatus::Connecting => "connecting".yellow().to_string(),
        ConnectionStatus::Open => "open".green().to_string(),
        ConnectionStatus::Closed => "closed".dimmed().to_string(),
    }
}

/// Get status icon for a connection status
pub fn status_icon(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connecting => "…",
        ConnectionStatus::Open => "●",
        ConnectionStatus::Closed => "○",
    }
}

/// One-line summary of a slot, for continuous rendering.
pub fn format_slot_line(slot: &str, state: &SlotState) -> String {
    let source = state
        .source
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{} [{} {}] {}",
        status_icon(state.status),
        slot,
        source,
        status_colored(state.status)
    );

    if let Some(stats) = state.stats() {
        let counts: Vec<String> = Category::ALL
            .iter()
            .map(|c| format!("{} {}", c.label(), stats.count(*c)))
            .collect();
        line.push_str(&format!(
            " | total {} | {} | signal {} | {}",
            stats.total_count,
            density_colored(stats.density),
            signal_colored(stats.signal_state),
            counts.join(" ")
        ));
        if let Some(alert) = stats.active_alert() {
            line.push_str(&format!(" | {}", format!("ALERT: {}", alert).red().bold()));
        }
    }

    line
}

/// Format one snapshot as a two-column table
pub fn format_stats_table(stats: &StatsSnapshot) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Metric", "Value"]);

    table.add_row(vec![Cell::new("Total"), Cell::new(stats.total_count)]);
    table.add_row(vec![
        Cell::new("Density"),
        Cell::new(density_colored(stats.density)),
    ]);
    table.add_row(vec![
        Cell::new("Signal"),
        Cell::new(signal_colored(stats.signal_state)),
    ]);
    for category in Category::ALL {
        table.add_row(vec![
            Cell::new(category.label()),
            Cell::new(stats.count(category)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Alert"),
        Cell::new(stats.active_alert().unwrap_or("-")),
    ]);

    table.to_string()
}

/// Format stats as JSON
pub fn format_stats_json(stats: &StatsSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(stats)
}

/// Format log records as a table, in the order received
pub fn format_logs_table(records: &[LogRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Time", "Density", "Vehicles", "Alert"]);

    for record in records {
        let time = record
            .parsed_timestamp()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| record.timestamp.clone());
        let alert = match record.alert_type.as_deref() {
            Some(alert) if !alert.is_empty() => alert.red().to_string(),
            _ => "-".to_string(),
        };

        table.add_row(vec![
            Cell::new(record.id),
            Cell::new(time),
            Cell::new(record.density_status.as_deref().unwrap_or("-")),
            Cell::new(record.total_vehicles),
            Cell::new(alert),
        ]);
    }

    table.to_string()
}

/// Format log records as JSON
pub fn format_logs_json(records: &[LogRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "logs": records
    }))
}

/// Format the daily aggregate: a summary table, then hourly trends
pub fn format_analytics_table(analytics: &DailyAnalytics) -> String {
    let mut summary = Table::new();
    summary.load_preset(UTF8_FULL);
    summary.set_content_arrangement(ContentArrangement::Dynamic);
    summary.set_header(vec!["Category", "Today"]);
    for (category, count) in &analytics.summary {
        summary.add_row(vec![Cell::new(category), Cell::new(count)]);
    }
    summary.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(analytics.total()),
    ]);

    if analytics.trends.is_empty() {
        return summary.to_string();
    }

    // Union of categories across all buckets, so columns line up
    let columns: Vec<&String> = analytics
        .trends
        .iter()
        .flat_map(|t| t.counts.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut trends = Table::new();
    trends.load_preset(UTF8_FULL);
    trends.set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec!["Hour".to_string()];
    header.extend(columns.iter().map(|c| c.to_string()));
    trends.set_header(header);
    for point in &analytics.trends {
        let mut row = vec![Cell::new(&point.hour)];
        row.extend(
            columns
                .iter()
                .map(|c| Cell::new(point.counts.get(*c).copied().unwrap_or(0))),
        );
        trends.add_row(row);
    }

    format!("{}\n{}", summary, trends)
}

/// Format the daily aggregate as JSON
pub fn format_analytics_json(analytics: &DailyAnalytics) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "summary": analytics.summary,
        "total": analytics.total(),
        "trends": analytics.trends,
    }))
}

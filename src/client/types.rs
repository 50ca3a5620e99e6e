//! Records exchanged with the request/response endpoints.

use crate::stream::{FramePayload, StatsSnapshot};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One persisted traffic log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: i64,
    pub timestamp: String,
    #[serde(default)]
    pub density_status: Option<String>,
    #[serde(default)]
    pub total_vehicles: i64,
    #[serde(default)]
    pub alert_type: Option<String>,
    #[serde(default)]
    pub vehicle_breakdown: BTreeMap<String, i64>,
}

impl LogRecord {
    /// Parse the timestamp as RFC 3339, or as a naive ISO-8601 value in UTC.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// One hourly bucket of the daily aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub hour: String,
    #[serde(flatten)]
    pub counts: BTreeMap<String, i64>,
}

/// Response of the daily analytics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DailyAnalytics {
    #[serde(default)]
    pub summary: BTreeMap<String, i64>,
    #[serde(default)]
    pub trends: Vec<TrendPoint>,
}

impl DailyAnalytics {
    pub fn total(&self) -> i64 {
        self.summary.values().sum()
    }
}

/// Response of the image analysis endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub image: FramePayload,
    pub stats: StatsSnapshot,
}

/// Response of the video upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub filename: String,
    #[serde(default)]
    pub message: Option<String>,
}

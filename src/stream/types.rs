//! Wire types shared by the stream and request/response endpoints.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a live or replay video origin (camera index, stream URI or
/// uploaded filename).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(String);

impl SourceRef {
    /// Source name the backend maps to its local camera.
    pub const WEBCAM: &'static str = "webcam";

    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn webcam() -> Self {
        Self::new(Self::WEBCAM)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Base64-encoded still image as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FramePayload(String);

impl FramePayload {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }

    /// Length of the encoded payload in bytes.
    pub fn encoded_len(&self) -> usize {
        self.0.len()
    }

    /// Decode the payload into raw image bytes (JPEG from the reference backend).
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.0.as_bytes())
    }
}

/// Traffic density classification, ordered from least to most congested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Density {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(
        alias = "moderate",
        alias = "MODERATE",
        alias = "Medium",
        alias = "medium",
        alias = "MEDIUM"
    )]
    Moderate,
    #[serde(alias = "high", alias = "HIGH")]
    High,
}

impl Density {
    pub fn as_str(&self) -> &'static str {
        match self {
            Density::Low => "LOW",
            Density::Moderate => "MODERATE",
            Density::High => "HIGH",
        }
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the simulated traffic signal reported alongside each snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalState {
    #[default]
    Green,
    Red,
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalState::Green => f.write_str("GREEN"),
            SignalState::Red => f.write_str("RED"),
        }
    }
}

/// Object categories the detector reports counts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Car,
    Bike,
    Bus,
    Truck,
    Person,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Car,
        Category::Bike,
        Category::Bus,
        Category::Truck,
        Category::Person,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Car => "Car",
            Category::Bike => "Bike",
            Category::Bus => "Bus",
            Category::Truck => "Truck",
            Category::Person => "Person",
        }
    }
}

/// One reported measurement from the backend.
///
/// `breakdown` and `total_count` are reported independently upstream; their
/// sum is never cross-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(rename = "total_vehicles", alias = "total_count")]
    pub total_count: u64,
    pub density: Density,
    #[serde(default)]
    pub breakdown: BTreeMap<String, u64>,
    #[serde(default)]
    pub alert: Option<String>,
    #[serde(default)]
    pub signal_state: SignalState,
}

impl StatsSnapshot {
    /// Count reported for a known category, zero when absent.
    pub fn count(&self, category: Category) -> u64 {
        self.breakdown.get(category.label()).copied().unwrap_or(0)
    }

    /// Alert text, treating an empty string as no alert.
    pub fn active_alert(&self) -> Option<&str> {
        self.alert.as_deref().filter(|a| !a.is_empty())
    }
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self {
            total_count: 0,
            density: Density::Low,
            breakdown: Category::ALL
                .iter()
                .map(|c| (c.label().to_string(), 0))
                .collect(),
            alert: None,
            signal_state: SignalState::Green,
        }
    }
}

/// A frame and the stats that arrived with it. Always delivered together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUpdate {
    #[serde(rename = "image")]
    pub frame: FramePayload,
    pub stats: StatsSnapshot,
}

/// Connectivity of a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => f.write_str("connecting"),
            ConnectionStatus::Open => f.write_str("open"),
            ConnectionStatus::Closed => f.write_str("closed"),
        }
    }
}

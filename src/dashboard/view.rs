//! Views, polled resources and video slots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named dashboard views. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Live monitor: live slot stream and its stats
    #[default]
    Live,
    /// Upload analysis: image analysis results and the upload preview slot
    Uploads,
    /// Admin: violation log table
    Admin,
    /// Daily aggregate counts and hourly trends
    Analytics,
}

impl View {
    pub const ALL: [View; 4] = [View::Live, View::Uploads, View::Admin, View::Analytics];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Live => "live",
            View::Uploads => "uploads",
            View::Admin => "admin",
            View::Analytics => "analytics",
        }
    }

    /// Resources polled while this view is active.
    pub fn polled_resources(&self) -> &'static [Resource] {
        match self {
            View::Admin => &[Resource::Logs],
            View::Analytics => &[Resource::Analytics],
            View::Live | View::Uploads => &[],
        }
    }

    /// Video slot displayed by this view.
    pub fn slot(&self) -> Option<Slot> {
        match self {
            View::Live => Some(Slot::Live),
            View::Uploads => Some(Slot::Upload),
            View::Admin | View::Analytics => None,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(View::Live),
            "uploads" | "upload" => Ok(View::Uploads),
            "admin" | "logs" => Ok(View::Admin),
            "analytics" => Ok(View::Analytics),
            _ => Err(format!(
                "Invalid view: {} (expected live, uploads, admin or analytics)",
                s
            )),
        }
    }
}

/// Backend resources refreshed by background polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Logs,
    Analytics,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Logs, Resource::Analytics];

    /// Scheduler key.
    pub fn id(&self) -> &'static str {
        match self {
            Resource::Logs => "logs",
            Resource::Analytics => "analytics",
        }
    }
}

/// Logical video display positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Live,
    Upload,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Slot::Live => "live",
            Slot::Upload => "upload",
        }
    }
}

//! Initial dashboard state

use crate::dashboard::View;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// View shown at startup
    pub default_view: View,
    /// Live source bound at startup
    pub default_source: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_view: View::Live,
            default_source: crate::stream::SourceRef::WEBCAM.to_string(),
        }
    }
}

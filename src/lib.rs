//! traffic-guard - client for an AI traffic-sensing backend
//!
//! This library consumes the backend's live analysis stream, announces alerts,
//! polls logs and daily analytics for the views that show them, and exposes the
//! result as observable dashboard state.

pub mod alert;
pub mod cli;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod logging;
pub mod polling;
pub mod stream;

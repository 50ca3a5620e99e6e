//! Tracing subscriber setup
//!
//! Builds the filter from [`LoggingConfig`] and installs a pretty, compact or
//! JSON formatter. `RUST_LOG`, when set, takes precedence over the config.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build filter directives string from LoggingConfig
///
/// Produces the base level followed by one `traffic_guard::<component>=<level>`
/// directive per configured component, sorted by component name.
///
/// # Examples
///
/// ```
/// use traffic_guard::config::LoggingConfig;
/// use traffic_guard::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     component_levels: Some(HashMap::from([("stream".to_string(), "debug".to_string())])),
///     ..LoggingConfig::default()
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,traffic_guard::stream=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",traffic_guard::{}={}", component, level));
        }
    }

    filter_str
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // Logs go to stderr so they never interleave with rendered output on stdout.
    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_filter_without_components() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(build_filter_directives(&config), "warn");
    }

    #[test]
    fn test_filter_components_sorted() {
        let config = LoggingConfig {
            level: "info".to_string(),
            component_levels: Some(HashMap::from([
                ("stream".to_string(), "trace".to_string()),
                ("polling".to_string(), "warn".to_string()),
            ])),
            ..LoggingConfig::default()
        };
        assert_eq!(
            build_filter_directives(&config),
            "info,traffic_guard::polling=warn,traffic_guard::stream=trace"
        );
    }

    #[test]
    fn test_filter_directives_parse() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            component_levels: Some(HashMap::from([(
                "dashboard".to_string(),
                "info".to_string(),
            )])),
            ..LoggingConfig::default()
        };
        let filter = build_filter_directives(&config);
        assert!(EnvFilter::try_new(&filter).is_ok());
    }
}

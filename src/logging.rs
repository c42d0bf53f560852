//! Tracing subscriber setup
//!
//! Logs go to stderr through a `fmt` layer and, when the graph file names
//! one, to a log file through a non-blocking `tracing-appender` writer.
//! `RUST_LOG` overrides the configured filter.

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter: `RUST_LOG` if set and valid, else the configured one.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.filter_or_default()))
}

/// Install the global subscriber.
///
/// Returns the file writer's guard, which must be kept alive for buffered
/// lines to be flushed. A second call leaves the first subscriber in place.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().unwrap_or(path.as_os_str());
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    match installed {
        Ok(()) => {
            if let Some(path) = &config.file {
                tracing::debug!("Logging to {:?}", path);
            }
            guard
        }
        Err(_) => {
            tracing::debug!("Global subscriber already installed, keeping it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_init_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            filter: Some("debug".to_string()),
            file: Some(dir.path().join("graph.log")),
        };

        let first = init(&config);
        let second = init(&config);
        assert!(second.is_none());

        tracing::info!("logged after init");
        drop(first);
    }

    #[test]
    #[serial]
    fn test_env_filter_prefers_rust_log() {
        std::env::set_var("RUST_LOG", "warn");
        let filter = env_filter(&LoggingConfig::default());
        std::env::remove_var("RUST_LOG");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    #[serial]
    fn test_env_filter_default() {
        std::env::remove_var("RUST_LOG");
        let filter = env_filter(&LoggingConfig::default());
        let rendered = filter.to_string();
        assert!(rendered.contains("plugin_graph=debug"));
        assert!(rendered.contains("info"));
    }
}

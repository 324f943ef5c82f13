/*!
 * Logging Module
 * Subscriber setup and request logging middleware
 */
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::SiteConfig;

/// Writer guards; logs stop flushing once these are dropped.
pub type LogGuards = Vec<WorkerGuard>;

fn default_filter(log_level: &str) -> String {
    format!("portfolio_cms={},tower_http=debug,axum=debug,sqlx=warn", log_level)
}

/// Initialize the logging system.
///
/// Production writes JSON to the console, a daily `app.log` and an
/// errors-only `error.log`. Development pretty-prints to the console and
/// keeps a plain-text `app.log`.
pub fn init(config: &SiteConfig) -> LogGuards {
    let is_production = config.is_production();
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

    std::fs::create_dir_all(&log_dir).ok();

    let (file_writer, file_guard) = non_blocking(rolling::daily(&log_dir, "app.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());
    let mut guards = vec![file_guard, console_guard];

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if is_production { "info" } else { "debug" }.to_string()
    });
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&log_level)));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if is_production {
        let (error_writer, error_guard) = non_blocking(rolling::daily(&log_dir, "error.log"));
        guards.push(error_guard);

        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        let error_layer = fmt::layer()
            .json()
            .with_writer(error_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        subscriber.with(file_layer).with(console_layer).init();
    }

    tracing::info!(
        environment = %config.environment,
        log_dir = %log_dir,
        "Logging initialized"
    );
    guards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_targets_this_crate() {
        let filter = default_filter("info");
        assert!(filter.starts_with("portfolio_cms=info"));
        assert!(EnvFilter::try_new(filter).is_ok());
    }
}

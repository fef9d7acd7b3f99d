// src/logging.rs
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Default filter when RUST_LOG is not set
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "info,tennislens=debug,reqwest=info,hyper=info"
    } else {
        "warn,tennislens=info,reqwest=warn,hyper=warn"
    }
}

// Logs go to stderr so they do not interleave with the progress display on stdout
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level().to_string());

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;

    tracing::debug!("🎾 TennisLens client {}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Log level: {}", log_level);
    Ok(())
}

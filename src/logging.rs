use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

/// Console logging always; daily-rotated JSON files when enabled. Safe to
/// call more than once (tests re-init freely).
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let console = fmt::layer().compact().with_target(true);
    let base = tracing_subscriber::registry().with(filter).with(console);

    let result = if config.enable_file_logs {
        let appender = rolling::daily(&config.log_dir, "vocab-backend.log");
        let file = fmt::layer().with_writer(appender).with_ansi(false).json();
        base.with(file).try_init()
    } else {
        base.try_init()
    };

    if let Err(e) = result {
        // A global subscriber from an earlier call is expected; any other
        // failure at startup is a configuration bug.
        if !e.to_string().contains("already been set") {
            panic!("Failed to initialize tracing: {e}");
        }
    }
}

//! Log subscriber setup

use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Output format for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// JSON when `LOG_FORMAT=json`, text otherwise
    pub fn from_env() -> Self {
        if std::env::var("LOG_FORMAT")
            .map(|v| v == "json")
            .unwrap_or(false)
        {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// `RUST_LOG` wins when set; otherwise info, or debug with the debug flag.
pub fn log_filter(debug: bool) -> EnvFilter {
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Build a subscriber writing to `writer`. Colors are only used for text output.
pub fn subscriber<W>(
    debug: bool,
    format: LogFormat,
    ansi: bool,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(debug))
        .with_ansi(ansi && format == LogFormat::Text)
        .with_writer(writer);

    match format {
        LogFormat::Json => Box::new(builder.json().finish()),
        LogFormat::Text => Box::new(builder.finish()),
    }
}

/// Install the process-wide subscriber writing to stderr.
pub fn init(debug: bool) {
    let ansi = std::io::stderr().is_terminal();
    let subscriber = subscriber(debug, LogFormat::from_env(), ansi, std::io::stderr);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("A global log subscriber was already installed");
    }
}

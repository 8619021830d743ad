use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Output always goes to stderr so stdout
/// stays free for the stdio transport.
pub fn init(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if let Err(err) = result {
        eprintln!("Logging already initialized: {}", err);
    }
}

use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::util::SubscriberInitExt;

/// Map a log level name (`"DEBUG"`, `"info"`, `"warning"`, ...) onto a
/// tracing level. Unknown or empty names fall back to INFO.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => Level::WARN,
        "critical" | "fatal" => Level::ERROR,
        other => other.parse().unwrap_or(Level::INFO),
    }
}

/// Install a fmt subscriber as the global default.
///
/// Returns `false` if a subscriber was already installed; the existing one is
/// left in place.
pub fn init_tracing(level: &str) -> bool {
    FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .finish()
        .try_init()
        .is_ok()
}

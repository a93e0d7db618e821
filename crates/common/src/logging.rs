//! Logging utilities for the VRRP transcoding crates.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter applied when `RUST_LOG` is unset. The transcoders log every parse
/// fallback and sanitize decision at debug, so keep that crate at debug and
/// everything else at info.
pub const DEFAULT_DIRECTIVES: &str = "info,keepalived=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Initialize tracing with plain text formatting.
///
/// The `RUST_LOG` environment variable overrides [`DEFAULT_DIRECTIVES`].
pub fn init() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter())
        .init();
}

/// Initialize tracing with JSON formatting (useful for structured logging).
pub fn init_json() {
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(env_filter())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        // EnvFilter::new silently drops malformed directives; try_new does
        // not, so a typo in the constant fails here.
        EnvFilter::try_new(DEFAULT_DIRECTIVES).expect("default directives must parse");
        assert!(!env_filter().to_string().is_empty());
    }
}

//! Common error types for the VRRP transcoding crates.

use std::fmt;

/// A specialized Result type for VRRP translation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for VRRP translation operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The interface tree violates a structural invariant, e.g. a vif
    /// interface nested directly under another interface.
    #[error("Structural error: {0}")]
    Structural(String),

    /// A required bracketed block in daemon text is missing or truncated.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Create a new structural error.
    pub fn structural(msg: impl fmt::Display) -> Self {
        Error::Structural(msg.to_string())
    }

    /// Create a new parse error.
    pub fn parse(msg: impl fmt::Display) -> Self {
        Error::Parse(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctor_helpers_display() {
        assert_eq!(Error::parse("bad line").to_string(), "Parse error: bad line");
        assert_eq!(
            Error::structural("nested vif").to_string(),
            "Structural error: nested vif"
        );
    }
}

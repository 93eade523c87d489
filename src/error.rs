/// Error taxonomy for resource loading and invariant checking.
///
/// Per the error-handling policy: resource decode failures are raised
/// synchronously at load time and abort the level load. Self-correcting
/// runtime conditions (player falling out of the map) are modeled as
/// domain events, never as errors — see `sim::event::GameEvent`.

use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum RigelError {
    /// Header/size/signature mismatch in a map, tileset, or audio file.
    #[error("malformed resource: {0}")]
    MalformedResource(String),

    /// Unknown codec/chunk type in an audio/movie asset.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A named file was not found in the resource package.
    #[error("missing asset: {0}")]
    MissingAsset(String),

    /// A detected precondition failure (out-of-range tile index, unknown
    /// actor ID used for sprite lookup, etc).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, RigelError>;

/// Convenience constructor used throughout the level loader; keeps call
/// sites from repeating `RigelError::MalformedMap(format!(...))`.
impl RigelError {
    pub fn malformed(msg: impl fmt::Display) -> Self {
        RigelError::MalformedResource(msg.to_string())
    }

    pub fn invariant(msg: impl fmt::Display) -> Self {
        RigelError::InvariantViolation(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_readable() {
        let e = RigelError::malformed("width 40 is not a valid level width");
        assert!(e.to_string().contains("malformed resource"));
        assert!(e.to_string().contains("width 40"));
    }
}

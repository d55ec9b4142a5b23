//! Gammon Engine error type.

use std::error;
use std::fmt::{self, Display};
use std::result;

/// Gammon Engine generic result type.
pub type Result<T> = result::Result<T, Error>;

/// A list specifying general errors for Gammon engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Position ID has the wrong length or a character outside the base64 alphabet.
    PositionIdMalformed,
    /// Position ID decodes to a board that cannot occur in a game.
    PositionIdIllegal,
    /// Old style key has chequers past the last slot of the second side.
    OldKeyOverrun,
    /// XG board string malformed.
    XgMalformed,
    /// Match ID has the wrong length or a character outside the base64 alphabet.
    MatchIdMalformed,
    /// Match ID decodes to dice, scores or a state outside their ranges.
    MatchIdOutOfRange,

    /// Variation parse string malformed.
    ParseVariationMalformed,
    /// Side parse string malformed.
    ParseSideMalformed,

    /// Requested evaluation cache size is zero or above the 2^31 ceiling.
    CacheSizeInvalid,
    /// Backing memory for the evaluation cache could not be allocated.
    CacheAllocation,
    /// Engine's evaluation cache is being referenced from another thread.
    EngineCacheInUse,

    /// The evaluator failed to produce outputs for a position.
    EvaluationFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PositionIdMalformed => "position id malformed",
            ErrorKind::PositionIdIllegal => "position id illegal",
            ErrorKind::OldKeyOverrun => "old key overrun",
            ErrorKind::XgMalformed => "xg malformed",
            ErrorKind::MatchIdMalformed => "match id malformed",
            ErrorKind::MatchIdOutOfRange => "match id out of range",

            ErrorKind::ParseVariationMalformed => "parse variation malformed",
            ErrorKind::ParseSideMalformed => "parse side malformed",

            ErrorKind::CacheSizeInvalid => "cache size invalid",
            ErrorKind::CacheAllocation => "cache allocation",
            ErrorKind::EngineCacheInUse => "engine cache in use",

            ErrorKind::EvaluationFailed => "evaluation failed",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The primary and general error type for the Gammon Engine.
#[derive(Debug)]
pub enum Error {
    Simple(ErrorKind),
    Message(ErrorKind, String),
    Custom(ErrorKind, Box<dyn error::Error + Send + Sync>),
}

impl Error {
    pub fn new<E>(error_kind: ErrorKind, inner_error: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::Custom(error_kind, inner_error.into())
    }

    /// Returns the kind of this error, regardless of any attached context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Simple(error_kind)
            | Error::Message(error_kind, _)
            | Error::Custom(error_kind, _) => *error_kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Simple(error_kind) => {
                write!(f, "{error_kind}")
            }
            Error::Message(error_kind, string) => {
                write!(f, "{error_kind}: {string}")
            }
            Error::Custom(error_kind, ref box_error) => {
                write!(f, "{error_kind}, error: {}", *box_error)
            }
        }
    }
}

impl error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(error_kind: ErrorKind) -> Self {
        Self::Simple(error_kind)
    }
}

impl<S: ToString> From<(ErrorKind, S)> for Error {
    fn from((error_kind, stringable): (ErrorKind, S)) -> Self {
        Self::Message(error_kind, stringable.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_survives_context() {
        let simple = Error::from(ErrorKind::OldKeyOverrun);
        let message = Error::from((ErrorKind::XgMalformed, "column 3"));
        let custom = Error::new(ErrorKind::EvaluationFailed, "net missing");

        assert_eq!(simple.kind(), ErrorKind::OldKeyOverrun);
        assert_eq!(message.kind(), ErrorKind::XgMalformed);
        assert_eq!(custom.kind(), ErrorKind::EvaluationFailed);
        assert_eq!(message.to_string(), "xg malformed: column 3");
    }
}

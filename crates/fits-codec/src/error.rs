use thiserror::Error;

use crate::precision::ElementKind;

/// All errors produced by the scanner, the data-unit codec and the locator.
///
/// Every variant is terminal: a malformed stream cannot be fixed by retrying,
/// and out-of-bounds requests are reported rather than clamped.
#[derive(Debug, Error)]
pub enum Error {
    /// The first card is not the structural marker required at this position.
    #[error("not a FITS stream: {0}")]
    NotFitsFormat(&'static str),
    /// The header ended early or is missing a structural keyword.
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    /// A sub-range lies outside the axis bounds or is not allowed here.
    #[error("sub-range error: {0}")]
    RangeError(String),
    /// The requested output cannot be produced for data of this rank.
    #[error("unsupported rank: {0}")]
    UnsupportedRank(usize),
    /// The requested element kind cannot be decoded from the on-disk layout.
    #[error("cannot decode {requested:?} from BITPIX {bitpix} with BZERO {offset}")]
    PrecisionMismatch {
        requested: ElementKind,
        bitpix: i64,
        offset: f64,
    },
    /// The locator reached end-of-stream without finding the section.
    #[error("extension not found: {0}")]
    ExtensionNotFound(String),
    /// BITPIX value outside the set this codec supports.
    #[error("unsupported BITPIX value: {0}")]
    UnsupportedBitpix(i64),
    /// Caller-supplied data does not agree with its declared shape.
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
    /// An I/O error from the underlying byte source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedHeader(message.into())
    }

    pub(crate) fn range(message: impl Into<String>) -> Self {
        Error::RangeError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_fits_format() {
        let e = Error::NotFitsFormat("first card is not SIMPLE = T");
        assert_eq!(e.to_string(), "not a FITS stream: first card is not SIMPLE = T");
    }

    #[test]
    fn display_malformed_header() {
        let e = Error::malformed("END card not found");
        assert_eq!(e.to_string(), "malformed header: END card not found");
    }

    #[test]
    fn display_range_error() {
        let e = Error::range("axis 1: max 10 >= length 10");
        assert_eq!(e.to_string(), "sub-range error: axis 1: max 10 >= length 10");
    }

    #[test]
    fn display_unsupported_rank() {
        assert_eq!(Error::UnsupportedRank(4).to_string(), "unsupported rank: 4");
    }

    #[test]
    fn display_precision_mismatch() {
        let e = Error::PrecisionMismatch {
            requested: ElementKind::Bool,
            bitpix: 16,
            offset: 0.0,
        };
        assert_eq!(e.to_string(), "cannot decode Bool from BITPIX 16 with BZERO 0");
    }

    #[test]
    fn display_extension_not_found() {
        let e = Error::ExtensionNotFound(String::from("IMAGE #4"));
        assert_eq!(e.to_string(), "extension not found: IMAGE #4");
    }

    #[test]
    fn display_unsupported_bitpix() {
        assert_eq!(
            Error::UnsupportedBitpix(-99).to_string(),
            "unsupported BITPIX value: -99"
        );
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::other("oops");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert_eq!(e.to_string(), "I/O error: oops");
    }

    #[test]
    fn std_error_source() {
        use std::error::Error as StdError;

        assert!(Error::UnsupportedRank(5).source().is_none());
        let e = Error::Io(std::io::Error::other("inner"));
        assert!(e.source().is_some());
    }
}

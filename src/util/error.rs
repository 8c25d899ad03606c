//! Error types for fmrmatch.

use thiserror::Error;

/// Result alias for template decoding and assembly.
pub type FormatResult<T> = std::result::Result<T, FormatError>;

/// Result alias for gallery search operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors raised while decoding an encoded finger minutiae record, or while
/// assembling one that the binary layout cannot represent.
///
/// Every variant is recoverable: a gallery search skips the offending
/// template and keeps going.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The text form of the template is not valid base64.
    #[error("invalid base64 template: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    /// The format identifier or version is not a supported FMR revision.
    #[error("unsupported record format {tag:?}")]
    UnsupportedFormat { tag: [u8; 8] },
    /// The header's record length disagrees with the number of bytes supplied.
    #[error("record length mismatch: header declares {declared} bytes, got {actual}")]
    LengthMismatch { declared: u32, actual: usize },
    /// The byte stream ended before a declared structure was complete.
    #[error("truncated record at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// The record declares no finger views.
    #[error("record contains no finger views")]
    NoViews,
    /// The record declares more finger views than the format allows.
    #[error("record declares {count} finger views (max {max})")]
    TooManyViews { count: usize, max: usize },
    /// Bytes remain after the last declared finger view.
    #[error("{count} unexpected trailing bytes after the last finger view")]
    TrailingBytes { count: usize },
    /// A view holds more minutiae than its one-byte count can declare.
    #[error("view {view} holds {count} minutiae (max {max})")]
    TooManyMinutiae { view: usize, count: usize, max: usize },
    /// A minutia coordinate does not fit the 14-bit field.
    #[error("minutia ({x}, {y}) in view {view} exceeds the 14-bit coordinate range")]
    CoordinateOutOfRange { view: usize, x: u16, y: u16 },
}

/// Invalid engine configuration, rejected before any scoring begins.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Thresholds live on the 0..=255 score scale.
    #[error("threshold {value} is outside 0..=255")]
    ThresholdOutOfRange { value: i64 },
    /// A gallery bound of zero would reject every search.
    #[error("max_gallery_size must be at least 1")]
    ZeroGallerySize,
    /// Comparator tolerances or weights are unusable.
    #[error("invalid comparator parameters: {reason}")]
    InvalidParams { reason: &'static str },
}

/// Failures reported by a gallery search.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    /// The probe template could not be decoded; nothing can be compared.
    #[error("probe template rejected: {0}")]
    Probe(#[from] FormatError),
    /// Every gallery entry failed to decode.
    #[error("no usable templates in gallery ({skipped} skipped)")]
    NoUsableTemplates { skipped: usize },
    /// The gallery exceeds the configured size bound.
    #[error("gallery has {len} entries, limit is {max}")]
    GalleryTooLarge { len: usize, max: usize },
}

//! Error types for playlist and guide ingestion

use thiserror::Error;

/// Document-level failure while parsing an M3U playlist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    /// First non-empty line is not `#EXTM3U`
    #[error("Invalid M3U format: missing #EXTM3U header")]
    MissingHeader,
}

/// Document-level failure while parsing an XMLTV guide.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EpgError {
    /// The XML itself is not well-formed.
    #[error("Malformed XMLTV at byte {position}: {message}")]
    MalformedXml {
        /// Byte offset reported by the reader
        position: u64,
        /// Reader error message
        message: String,
    },

    /// The XML was readable but walking it failed (bad encoding, broken attribute).
    #[error("Error walking XMLTV document: {0}")]
    Traversal(String),
}

/// Failure in the fetch collaborator (HTTP or local file).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Http(String),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Content is not valid UTF-8")]
    Decode,

    #[error("Download failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<FetchError>,
    },
}

/// A single malformed field inside an otherwise parseable document.
///
/// These never abort a parse; they are logged and the field is recorded as absent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldParseError {
    #[error("Failed to parse datetime: {0:?}")]
    Timestamp(String),

    #[error("Ignoring malformed timezone offset: {0:?}")]
    Offset(String),
}

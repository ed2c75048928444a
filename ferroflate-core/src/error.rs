//! Error types for ferroflate operations.
//!
//! This module provides one error type shared by the compression and
//! decompression crates. Stream-level conditions (invalid parameters,
//! impossible progress, truncated streams) and data-level conditions
//! (corrupted compressed input) are separate variants so callers can react
//! differently to caller bugs and to bad data.

use std::io;
use thiserror::Error;

/// The main error type for ferroflate operations.
#[derive(Debug, Error)]
pub enum FerroflateError {
    /// I/O error from an underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream was used inconsistently: an invalid parameter, a call
    /// after finalization, or an operation that is not legal in the current
    /// state.
    #[error("stream error: {message}")]
    Stream {
        /// Description of the misuse.
        message: String,
    },

    /// No progress is possible: input is exhausted, no output is pending,
    /// and the requested flush does not upgrade the previous one.
    #[error("no progress possible: input exhausted and no pending output")]
    Buf,

    /// The stream was ended while a block was still open.
    #[error("incomplete stream: ended while a block was still open")]
    Data,

    /// Invalid Huffman code encountered during decompression.
    #[error("invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the invalid code was found.
        bit_position: u64,
    },

    /// Corrupted data in the compressed stream.
    #[error("corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Byte offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Unexpected end of the compressed stream.
    #[error("unexpected end of stream: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: usize,
    },

    /// Invalid distance in an LZ77 back-reference.
    #[error("invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The invalid distance value.
        distance: usize,
        /// Current history buffer size.
        history_size: usize,
    },
}

/// Result type alias for ferroflate operations.
pub type Result<T> = std::result::Result<T, FerroflateError>;

impl FerroflateError {
    /// Create a stream-misuse error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FerroflateError::stream("level 42 out of range");
        assert!(err.to_string().contains("level 42"));

        let err = FerroflateError::invalid_distance(40000, 32768);
        assert!(err.to_string().contains("40000"));

        let err = FerroflateError::Buf;
        assert!(err.to_string().contains("no progress"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        let err: FerroflateError = io_err.into();
        assert!(matches!(err, FerroflateError::Io(_)));
    }
}

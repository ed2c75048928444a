//! # Ferroflate Core
//!
//! Core components for the ferroflate compression crates.
//!
//! This crate provides the fundamental building blocks shared by the codec
//! crates:
//!
//! - [`bitstream`]: bit-level input for variable-length codes
//! - [`checksum`]: Adler-32 checksum
//! - [`traits`]: streaming compression/decompression traits
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! Ferroflate is layered:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Codec                                                │
//! │     DEFLATE (LZ77 + Huffman), ferroflate-deflate     │
//! ├──────────────────────────────────────────────────────┤
//! │ Foundation (this crate)                              │
//! │     BitReader, Adler-32, traits, errors              │
//! └──────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod checksum;
pub mod error;
pub mod traits;

// Re-exports for convenience
pub use bitstream::BitReader;
pub use checksum::Adler32;
pub use error::{FerroflateError, Result};
pub use traits::{CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode};

//! # Ferroflate Deflate
//!
//! Streaming implementation of the DEFLATE compressed data format
//! (RFC 1951).
//!
//! The compressor is a resumable session: it accepts input and output as
//! plain byte slices, suspends whenever either runs out, and carries all
//! state needed to continue across calls. That makes it usable as the
//! engine behind compressed transports (HTTP content encoding, WebSocket
//! permessage-deflate) as well as file formats.
//!
//! ## Features
//!
//! - **Compression**: sliding-window LZ77 with greedy and lazy matching,
//!   run-length and Huffman-only strategies, levels 0-9
//! - **Flush control**: block, partial, sync, full and finish flushes with
//!   byte-aligned resynchronization markers
//! - **Preset dictionaries** on both the compression and decompression side
//! - **Decompression** of all DEFLATE block types
//!
//! ## Example
//!
//! ```rust
//! use ferroflate_deflate::{deflate, inflate};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, 6).unwrap();
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Compression levels
//!
//! - Level 0: no compression (stored blocks)
//! - Levels 1-3: greedy matching, fastest
//! - Levels 4-6: lazy matching, balanced (default is 6)
//! - Levels 7-9: lazy matching with deep searches, best ratio

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod deflate;
pub mod huffman;
pub mod inflate;
mod lz77;
pub mod tables;
mod trees;

// Re-exports
pub use config::{Params, Strategy};
pub use deflate::{Deflater, deflate};
pub use huffman::{HuffmanBuilder, HuffmanTree};
pub use inflate::{Inflater, inflate, inflate_with_dictionary};
pub use lz77::{MAX_MATCH, MIN_MATCH};

//! Compression parameters and the per-level tuning table.
//!
//! Levels 0-9 trade time for ratio by bounding how hard the match finder
//! works. The table values have been tuned to avoid pathological worst cases;
//! better values may exist for specific inputs.

use ferroflate_core::error::{FerroflateError, Result};

/// Default compression level.
pub const DEFAULT_LEVEL: u8 = 6;

/// Default window size exponent (32 KiB window).
pub const DEFAULT_WINDOW_BITS: u8 = 15;

/// Default memory level (16K-entry token tally, 32K-bucket hash).
pub const DEFAULT_MEM_LEVEL: u8 = 8;

/// Maximum memory level.
pub const MAX_MEM_LEVEL: u8 = 9;

/// Compression strategy.
///
/// Strategies bias the token stream toward the kind of redundancy the caller
/// expects; all of them produce valid DEFLATE output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Normal LZ77 + Huffman compression.
    #[default]
    Default,
    /// Favor Huffman coding over string matching; short matches are
    /// discarded. Useful for data filtered through a predictor (PNG rows).
    Filtered,
    /// Huffman coding only, no string matching at all.
    HuffmanOnly,
    /// Only distance-one matches: run-length encoding with Huffman coding.
    Rle,
    /// Normal matching but only static Huffman blocks, for decoders that
    /// cannot afford dynamic table construction.
    Fixed,
}

/// Which block-production engine a level uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EngineKind {
    /// Copy input into stored blocks (level 0).
    Stored,
    /// Greedy matching, no deferred decisions (levels 1-3).
    Fast,
    /// Lazy matching with one-position lookahead (levels 4-9).
    Slow,
}

/// Per-level match-finder bounds.
pub(crate) struct Config {
    /// Reduce the chain budget once the deferred match reaches this length.
    pub good_length: u16,
    /// Do not attempt a lazy search above this deferred match length. For the
    /// fast engine this instead bounds hash insertion over matched bytes.
    pub max_lazy: u16,
    /// Stop searching once a match of this length is found.
    pub nice_length: u16,
    /// Maximum hash-chain positions to examine per search.
    pub max_chain: u16,
    /// Engine driven at this level.
    pub kind: EngineKind,
}

const fn cfg(good_length: u16, max_lazy: u16, nice_length: u16, max_chain: u16, kind: EngineKind) -> Config {
    Config {
        good_length,
        max_lazy,
        nice_length,
        max_chain,
        kind,
    }
}

/// Tuning table indexed by compression level.
#[rustfmt::skip]
pub(crate) const CONFIGURATION_TABLE: [Config; 10] = [
    //  good lazy nice chain
    cfg(0,   0,   0,   0,    EngineKind::Stored), // 0: store only
    cfg(4,   4,   8,   4,    EngineKind::Fast),   // 1: max speed, no lazy matches
    cfg(4,   5,   16,  8,    EngineKind::Fast),   // 2
    cfg(4,   6,   32,  32,   EngineKind::Fast),   // 3
    cfg(4,   4,   16,  16,   EngineKind::Slow),   // 4: lazy matches from here on
    cfg(8,   16,  32,  32,   EngineKind::Slow),   // 5
    cfg(8,   16,  128, 128,  EngineKind::Slow),   // 6
    cfg(8,   32,  128, 256,  EngineKind::Slow),   // 7
    cfg(32,  128, 258, 1024, EngineKind::Slow),   // 8
    cfg(32,  258, 258, 4096, EngineKind::Slow),   // 9: max compression
];

/// Construction parameters for a compression stream.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    /// Compression level, 0 (stored) through 9 (best).
    pub level: u8,
    /// Compression strategy.
    pub strategy: Strategy,
    /// Window size exponent: the sliding window holds `1 << window_bits`
    /// bytes of history, `8 <= window_bits <= 15`. A value of 8 is promoted
    /// to 9 for interoperability with existing decoders.
    pub window_bits: u8,
    /// Memory/ratio knob in `1..=9`: the hash table has
    /// `1 << (mem_level + 7)` buckets and the token tally holds
    /// `1 << (mem_level + 6)` entries.
    pub mem_level: u8,
}

impl Params {
    /// Parameters for the given level with default window and memory sizes.
    pub fn new(level: u8) -> Self {
        Self {
            level,
            strategy: Strategy::Default,
            window_bits: DEFAULT_WINDOW_BITS,
            mem_level: DEFAULT_MEM_LEVEL,
        }
    }

    /// Validate all fields, rejecting out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.level > 9 {
            return Err(FerroflateError::stream(format!(
                "compression level {} out of range 0..=9",
                self.level
            )));
        }
        if !(8..=15).contains(&self.window_bits) {
            return Err(FerroflateError::stream(format!(
                "window_bits {} out of range 8..=15",
                self.window_bits
            )));
        }
        if !(1..=MAX_MEM_LEVEL).contains(&self.mem_level) {
            return Err(FerroflateError::stream(format!(
                "mem_level {} out of range 1..={}",
                self.mem_level, MAX_MEM_LEVEL
            )));
        }
        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_engines() {
        assert_eq!(CONFIGURATION_TABLE[0].kind, EngineKind::Stored);
        for level in 1..=3 {
            assert_eq!(CONFIGURATION_TABLE[level].kind, EngineKind::Fast);
        }
        for level in 4..=9 {
            assert_eq!(CONFIGURATION_TABLE[level].kind, EngineKind::Slow);
        }
    }

    #[test]
    fn test_table_monotonic_effort() {
        for level in 2..=9 {
            assert!(
                CONFIGURATION_TABLE[level].max_chain >= CONFIGURATION_TABLE[level - 1].max_chain
            );
        }
        assert_eq!(CONFIGURATION_TABLE[9].max_chain, 4096);
        assert_eq!(CONFIGURATION_TABLE[9].nice_length, 258);
    }

    #[test]
    fn test_params_validation() {
        assert!(Params::new(6).validate().is_ok());
        assert!(Params::new(10).validate().is_err());

        let mut p = Params::new(6);
        p.window_bits = 7;
        assert!(p.validate().is_err());
        p.window_bits = 16;
        assert!(p.validate().is_err());

        let mut p = Params::new(6);
        p.mem_level = 0;
        assert!(p.validate().is_err());
    }
}

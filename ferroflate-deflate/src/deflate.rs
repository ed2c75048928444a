//! Streaming DEFLATE compression.
//!
//! [`Deflater`] is a resumable compression session: the caller feeds it input
//! and output slices, and the stream carries every piece of state needed to
//! continue after either buffer runs out. Flush modes control block
//! boundaries, from plain buffering through byte-aligned sync points to
//! stream finalization.
//!
//! # Example
//!
//! ```rust
//! use ferroflate_deflate::{deflate, inflate};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, 6).unwrap();
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```

use crate::config::{CONFIGURATION_TABLE, EngineKind, Params, Strategy};
use crate::lz77::{BlockState, MIN_MATCH};
use crate::trees::Trees;
use ferroflate_core::checksum::Adler32;
use ferroflate_core::error::{FerroflateError, Result};
use ferroflate_core::traits::{CompressStatus, Compressor, FlushMode};

/// Stream finalization status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamStatus {
    /// Accepting input and producing blocks.
    Busy,
    /// A finish was requested; terminal until reset.
    Finish,
}

/// Borrowed input/output cursors for one `compress` call.
pub(crate) struct Io<'a, 'b> {
    input: &'a [u8],
    pub(crate) input_pos: usize,
    output: &'b mut [u8],
    pub(crate) output_pos: usize,
}

impl<'a, 'b> Io<'a, 'b> {
    pub(crate) fn new(input: &'a [u8], output: &'b mut [u8]) -> Self {
        Self {
            input,
            input_pos: 0,
            output,
            output_pos: 0,
        }
    }

    /// Unconsumed input bytes.
    pub(crate) fn avail_in(&self) -> usize {
        self.input.len() - self.input_pos
    }

    /// Remaining output capacity.
    pub(crate) fn avail_out(&self) -> usize {
        self.output.len() - self.output_pos
    }

    /// Copy up to `dst.len()` bytes of input into `dst`; returns the count.
    pub(crate) fn read_into(&mut self, dst: &mut [u8]) -> usize {
        let n = self.avail_in().min(dst.len());
        dst[..n].copy_from_slice(&self.input[self.input_pos..self.input_pos + n]);
        self.input_pos += n;
        n
    }

    /// The writable tail of the output buffer.
    pub(crate) fn output_tail(&mut self) -> &mut [u8] {
        &mut self.output[self.output_pos..]
    }
}

/// Flush ordinal used by the duplicate-flush rule. `Block` ranks between
/// `None` and `Partial` despite its higher ordinal.
fn flush_ordinal(flush: FlushMode) -> i32 {
    match flush {
        FlushMode::None => 0,
        FlushMode::Partial => 1,
        FlushMode::Sync => 2,
        FlushMode::Full => 3,
        FlushMode::Finish => 4,
        FlushMode::Block => 5,
    }
}

fn rank(ordinal: i32) -> i32 {
    (ordinal << 1) - if ordinal > 4 { 9 } else { 0 }
}

/// Sentinel for "the previous call stalled on output"; suppresses the
/// duplicate-flush rejection on the next call.
const STALLED: i32 = -1;

/// Streaming DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    // Parameters.
    pub(crate) level: u8,
    pub(crate) strategy: Strategy,
    pub(crate) window_bits: u8,
    pub(crate) win_size: usize,
    pub(crate) win_mask: usize,
    pub(crate) hash_bits: u8,
    pub(crate) hash_mask: usize,
    pub(crate) hash_shift: usize,

    // Window and hash index.
    pub(crate) window: Vec<u8>,
    pub(crate) hash_table: Vec<u16>,
    pub(crate) hash_chain: Vec<u16>,
    pub(crate) high_water: usize,

    // Scan state.
    pub(crate) cursor: usize,
    pub(crate) lookahead: usize,
    pub(crate) block_start: i64,
    pub(crate) insert_count: usize,
    pub(crate) running_hash: usize,

    // Match state.
    pub(crate) match_length: usize,
    pub(crate) match_start: usize,
    pub(crate) prev_length: usize,
    pub(crate) prev_match: usize,
    pub(crate) match_available: bool,

    // Match-finder bounds for the current level.
    pub(crate) good_len: usize,
    pub(crate) max_lazy: usize,
    pub(crate) nice_len: usize,
    pub(crate) max_chain: usize,

    // Flush controller.
    pub(crate) status: StreamStatus,
    last_flush: i32,

    // Byte counters.
    pub(crate) total_in: u64,
    pub(crate) total_out: u64,

    // Block emission.
    pub(crate) trees: Trees,
}

impl Deflater {
    /// Create a compressor at the given level (0-9) with default window and
    /// memory settings.
    pub fn new(level: u8) -> Self {
        let params = Params::new(level.min(9));
        // Defaults are always in range.
        match Self::with_params(params) {
            Ok(deflater) => deflater,
            Err(_) => unreachable!("default parameters validate"),
        }
    }

    /// Create a compressor from explicit parameters.
    pub fn with_params(params: Params) -> Result<Self> {
        params.validate()?;

        // A 256-byte window trips decoder edge cases; promote to 512.
        let window_bits = if params.window_bits == 8 {
            9
        } else {
            params.window_bits
        };
        let win_size = 1usize << window_bits;
        let hash_bits = params.mem_level + 7;
        let hash_size = 1usize << hash_bits;
        let lit_bufsize = 1usize << (params.mem_level + 6);

        let mut deflater = Self {
            level: params.level,
            strategy: params.strategy,
            window_bits,
            win_size,
            win_mask: win_size - 1,
            hash_bits,
            hash_mask: hash_size - 1,
            hash_shift: (hash_bits as usize + MIN_MATCH - 1) / MIN_MATCH,
            window: vec![0; 2 * win_size],
            hash_table: vec![0; hash_size],
            hash_chain: vec![0; win_size],
            high_water: 0,
            cursor: 0,
            lookahead: 0,
            block_start: 0,
            insert_count: 0,
            running_hash: 0,
            match_length: 0,
            match_start: 0,
            prev_length: 0,
            prev_match: 0,
            match_available: false,
            good_len: 0,
            max_lazy: 0,
            nice_len: 0,
            max_chain: 0,
            status: StreamStatus::Busy,
            last_flush: flush_ordinal(FlushMode::None),
            total_in: 0,
            total_out: 0,
            trees: Trees::new(lit_bufsize),
        };
        deflater.reset();
        Ok(deflater)
    }

    /// Rewind the stream to its initial state without reallocating buffers.
    pub fn reset(&mut self) {
        self.total_in = 0;
        self.total_out = 0;
        self.status = StreamStatus::Busy;
        self.last_flush = flush_ordinal(FlushMode::None);
        self.trees.init();
        self.match_init();
    }

    /// Initialize the match-finder state for a fresh stream.
    fn match_init(&mut self) {
        self.clear_hash();
        self.load_level_config();
        self.cursor = 0;
        self.block_start = 0;
        self.lookahead = 0;
        self.insert_count = 0;
        self.high_water = 0;
        self.running_hash = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.match_available = false;
        self.match_start = 0;
        self.prev_match = 0;
    }

    fn load_level_config(&mut self) {
        let config = &CONFIGURATION_TABLE[self.level as usize];
        self.good_len = config.good_length as usize;
        self.max_lazy = config.max_lazy as usize;
        self.nice_len = config.nice_length as usize;
        self.max_chain = config.max_chain as usize;
    }

    /// Total bytes consumed from input so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total bytes written to output so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Upper bound on the compressed size of `source_len` input bytes.
    ///
    /// The tight formula only holds for the default window and memory
    /// settings; any other configuration gets a conservative bound covering
    /// the worst-case expansion of static blocks.
    pub fn upper_bound(&self, source_len: u64) -> u64 {
        let conservative = source_len + ((source_len + 7) >> 3) + ((source_len + 63) >> 6) + 5;
        if self.window_bits == 15 && self.hash_bits == 15 {
            source_len + (source_len >> 12) + (source_len >> 14) + (source_len >> 25) + 7
        } else {
            conservative
        }
    }

    /// Prime the window with a preset dictionary.
    ///
    /// Only legal before any input has been consumed. Oversized dictionaries
    /// keep only their trailing window's worth. Returns the Adler-32 checksum
    /// of the full dictionary so the decompressing side can be matched up.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        if self.total_in != 0 || self.lookahead != 0 {
            return Err(FerroflateError::stream(
                "dictionary must be set before any input is consumed",
            ));
        }

        let mut dict = dictionary;
        if dict.len() >= self.win_size {
            // The whole window becomes dictionary; prior coordinates reset.
            self.clear_hash();
            self.cursor = 0;
            self.block_start = 0;
            self.insert_count = 0;
            dict = &dict[dict.len() - self.win_size..];
        }

        // Feed the dictionary through the regular window-fill path, indexing
        // every position, then rewind the counters: priming consumes nothing.
        let saved_total_in = self.total_in;
        let mut empty_out = [0u8; 0];
        let mut io = Io::new(dict, &mut empty_out);
        self.fill_window(&mut io);
        while self.lookahead >= MIN_MATCH {
            let mut pos = self.cursor;
            let mut remaining = self.lookahead - (MIN_MATCH - 1);
            while remaining > 0 {
                let byte = self.window[pos + MIN_MATCH - 1];
                self.running_hash =
                    ((self.running_hash << self.hash_shift) ^ byte as usize) & self.hash_mask;
                self.hash_chain[pos & self.win_mask] = self.hash_table[self.running_hash];
                self.hash_table[self.running_hash] = pos as u16;
                pos += 1;
                remaining -= 1;
            }
            self.cursor = pos;
            self.lookahead = MIN_MATCH - 1;
            self.fill_window(&mut io);
        }
        self.cursor += self.lookahead;
        self.block_start = self.cursor as i64;
        self.insert_count = self.lookahead;
        self.lookahead = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.match_available = false;
        self.total_in = saved_total_in;

        Ok(Adler32::checksum(dictionary))
    }

    /// Change the level and strategy mid-stream.
    ///
    /// If the change swaps block-production engines while data is in flight,
    /// the open block is closed into the pending buffer first so every byte
    /// is coded under exactly one parameter set.
    pub fn params(&mut self, level: u8, strategy: Strategy) -> Result<()> {
        if level > 9 {
            return Err(FerroflateError::stream(format!(
                "compression level {} out of range 0..=9",
                level
            )));
        }
        if self.status == StreamStatus::Finish {
            return Err(FerroflateError::stream("parameters changed after finish"));
        }

        let old_kind = CONFIGURATION_TABLE[self.level as usize].kind;
        let new_kind = CONFIGURATION_TABLE[level as usize].kind;

        if (strategy != self.strategy || new_kind != old_kind) && self.total_in != 0 {
            // Close the open block; output lands in the pending buffer and
            // drains on the next compress call.
            let mut empty_out = [0u8; 0];
            let mut io = Io::new(&[], &mut empty_out);
            let _ = self.dispatch(&mut io, FlushMode::Block);

            // The new engine must not inherit a deferred decision.
            if self.match_available {
                let byte = self.window[self.cursor - 1];
                self.trees.tally_lit(byte);
                self.match_available = false;
            }
            self.match_length = MIN_MATCH - 1;
            self.prev_length = MIN_MATCH - 1;

            // The engine suspends on the (empty) output, not on the pending
            // buffer, so it may leave the block half-closed; finish the job
            // directly. Every tokenized byte must be coded under exactly one
            // parameter set, and the stored engine requires a nonnegative
            // block start.
            if !self.trees.sym_buf_is_empty() || (self.cursor as i64) > self.block_start {
                let mut empty_out = [0u8; 0];
                let mut io = Io::new(&[], &mut empty_out);
                self.flush_block_only(&mut io, false);
            }
        }

        if self.level != level {
            self.level = level;
            self.load_level_config();
        }
        self.strategy = strategy;
        Ok(())
    }

    /// Compress from `input` into `output` under the given flush mode.
    ///
    /// Returns `(bytes consumed, bytes produced, status)`. On error the byte
    /// counters reflect exactly what was consumed and produced beforehand.
    pub fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        let mut io = Io::new(input, output);
        let ended = self.run(&mut io, flush)?;

        let status = if ended {
            CompressStatus::Done
        } else if io.avail_out() == 0 {
            CompressStatus::NeedsOutput
        } else {
            CompressStatus::NeedsInput
        };
        Ok((io.input_pos, io.output_pos, status))
    }

    /// The session state machine; returns true once the stream has ended.
    fn run(&mut self, io: &mut Io<'_, '_>, flush: FlushMode) -> Result<bool> {
        if self.status == StreamStatus::Finish && flush != FlushMode::Finish {
            return Err(FerroflateError::stream("write after finish"));
        }
        if io.output.is_empty() {
            return Err(FerroflateError::Buf);
        }

        let old_flush = self.last_flush;
        self.last_flush = flush_ordinal(flush);

        // Hand over whatever the previous call left pending.
        if self.trees.pending_len() > 0 {
            self.flush_pending(io);
            if io.avail_out() == 0 {
                // The caller will come back with more space; nothing wrong.
                self.last_flush = STALLED;
                return Ok(false);
            }
        } else if io.avail_in() == 0
            && rank(flush_ordinal(flush)) <= rank(old_flush)
            && flush != FlushMode::Finish
        {
            // Same or weaker flush with nothing to work on: no progress.
            return Err(FerroflateError::Buf);
        }

        if self.status == StreamStatus::Finish && io.avail_in() != 0 {
            return Err(FerroflateError::Buf);
        }

        // Start a new block or continue the current one.
        if io.avail_in() != 0
            || self.lookahead != 0
            || (flush != FlushMode::None && self.status != StreamStatus::Finish)
        {
            let bstate = self.dispatch(io, flush);

            if bstate == BlockState::FinishStarted || bstate == BlockState::FinishDone {
                self.status = StreamStatus::Finish;
            }
            match bstate {
                BlockState::NeedMore | BlockState::FinishStarted => {
                    if io.avail_out() == 0 {
                        self.last_flush = STALLED;
                    }
                    // With a nonzero flush the caller repeats the same mode,
                    // so the boundary marker is emitted on the next call; a
                    // tiny output buffer sees at most one empty block.
                    return Ok(false);
                }
                BlockState::BlockDone => {
                    if flush == FlushMode::Partial {
                        self.trees.align();
                    } else if flush != FlushMode::Block {
                        // Sync or full flush: an empty stored block is the
                        // byte-aligned resynchronization marker.
                        self.trees.stored_block(&[], false);
                        if flush == FlushMode::Full {
                            self.clear_hash();
                            if self.lookahead == 0 {
                                self.cursor = 0;
                                self.block_start = 0;
                                self.insert_count = 0;
                            }
                        }
                    }
                    self.flush_pending(io);
                    if io.avail_out() == 0 {
                        self.last_flush = STALLED;
                        return Ok(false);
                    }
                }
                BlockState::FinishDone => {}
            }
        }

        Ok(flush == FlushMode::Finish)
    }

    /// Route to the engine selected by strategy and level.
    pub(crate) fn dispatch(&mut self, io: &mut Io<'_, '_>, flush: FlushMode) -> BlockState {
        match self.strategy {
            Strategy::HuffmanOnly => self.deflate_huff(io, flush),
            Strategy::Rle => self.deflate_rle(io, flush),
            _ => match CONFIGURATION_TABLE[self.level as usize].kind {
                EngineKind::Stored => self.deflate_stored(io, flush),
                EngineKind::Fast => self.deflate_fast(io, flush),
                EngineKind::Slow => self.deflate_slow(io, flush),
            },
        }
    }

    /// Move pending compressed bytes into the caller's output.
    pub(crate) fn flush_pending(&mut self, io: &mut Io<'_, '_>) {
        self.trees.flush_bits();
        let n = self.trees.drain_pending(io.output_tail());
        io.output_pos += n;
        self.total_out += n as u64;
    }

    /// Tear down the stream, reporting whether it was ended cleanly.
    pub fn end(self) -> Result<()> {
        if self.status == StreamStatus::Busy {
            return Err(FerroflateError::Data);
        }
        Ok(())
    }

    /// Compress `data` to a vector in one call.
    pub fn compress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut buffer = vec![0u8; 32 * 1024];
        let mut pos = 0;

        loop {
            let (consumed, produced, status) =
                self.compress(&data[pos..], &mut buffer, FlushMode::Finish)?;
            pos += consumed;
            output.extend_from_slice(&buffer[..produced]);
            if status == CompressStatus::Done {
                break;
            }
        }
        Ok(output)
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LEVEL)
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        Deflater::compress(self, input, output, flush)
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.status == StreamStatus::Finish && self.trees.pending_len() == 0
    }
}

/// Compress data using DEFLATE at the given level (0-9).
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut deflater = Deflater::new(level);
    deflater.compress_to_vec(data)
}

//! The sliding-window LZ77 engine.
//!
//! The compressor keeps a `2 * W` byte window: the front half is history the
//! match finder may reference, the back half receives fresh input. A hash
//! table maps every 3-byte prefix to the most recent position holding it, and
//! a chain array links positions with equal prefixes, so the match finder can
//! walk candidates newest-first.
//!
//! The block-production engines below are resumable by construction: all of
//! their state lives in [`Deflater`], and each returns to the caller whenever
//! input runs dry or output fills up. Re-entering the engine resumes exactly
//! at the first condition check.

use crate::config::Strategy;
use crate::deflate::{Deflater, Io};
use ferroflate_core::traits::FlushMode;

/// Minimum back-reference length.
pub const MIN_MATCH: usize = 3;

/// Maximum back-reference length.
pub const MAX_MATCH: usize = 258;

/// Lookahead the match finder wants before running: one maximal match plus
/// one minimal match plus one byte.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Matches of minimum length are discarded beyond this distance; the extra
/// bits of a far distance code cost more than three literals save.
pub const TOO_FAR: usize = 4096;

/// Bytes zeroed past the live data so speculative match reads are defined.
pub(crate) const WIN_INIT: usize = MAX_MATCH;

/// Result of running a block-production engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockState {
    /// Blocked on input; the caller must supply more and call again.
    NeedMore,
    /// A block closed on a natural boundary; flush handling may proceed.
    BlockDone,
    /// The final block was started but the output buffer filled.
    FinishStarted,
    /// The final block is fully in the pending buffer.
    FinishDone,
}

impl Deflater {
    /// Farthest distance a back-reference may span.
    #[inline]
    pub(crate) fn max_dist(&self) -> usize {
        self.win_size - MIN_LOOKAHEAD
    }

    /// Full window allocation: history half plus input half.
    #[inline]
    fn window_capacity(&self) -> usize {
        2 * self.win_size
    }

    /// Roll the hash forward over one byte.
    #[inline]
    fn update_hash(&mut self, byte: u8) {
        self.running_hash =
            ((self.running_hash << self.hash_shift) ^ byte as usize) & self.hash_mask;
    }

    /// Index `pos` under its 3-byte prefix hash and return the previous chain
    /// head (0 when the bucket was empty).
    #[inline]
    fn insert_string(&mut self, pos: usize) -> usize {
        let byte = self.window[pos + MIN_MATCH - 1];
        self.update_hash(byte);
        let head = self.hash_table[self.running_hash];
        self.hash_chain[pos & self.win_mask] = head;
        self.hash_table[self.running_hash] = pos as u16;
        head as usize
    }

    /// Forget all chain heads. Chains themselves become unreachable.
    pub(crate) fn clear_hash(&mut self) {
        self.hash_table.fill(0);
    }

    /// Top up the lookahead from the caller's input.
    ///
    /// Slides the window when the scan position runs out of room, appends as
    /// much input as fits, replays deferred hash insertions, and maintains
    /// the zeroed region past the live data that the match finder may read
    /// speculatively.
    pub(crate) fn fill_window(&mut self, io: &mut Io<'_, '_>) {
        debug_assert!(self.lookahead < MIN_LOOKAHEAD, "already enough lookahead");
        let wsize = self.win_size;

        loop {
            let mut more = self.window_capacity() - self.lookahead - self.cursor;

            // When the scan position is deep in the input half, move the
            // upper half down so appends have room. Positions below wsize
            // fall out of reach and their chain entries go stale.
            if self.cursor >= wsize + self.max_dist() {
                self.window.copy_within(wsize..2 * wsize, 0);
                self.match_start = self.match_start.saturating_sub(wsize);
                self.cursor -= wsize;
                self.block_start -= wsize as i64;
                for entry in self.hash_table.iter_mut() {
                    *entry = if *entry as usize >= wsize {
                        *entry - wsize as u16
                    } else {
                        0
                    };
                }
                for entry in self.hash_chain.iter_mut() {
                    *entry = if *entry as usize >= wsize {
                        *entry - wsize as u16
                    } else {
                        0
                    };
                }
                more += wsize;
            }
            if io.avail_in() == 0 {
                break;
            }

            let start = self.cursor + self.lookahead;
            let n = io.read_into(&mut self.window[start..start + more]);
            self.total_in += n as u64;
            self.lookahead += n;

            // Positions left unindexed at the previous block boundary can be
            // hashed now that their 3-byte prefixes are complete.
            if self.lookahead + self.insert_count >= MIN_MATCH {
                let mut pos = self.cursor - self.insert_count;
                let b0 = self.window[pos];
                self.running_hash = b0 as usize & self.hash_mask;
                let b1 = self.window[pos + 1];
                self.update_hash(b1);
                while self.insert_count > 0 {
                    let b2 = self.window[pos + MIN_MATCH - 1];
                    self.update_hash(b2);
                    self.hash_chain[pos & self.win_mask] = self.hash_table[self.running_hash];
                    self.hash_table[self.running_hash] = pos as u16;
                    pos += 1;
                    self.insert_count -= 1;
                    if self.lookahead + self.insert_count < MIN_MATCH {
                        break;
                    }
                }
            }

            if self.lookahead >= MIN_LOOKAHEAD || io.avail_in() == 0 {
                break;
            }
        }

        // Keep WIN_INIT zeroed bytes past the live data. The match loop may
        // compare bytes beyond the lookahead; zeroing makes those reads
        // deterministic, and their results are discarded by the length clamp.
        let curr = self.cursor + self.lookahead;
        if self.high_water < self.window_capacity() {
            if self.high_water < curr {
                let init = (self.window_capacity() - curr).min(WIN_INIT);
                self.window[curr..curr + init].fill(0);
                self.high_water = curr + init;
            } else if self.high_water < curr + WIN_INIT {
                let init =
                    (curr + WIN_INIT - self.high_water).min(self.window_capacity() - self.high_water);
                let from = self.high_water;
                self.window[from..from + init].fill(0);
                self.high_water += init;
            }
        }
    }

    /// Walk the hash chain rooted at `cur_match` looking for the longest
    /// match at the scan position. Matches no longer than the deferred match
    /// are discarded, in which case `match_start` is not updated.
    ///
    /// The search never reads past the window allocation; bytes beyond the
    /// lookahead are zeroed, and the final clamp keeps them out of the
    /// result, so decisions depend only on real input.
    pub(crate) fn longest_match(&mut self, cur_match: usize) -> usize {
        let mut chain_length = self.max_chain;
        let mut cur_match = cur_match;
        let scan = self.cursor;
        let mut best_len = self.prev_length;
        let nice_match = self.nice_len.min(self.lookahead);
        let limit = if self.cursor > self.max_dist() {
            self.cursor - self.max_dist()
        } else {
            0
        };

        debug_assert!(cur_match < self.cursor, "match must be in the past");
        debug_assert!(self.lookahead >= 1);

        // A good deferred match is likely to win anyway; spend less time.
        if self.prev_length >= self.good_len {
            chain_length >>= 2;
        }

        let mut scan_end1 = self.window[scan + best_len - 1];
        let mut scan_end = self.window[scan + best_len];

        loop {
            // Candidates that cannot improve on best_len must match at the
            // offsets best_len and best_len-1; check those bytes first.
            if self.window[cur_match + best_len] == scan_end
                && self.window[cur_match + best_len - 1] == scan_end1
                && self.window[cur_match] == self.window[scan]
                && self.window[cur_match + 1] == self.window[scan + 1]
            {
                let mut len = 2;
                while len < MAX_MATCH && self.window[scan + len] == self.window[cur_match + len] {
                    len += 1;
                }

                if len > best_len {
                    self.match_start = cur_match;
                    best_len = len;
                    if len >= nice_match {
                        break;
                    }
                    scan_end1 = self.window[scan + best_len - 1];
                    scan_end = self.window[scan + best_len];
                }
            }

            cur_match = self.hash_chain[cur_match & self.win_mask] as usize;
            chain_length -= 1;
            if cur_match <= limit || chain_length == 0 {
                break;
            }
        }

        best_len.min(self.lookahead)
    }

    /// Close the current block and hand its bytes to the trees subsystem;
    /// rebase the block start and drain what fits into the caller's output.
    pub(crate) fn flush_block_only(&mut self, io: &mut Io<'_, '_>, last: bool) {
        let level = self.level;
        let strategy = self.strategy;
        let stored = if self.block_start >= 0 {
            Some(&self.window[self.block_start as usize..self.cursor])
        } else {
            None
        };
        self.trees.flush_block(stored, last, level, strategy);
        self.block_start = self.cursor as i64;
        self.flush_pending(io);
    }

    /// [`Self::flush_block_only`], then suspend if the output filled up.
    #[must_use]
    pub(crate) fn flush_block(&mut self, io: &mut Io<'_, '_>, last: bool) -> Option<BlockState> {
        self.flush_block_only(io, last);
        if io.avail_out() == 0 {
            Some(if last {
                BlockState::FinishStarted
            } else {
                BlockState::NeedMore
            })
        } else {
            None
        }
    }

    /// Level 0: copy input into stored blocks without touching the hash.
    pub(crate) fn deflate_stored(&mut self, io: &mut Io<'_, '_>, flush: FlushMode) -> BlockState {
        // Block payloads are bounded by both the format and the pending
        // buffer, which must hold a whole block plus its 5-byte header.
        let max_block_size = self.trees.max_stored();

        loop {
            if self.lookahead <= 1 {
                self.fill_window(io);
                if self.lookahead == 0 && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.lookahead == 0 {
                    break;
                }
            }

            self.cursor += self.lookahead;
            self.lookahead = 0;

            let max_start = self.block_start + max_block_size as i64;
            if self.cursor as i64 >= max_start {
                self.lookahead = (self.cursor as i64 - max_start) as usize;
                self.cursor = max_start as usize;
                if let Some(state) = self.flush_block(io, false) {
                    return state;
                }
            }
            // Flush before the window could slide, or the block's bytes
            // would be copied away from under it.
            if self.cursor as i64 - self.block_start >= self.max_dist() as i64 {
                if let Some(state) = self.flush_block(io, false) {
                    return state;
                }
            }
        }

        self.insert_count = 0;
        if flush == FlushMode::Finish {
            if let Some(state) = self.flush_block(io, true) {
                return state;
            }
            return BlockState::FinishDone;
        }
        if (self.cursor as i64) > self.block_start {
            if let Some(state) = self.flush_block(io, false) {
                return state;
            }
        }
        BlockState::BlockDone
    }

    /// Levels 1-3: greedy matching. Every accepted position is indexed, but
    /// no decision is ever deferred.
    pub(crate) fn deflate_fast(&mut self, io: &mut Io<'_, '_>, flush: FlushMode) -> BlockState {
        loop {
            // The finder wants MAX_MATCH bytes for the match and MIN_MATCH
            // for the insertion that follows it.
            if self.lookahead < MIN_LOOKAHEAD {
                self.fill_window(io);
                if self.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = 0;
            if self.lookahead >= MIN_MATCH {
                hash_head = self.insert_string(self.cursor);
            }

            if hash_head != 0 && self.cursor - hash_head <= self.max_dist() {
                self.match_length = self.longest_match(hash_head);
            }

            let bflush;
            if self.match_length >= MIN_MATCH {
                let distance = (self.cursor - self.match_start) as u16;
                bflush = self.trees.tally_dist(distance, self.match_length);
                self.lookahead -= self.match_length;

                // Indexing every covered position costs time but finds more
                // matches later; only worth it for short matches.
                if self.match_length <= self.max_lazy && self.lookahead >= MIN_MATCH {
                    self.match_length -= 1; // the scan position is already indexed
                    loop {
                        self.cursor += 1;
                        self.insert_string(self.cursor);
                        self.match_length -= 1;
                        if self.match_length == 0 {
                            break;
                        }
                    }
                    self.cursor += 1;
                } else {
                    self.cursor += self.match_length;
                    self.match_length = 0;
                    let b0 = self.window[self.cursor];
                    self.running_hash = b0 as usize & self.hash_mask;
                    let b1 = self.window[self.cursor + 1];
                    self.update_hash(b1);
                }
            } else {
                let byte = self.window[self.cursor];
                bflush = self.trees.tally_lit(byte);
                self.lookahead -= 1;
                self.cursor += 1;
            }
            if bflush {
                if let Some(state) = self.flush_block(io, false) {
                    return state;
                }
            }
        }

        self.insert_count = self.cursor.min(MIN_MATCH - 1);
        if flush == FlushMode::Finish {
            if let Some(state) = self.flush_block(io, true) {
                return state;
            }
            return BlockState::FinishDone;
        }
        if !self.trees.sym_buf_is_empty() {
            if let Some(state) = self.flush_block(io, false) {
                return state;
            }
        }
        BlockState::BlockDone
    }

    /// Levels 4-9: lazy matching. A match is adopted only when the next
    /// position does not start a longer one, so the engine always carries a
    /// deferred decision about the byte at `cursor - 1`.
    pub(crate) fn deflate_slow(&mut self, io: &mut Io<'_, '_>, flush: FlushMode) -> BlockState {
        loop {
            if self.lookahead < MIN_LOOKAHEAD {
                self.fill_window(io);
                if self.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = 0;
            if self.lookahead >= MIN_MATCH {
                hash_head = self.insert_string(self.cursor);
            }

            self.prev_length = self.match_length;
            self.prev_match = self.match_start;
            self.match_length = MIN_MATCH - 1;

            if hash_head != 0
                && self.prev_length < self.max_lazy
                && self.cursor - hash_head <= self.max_dist()
            {
                self.match_length = self.longest_match(hash_head);

                // A short match far away costs more than the literals it
                // replaces; under the filtered strategy, drop all of them.
                if self.match_length <= 5
                    && (self.strategy == Strategy::Filtered
                        || (self.match_length == MIN_MATCH
                            && self.cursor - self.match_start > TOO_FAR))
                {
                    self.match_length = MIN_MATCH - 1;
                }
            }

            if self.prev_length >= MIN_MATCH && self.match_length <= self.prev_length {
                // Commit the deferred match from the previous position.
                let max_insert = self.cursor + self.lookahead - MIN_MATCH;
                let distance = (self.cursor - 1 - self.prev_match) as u16;
                let bflush = self.trees.tally_dist(distance, self.prev_length);

                // Index everything the match covers; cursor-1 and cursor are
                // already in. Without enough lookahead the tail is skipped.
                self.lookahead -= self.prev_length - 1;
                self.prev_length -= 2;
                loop {
                    self.cursor += 1;
                    if self.cursor <= max_insert {
                        self.insert_string(self.cursor);
                    }
                    self.prev_length -= 1;
                    if self.prev_length == 0 {
                        break;
                    }
                }
                self.match_available = false;
                self.match_length = MIN_MATCH - 1;
                self.cursor += 1;

                if bflush {
                    if let Some(state) = self.flush_block(io, false) {
                        return state;
                    }
                }
            } else if self.match_available {
                // The current match is longer: the previous position shrinks
                // to a single literal.
                let byte = self.window[self.cursor - 1];
                let bflush = self.trees.tally_lit(byte);
                if bflush {
                    self.flush_block_only(io, false);
                }
                self.cursor += 1;
                self.lookahead -= 1;
                if io.avail_out() == 0 {
                    return BlockState::NeedMore;
                }
            } else {
                // Nothing deferred yet; hold this position open and look one
                // byte ahead before deciding.
                self.match_available = true;
                self.cursor += 1;
                self.lookahead -= 1;
            }
        }

        debug_assert!(flush != FlushMode::None, "engine drained without flush");
        if self.match_available {
            let byte = self.window[self.cursor - 1];
            self.trees.tally_lit(byte);
            self.match_available = false;
        }
        self.insert_count = self.cursor.min(MIN_MATCH - 1);
        if flush == FlushMode::Finish {
            if let Some(state) = self.flush_block(io, true) {
                return state;
            }
            return BlockState::FinishDone;
        }
        if !self.trees.sym_buf_is_empty() {
            if let Some(state) = self.flush_block(io, false) {
                return state;
            }
        }
        BlockState::BlockDone
    }

    /// RLE strategy: only distance-one matches, no hash maintenance. The
    /// chains are rebuilt if the stream later switches strategies.
    pub(crate) fn deflate_rle(&mut self, io: &mut Io<'_, '_>, flush: FlushMode) -> BlockState {
        loop {
            // A full run needs MAX_MATCH bytes of lookahead.
            if self.lookahead <= MAX_MATCH {
                self.fill_window(io);
                if self.lookahead <= MAX_MATCH && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.lookahead == 0 {
                    break;
                }
            }

            // See how far the previous byte repeats.
            self.match_length = 0;
            if self.lookahead >= MIN_MATCH && self.cursor > 0 {
                let prev = self.window[self.cursor - 1];
                if prev == self.window[self.cursor]
                    && prev == self.window[self.cursor + 1]
                    && prev == self.window[self.cursor + 2]
                {
                    let mut len = MIN_MATCH;
                    while len < MAX_MATCH && self.window[self.cursor + len] == prev {
                        len += 1;
                    }
                    self.match_length = len.min(self.lookahead);
                }
            }

            let bflush;
            if self.match_length >= MIN_MATCH {
                bflush = self.trees.tally_dist(1, self.match_length);
                self.lookahead -= self.match_length;
                self.cursor += self.match_length;
                self.match_length = 0;
            } else {
                let byte = self.window[self.cursor];
                bflush = self.trees.tally_lit(byte);
                self.lookahead -= 1;
                self.cursor += 1;
            }
            if bflush {
                if let Some(state) = self.flush_block(io, false) {
                    return state;
                }
            }
        }

        self.insert_count = 0;
        if flush == FlushMode::Finish {
            if let Some(state) = self.flush_block(io, true) {
                return state;
            }
            return BlockState::FinishDone;
        }
        if !self.trees.sym_buf_is_empty() {
            if let Some(state) = self.flush_block(io, false) {
                return state;
            }
        }
        BlockState::BlockDone
    }

    /// Huffman-only strategy: every byte is a literal; no matching, no hash.
    pub(crate) fn deflate_huff(&mut self, io: &mut Io<'_, '_>, flush: FlushMode) -> BlockState {
        loop {
            if self.lookahead == 0 {
                self.fill_window(io);
                if self.lookahead == 0 {
                    if flush == FlushMode::None {
                        return BlockState::NeedMore;
                    }
                    break;
                }
            }

            self.match_length = 0;
            let byte = self.window[self.cursor];
            let bflush = self.trees.tally_lit(byte);
            self.lookahead -= 1;
            self.cursor += 1;
            if bflush {
                if let Some(state) = self.flush_block(io, false) {
                    return state;
                }
            }
        }

        self.insert_count = 0;
        if flush == FlushMode::Finish {
            if let Some(state) = self.flush_block(io, true) {
                return state;
            }
            return BlockState::FinishDone;
        }
        if !self.trees.sym_buf_is_empty() {
            if let Some(state) = self.flush_block(io, false) {
                return state;
            }
        }
        BlockState::BlockDone
    }
}

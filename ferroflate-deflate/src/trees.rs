//! Block emission: token tally, Huffman tree selection, and the bit
//! accumulator.
//!
//! The LZ77 engines append `(distance, length)` tokens here; when a block
//! closes, this module builds dynamic Huffman trees from the observed symbol
//! frequencies, prices the three encodings DEFLATE offers (stored, static,
//! dynamic), and emits the cheapest one into the pending buffer. The pending
//! buffer is drained into the caller's output a byte at a time, which is what
//! makes the stream resumable after partial writes.

use crate::config::Strategy;
use crate::huffman::{self, Code, HuffmanBuilder};
use crate::lz77::MIN_MATCH;
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, LENGTH_EXTRA_BITS, distance_to_code,
    fixed_distance_lengths, fixed_litlen_lengths, length_to_code,
};
use std::sync::OnceLock;

/// Extra bits carried by the run-length symbols of the code-length alphabet.
const REP_EXTRA_BITS: [u32; 3] = [2, 3, 7];

/// Static literal/length codes, built once from the fixed lengths.
fn static_litlen_codes() -> &'static [Code; 288] {
    static CODES: OnceLock<[Code; 288]> = OnceLock::new();
    CODES.get_or_init(|| {
        let mut codes = [Code::default(); 288];
        codes.copy_from_slice(&huffman::assign_codes(&fixed_litlen_lengths()));
        codes
    })
}

/// Static distance codes: all thirty 5-bit codes.
fn static_distance_codes() -> &'static [Code; 30] {
    static CODES: OnceLock<[Code; 30]> = OnceLock::new();
    CODES.get_or_init(|| {
        let mut codes = [Code::default(); 30];
        codes.copy_from_slice(&huffman::assign_codes(&fixed_distance_lengths()));
        codes
    })
}

/// Token tally, symbol statistics and bit-level output for one stream.
#[derive(Debug)]
pub(crate) struct Trees {
    /// Literal/length symbol frequencies for the open block.
    litlen_freq: [u32; huffman::LITLEN_ALPHABET_SIZE],
    /// Distance symbol frequencies for the open block.
    dist_freq: [u32; huffman::DISTANCE_ALPHABET_SIZE],
    /// Token tally: `(distance, length - MIN_MATCH)`, or `(0, literal)`.
    sym_buf: Vec<(u16, u8)>,
    /// Tally entry count that requests a block flush.
    sym_limit: usize,
    /// Compressed bytes waiting to be handed to the caller.
    pending: Vec<u8>,
    /// Read index into `pending`.
    pending_out: usize,
    /// Nominal pending capacity; bounds the payload of a stored block.
    pending_cap: usize,
    /// Bit accumulator, LSB-first.
    bit_buf: u64,
    /// Valid bit count in `bit_buf`.
    bit_count: u32,
}

impl Trees {
    /// Allocate tally and pending storage for the given tally size.
    pub(crate) fn new(lit_bufsize: usize) -> Self {
        let mut trees = Self {
            litlen_freq: [0; huffman::LITLEN_ALPHABET_SIZE],
            dist_freq: [0; huffman::DISTANCE_ALPHABET_SIZE],
            sym_buf: Vec::with_capacity(lit_bufsize),
            sym_limit: lit_bufsize - 1,
            pending: Vec::with_capacity(lit_bufsize * 4),
            pending_out: 0,
            pending_cap: lit_bufsize * 4,
            bit_buf: 0,
            bit_count: 0,
        };
        trees.init();
        trees
    }

    /// Reset symbol tables and the bit accumulator for a fresh stream.
    pub(crate) fn init(&mut self) {
        self.pending.clear();
        self.pending_out = 0;
        self.bit_buf = 0;
        self.bit_count = 0;
        self.init_block();
    }

    /// Reset per-block state: frequencies and the tally.
    fn init_block(&mut self) {
        self.litlen_freq = [0; huffman::LITLEN_ALPHABET_SIZE];
        self.dist_freq = [0; huffman::DISTANCE_ALPHABET_SIZE];
        // Every block ends with exactly one end-of-block symbol.
        self.litlen_freq[huffman::END_OF_BLOCK as usize] = 1;
        self.sym_buf.clear();
    }

    /// Largest stored-block payload the pending buffer can take.
    pub(crate) fn max_stored(&self) -> usize {
        0xFFFF.min(self.pending_cap - 5)
    }

    /// Number of compressed bytes ready for the caller.
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len() - self.pending_out
    }

    /// Copy up to `out.len()` pending bytes into `out`; returns the count.
    pub(crate) fn drain_pending(&mut self, out: &mut [u8]) -> usize {
        let n = self.pending_len().min(out.len());
        out[..n].copy_from_slice(&self.pending[self.pending_out..self.pending_out + n]);
        self.pending_out += n;
        if self.pending_out == self.pending.len() {
            self.pending.clear();
            self.pending_out = 0;
        }
        n
    }

    /// True when the current block holds no tokens.
    pub(crate) fn sym_buf_is_empty(&self) -> bool {
        self.sym_buf.is_empty()
    }

    /// Append a literal token. Returns true when the tally is full and the
    /// block must be flushed.
    pub(crate) fn tally_lit(&mut self, byte: u8) -> bool {
        self.sym_buf.push((0, byte));
        self.litlen_freq[byte as usize] += 1;
        self.sym_buf.len() == self.sym_limit
    }

    /// Append a back-reference token (`length` is the raw match length).
    /// Returns true when the tally is full.
    pub(crate) fn tally_dist(&mut self, distance: u16, length: usize) -> bool {
        self.sym_buf.push((distance, (length - MIN_MATCH) as u8));
        let (len_code, _, _) = length_to_code(length as u16);
        self.litlen_freq[len_code as usize] += 1;
        let (dist_code, _, _) = distance_to_code(distance);
        self.dist_freq[dist_code as usize] += 1;
        self.sym_buf.len() == self.sym_limit
    }

    // --- bit-level output ----------------------------------------------

    /// Append `len` bits of `value` LSB-first.
    fn send_bits(&mut self, value: u32, len: u32) {
        debug_assert!(len <= 32);
        self.bit_buf |= (value as u64) << self.bit_count;
        self.bit_count += len;
        while self.bit_count >= 8 {
            self.pending.push((self.bit_buf & 0xFF) as u8);
            self.bit_buf >>= 8;
            self.bit_count -= 8;
        }
    }

    /// Append one Huffman code.
    fn send_code(&mut self, code: Code) {
        debug_assert!(code.len > 0, "sending an unused code");
        self.send_bits(code.bits as u32, code.len as u32);
    }

    /// Flush whole bytes from the bit accumulator into the pending buffer.
    pub(crate) fn flush_bits(&mut self) {
        while self.bit_count >= 8 {
            self.pending.push((self.bit_buf & 0xFF) as u8);
            self.bit_buf >>= 8;
            self.bit_count -= 8;
        }
    }

    /// Pad the final partial byte with zeros and flush everything.
    fn windup(&mut self) {
        self.flush_bits();
        if self.bit_count > 0 {
            self.pending.push(self.bit_buf as u8);
            self.bit_buf = 0;
            self.bit_count = 0;
        }
    }

    // --- block emission ------------------------------------------------

    /// Emit a stored block: 3-bit header, byte alignment, `LEN`/`NLEN`, raw
    /// payload. An empty payload doubles as the sync marker `00 00 FF FF`.
    pub(crate) fn stored_block(&mut self, data: &[u8], last: bool) {
        debug_assert!(data.len() <= 0xFFFF);
        self.send_bits(last as u32, 3); // BTYPE=00 in the upper two bits
        self.windup();
        let len = data.len() as u16;
        self.pending.extend_from_slice(&len.to_le_bytes());
        self.pending.extend_from_slice(&(!len).to_le_bytes());
        self.pending.extend_from_slice(data);
    }

    /// Emit an empty static block so a decoder can flush everything decoded
    /// so far, then move whole bytes out of the accumulator.
    pub(crate) fn align(&mut self) {
        self.send_bits(0b010, 3); // BFINAL=0, BTYPE=01
        self.send_code(static_litlen_codes()[huffman::END_OF_BLOCK as usize]);
        self.flush_bits();
    }

    /// Close the current block, choosing the cheapest of the stored, static
    /// and dynamic encodings. `stored` carries the block's raw bytes when
    /// they are still addressable in the window.
    pub(crate) fn flush_block(
        &mut self,
        stored: Option<&[u8]>,
        last: bool,
        level: u8,
        strategy: Strategy,
    ) {
        if level == 0 {
            // Level 0 always has its bytes at hand and never compresses.
            self.stored_block(stored.unwrap_or(&[]), last);
        } else {
            self.flush_coded_block(stored, last, strategy);
        }

        self.init_block();
        if last {
            self.windup();
        }
    }

    fn flush_coded_block(&mut self, stored: Option<&[u8]>, last: bool, strategy: Strategy) {
        let litlen_lengths = HuffmanBuilder::from_frequencies(
            &self.litlen_freq,
            huffman::MAX_CODE_LENGTH as u8,
        )
        .build_lengths();
        let dist_lengths =
            HuffmanBuilder::from_frequencies(&self.dist_freq, huffman::MAX_CODE_LENGTH as u8)
                .build_lengths();

        // End-of-block is always coded, so hlit is at least 257.
        let hlit = Self::last_used(&litlen_lengths).max(256) + 1;
        let hdist = Self::last_used(&dist_lengths) + 1;

        let mut combined = Vec::with_capacity(hlit + hdist);
        combined.extend_from_slice(&litlen_lengths[..hlit]);
        combined.extend_from_slice(&dist_lengths[..hdist]);

        let (codelen_symbols, codelen_freq) = Self::rle_encode_lengths(&combined);
        let codelen_lengths = HuffmanBuilder::from_frequencies(&codelen_freq, 7).build_lengths();

        let mut hclen = huffman::CODELEN_ALPHABET_SIZE;
        while hclen > 4 && codelen_lengths[CODE_LENGTH_ORDER[hclen - 1]] == 0 {
            hclen -= 1;
        }

        // Exact bit prices, excluding the common 3-bit block header.
        let header_bits = 14
            + 3 * hclen as u64
            + codelen_freq
                .iter()
                .enumerate()
                .map(|(sym, &f)| {
                    let extra = if sym >= 16 { REP_EXTRA_BITS[sym - 16] as u64 } else { 0 };
                    f as u64 * (codelen_lengths[sym] as u64 + extra)
                })
                .sum::<u64>();
        let opt_bits = self.data_bits(&litlen_lengths, &dist_lengths) + header_bits;
        let static_bits = self.data_bits(&fixed_litlen_lengths(), &fixed_distance_lengths());

        let opt_bytes = (opt_bits + 3 + 7) >> 3;
        let static_bytes = (static_bits + 3 + 7) >> 3;
        let use_static = strategy == Strategy::Fixed || static_bytes <= opt_bytes;
        let coded_bytes = if use_static { static_bytes } else { opt_bytes };

        let storable = stored
            .filter(|data| data.len() <= self.max_stored() && data.len() as u64 + 4 <= coded_bytes);

        if let Some(data) = storable {
            self.stored_block(data, last);
        } else if use_static {
            self.send_bits(0b01 << 1 | last as u32, 3);
            self.compress_block(static_litlen_codes().as_slice(), static_distance_codes().as_slice());
        } else {
            self.send_bits(0b10 << 1 | last as u32, 3);
            self.send_dynamic_header(&codelen_symbols, &codelen_lengths, hlit, hdist, hclen);
            let lcodes = huffman::assign_codes(&litlen_lengths);
            let dcodes = huffman::assign_codes(&dist_lengths);
            self.compress_block(&lcodes, &dcodes);
        }
    }

    /// Index of the last symbol with a nonzero code length.
    fn last_used(lengths: &[u8]) -> usize {
        lengths.iter().rposition(|&l| l > 0).unwrap_or(0)
    }

    /// Total bits to code the tallied symbols with the given lengths,
    /// including length/distance extra bits and the end-of-block symbol.
    fn data_bits(&self, litlen_lengths: &[u8], dist_lengths: &[u8]) -> u64 {
        let mut bits = 0u64;
        for (sym, &f) in self.litlen_freq.iter().enumerate() {
            if f == 0 {
                continue;
            }
            bits += f as u64 * litlen_lengths[sym] as u64;
            if sym >= 257 {
                bits += f as u64 * LENGTH_EXTRA_BITS[sym - 257] as u64;
            }
        }
        for (sym, &f) in self.dist_freq.iter().enumerate() {
            if f == 0 {
                continue;
            }
            bits += f as u64 * (dist_lengths[sym] as u64 + DISTANCE_EXTRA_BITS[sym] as u64);
        }
        bits
    }

    /// Run-length encode the concatenated code lengths with the 16/17/18
    /// repeat symbols. Returns the symbol stream and the code-length alphabet
    /// frequencies needed to build its tree.
    fn rle_encode_lengths(lengths: &[u8]) -> (Vec<(u8, u8, u8)>, [u32; 19]) {
        let mut symbols = Vec::new();
        let mut freq = [0u32; 19];
        let mut i = 0;

        while i < lengths.len() {
            let len = lengths[i];
            let mut run = 1;
            while i + run < lengths.len() && lengths[i + run] == len {
                run += 1;
            }

            if len == 0 {
                let mut count = run;
                while count >= 11 {
                    let r = count.min(138);
                    symbols.push((18, (r - 11) as u8, 7));
                    freq[18] += 1;
                    count -= r;
                }
                while count >= 3 {
                    let r = count.min(10);
                    symbols.push((17, (r - 3) as u8, 3));
                    freq[17] += 1;
                    count -= r;
                }
                for _ in 0..count {
                    symbols.push((0, 0, 0));
                    freq[0] += 1;
                }
            } else {
                symbols.push((len, 0, 0));
                freq[len as usize] += 1;
                let mut count = run - 1;
                while count >= 3 {
                    let r = count.min(6);
                    symbols.push((16, (r - 3) as u8, 2));
                    freq[16] += 1;
                    count -= r;
                }
                for _ in 0..count {
                    symbols.push((len, 0, 0));
                    freq[len as usize] += 1;
                }
            }

            i += run;
        }

        (symbols, freq)
    }

    /// Emit `HLIT`/`HDIST`/`HCLEN` and the run-length-encoded code lengths.
    fn send_dynamic_header(
        &mut self,
        codelen_symbols: &[(u8, u8, u8)],
        codelen_lengths: &[u8],
        hlit: usize,
        hdist: usize,
        hclen: usize,
    ) {
        self.send_bits((hlit - 257) as u32, 5);
        self.send_bits((hdist - 1) as u32, 5);
        self.send_bits((hclen - 4) as u32, 4);

        for &order in CODE_LENGTH_ORDER.iter().take(hclen) {
            self.send_bits(codelen_lengths[order] as u32, 3);
        }

        let codelen_codes = huffman::assign_codes(codelen_lengths);
        for k in 0..codelen_symbols.len() {
            let (sym, extra, extra_bits) = codelen_symbols[k];
            self.send_code(codelen_codes[sym as usize]);
            if extra_bits > 0 {
                self.send_bits(extra as u32, extra_bits as u32);
            }
        }
    }

    /// Emit the tallied tokens with the given code tables, then end-of-block.
    fn compress_block(&mut self, lcodes: &[Code], dcodes: &[Code]) {
        for k in 0..self.sym_buf.len() {
            let (distance, len_or_lit) = self.sym_buf[k];
            if distance == 0 {
                self.send_code(lcodes[len_or_lit as usize]);
            } else {
                let length = len_or_lit as u16 + MIN_MATCH as u16;
                let (len_code, len_extra_bits, len_extra) = length_to_code(length);
                self.send_code(lcodes[len_code as usize]);
                if len_extra_bits > 0 {
                    self.send_bits(len_extra as u32, len_extra_bits as u32);
                }

                let (dist_code, dist_extra_bits, dist_extra) = distance_to_code(distance);
                self.send_code(dcodes[dist_code as usize]);
                if dist_extra_bits > 0 {
                    self.send_bits(dist_extra as u32, dist_extra_bits as u32);
                }
            }
        }
        self.send_code(lcodes[huffman::END_OF_BLOCK as usize]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_reports_full() {
        let mut trees = Trees::new(16);
        for i in 0..14 {
            assert!(!trees.tally_lit(i as u8));
        }
        assert!(trees.tally_lit(99)); // 15th token == sym_limit
    }

    #[test]
    fn test_sync_marker_bytes() {
        let mut trees = Trees::new(1024);
        trees.stored_block(&[], false);
        let mut out = vec![0u8; 16];
        let n = trees.drain_pending(&mut out);
        assert_eq!(&out[..n], &[0x00, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_stored_block_payload() {
        let mut trees = Trees::new(1024);
        trees.stored_block(b"abc", true);
        let mut out = vec![0u8; 16];
        let n = trees.drain_pending(&mut out);
        // BFINAL=1 header byte, LEN=3, NLEN=~3, payload.
        assert_eq!(&out[..n], &[0x01, 0x03, 0x00, 0xFC, 0xFF, b'a', b'b', b'c']);
    }

    #[test]
    fn test_align_is_empty_static_block() {
        let mut trees = Trees::new(1024);
        trees.align();
        let mut out = vec![0u8; 16];
        let n = trees.drain_pending(&mut out);
        // 3-bit header 010 then the 7-bit all-zero end-of-block code: one
        // full zero byte, with two bits left in the accumulator.
        assert_eq!(n, 1);
        assert_eq!(out[0], 0x02);
    }

    #[test]
    fn test_flush_block_emits_and_resets() {
        let mut trees = Trees::new(1024);
        trees.tally_lit(b'x');
        trees.tally_lit(b'y');
        trees.flush_block(None, true, 6, Strategy::Default);
        assert!(trees.sym_buf_is_empty());
        assert!(trees.pending_len() > 0);
    }

    #[test]
    fn test_drain_in_single_bytes() {
        let mut trees = Trees::new(1024);
        trees.stored_block(b"hi", false);
        let mut collected = Vec::new();
        let mut byte = [0u8; 1];
        while trees.pending_len() > 0 {
            let n = trees.drain_pending(&mut byte);
            assert_eq!(n, 1);
            collected.push(byte[0]);
        }
        assert_eq!(collected, vec![0x00, 0x02, 0x00, 0xFD, 0xFF, b'h', b'i']);
    }
}

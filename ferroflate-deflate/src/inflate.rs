//! DEFLATE decompression (inflate).
//!
//! A decoder for all three DEFLATE block types. The [`Inflater::inflate`]
//! entry point decodes a complete stream in one call; the streaming
//! [`Decompressor`] implementation accepts the compressed bytes in arbitrary
//! pieces and drains the decoded output through buffers of any size. Both
//! tolerate the empty stored and static blocks that sync, full and partial
//! flushes leave in a stream, and both can be primed with the same preset
//! dictionary the compressor used.

use crate::huffman::HuffmanTree;
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, LENGTH_EXTRA_BITS, decode_distance, decode_length,
    fixed_distance_lengths, fixed_litlen_lengths,
};
use ferroflate_core::bitstream::BitReader;
use ferroflate_core::checksum::Adler32;
use ferroflate_core::error::{FerroflateError, Result};
use ferroflate_core::traits::{DecompressStatus, Decompressor};
use std::io::Cursor;
use std::sync::OnceLock;

/// Maximum history a back-reference may span (32 KiB).
pub const MAX_DICTIONARY_SIZE: usize = 32768;

fn fixed_litlen_tree() -> &'static HuffmanTree {
    static TREE: OnceLock<HuffmanTree> = OnceLock::new();
    TREE.get_or_init(|| {
        HuffmanTree::from_code_lengths(&fixed_litlen_lengths())
            .expect("fixed literal/length tree construction cannot fail")
    })
}

fn fixed_distance_tree() -> &'static HuffmanTree {
    static TREE: OnceLock<HuffmanTree> = OnceLock::new();
    TREE.get_or_init(|| {
        HuffmanTree::from_code_lengths(&fixed_distance_lengths())
            .expect("fixed distance tree construction cannot fail")
    })
}

/// DEFLATE decompressor.
#[derive(Debug, Default)]
pub struct Inflater {
    /// Decoded bytes, prefixed by any preset dictionary.
    history: Vec<u8>,
    /// Length of the dictionary prefix in `history`.
    dict_len: usize,
    /// Compressed bytes accumulated across streaming calls.
    buffered: Vec<u8>,
    /// Decoded bytes awaiting drain into the caller's output.
    ready: Vec<u8>,
    /// Read index into `ready`.
    ready_pos: usize,
    /// Whether the final block has been decoded.
    finished: bool,
}

impl Inflater {
    /// Create a new decompressor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decompressor primed with a preset dictionary.
    pub fn with_dictionary(dictionary: &[u8]) -> Self {
        let mut inflater = Self::new();
        inflater.set_dictionary(dictionary);
        inflater
    }

    /// Prime the decoder with a preset dictionary; back-references may then
    /// reach into it. Oversized dictionaries keep only the trailing window's
    /// worth. Returns the Adler-32 checksum of the full dictionary.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> u32 {
        let tail = if dictionary.len() > MAX_DICTIONARY_SIZE {
            &dictionary[dictionary.len() - MAX_DICTIONARY_SIZE..]
        } else {
            dictionary
        };
        self.history.clear();
        self.history.extend_from_slice(tail);
        self.dict_len = tail.len();
        self.buffered.clear();
        self.ready.clear();
        self.ready_pos = 0;
        self.finished = false;
        Adler32::checksum(dictionary)
    }

    /// Reset the decompressor, dropping any dictionary.
    pub fn reset(&mut self) {
        self.history.clear();
        self.dict_len = 0;
        self.buffered.clear();
        self.ready.clear();
        self.ready_pos = 0;
        self.finished = false;
    }

    /// Decode a complete DEFLATE stream in one call. Bytes past the final
    /// block are ignored.
    pub fn inflate(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.decode_stream(input)?;
        self.finished = true;
        Ok(self.history[self.dict_len..].to_vec())
    }

    /// Run the block loop over `input`, appending decoded bytes to the
    /// history. A truncated stream surfaces as `UnexpectedEof`.
    fn decode_stream(&mut self, input: &[u8]) -> Result<()> {
        let mut reader = BitReader::new(Cursor::new(input));

        loop {
            let bfinal = reader.read_bit()?;
            let btype = reader.read_bits(2)?;

            match btype {
                0 => self.inflate_stored(&mut reader)?,
                1 => self.inflate_codes(&mut reader, fixed_litlen_tree(), fixed_distance_tree())?,
                2 => self.inflate_dynamic(&mut reader)?,
                _ => {
                    return Err(FerroflateError::corrupted(
                        reader.bit_position() / 8,
                        "reserved block type 3",
                    ));
                }
            }

            if bfinal {
                break;
            }
        }

        Ok(())
    }

    /// Stored block: byte alignment, LEN/NLEN complement pair, raw payload.
    fn inflate_stored<R: std::io::Read>(&mut self, reader: &mut BitReader<R>) -> Result<()> {
        reader.align_to_byte();

        let mut header = [0u8; 4];
        reader.read_bytes(&mut header)?;
        let len = u16::from_le_bytes([header[0], header[1]]);
        let nlen = u16::from_le_bytes([header[2], header[3]]);
        if len != !nlen {
            return Err(FerroflateError::corrupted(
                reader.bit_position() / 8,
                "stored block length does not match its complement",
            ));
        }

        let start = self.history.len();
        self.history.resize(start + len as usize, 0);
        reader.read_bytes(&mut self.history[start..])?;
        Ok(())
    }

    /// Dynamic block: decode the code-length tree, then both alphabets.
    fn inflate_dynamic<R: std::io::Read>(&mut self, reader: &mut BitReader<R>) -> Result<()> {
        let hlit = reader.read_bits(5)? as usize + 257;
        let hdist = reader.read_bits(5)? as usize + 1;
        let hclen = reader.read_bits(4)? as usize + 4;

        if hlit > 286 || hdist > 30 {
            return Err(FerroflateError::corrupted(
                reader.bit_position() / 8,
                "dynamic header code counts out of range",
            ));
        }

        let mut codelen_lengths = [0u8; 19];
        for &order in CODE_LENGTH_ORDER.iter().take(hclen) {
            codelen_lengths[order] = reader.read_bits(3)? as u8;
        }
        let codelen_tree = HuffmanTree::from_code_lengths(&codelen_lengths)?;

        // The two length arrays are concatenated; repeat codes may cross the
        // boundary between them.
        let mut lengths = vec![0u8; hlit + hdist];
        let mut i = 0;
        while i < lengths.len() {
            let symbol = codelen_tree.decode(reader)?;
            match symbol {
                0..=15 => {
                    lengths[i] = symbol as u8;
                    i += 1;
                }
                16 => {
                    if i == 0 {
                        return Err(FerroflateError::corrupted(
                            reader.bit_position() / 8,
                            "repeat code with no previous length",
                        ));
                    }
                    let previous = lengths[i - 1];
                    let run = 3 + reader.read_bits(2)? as usize;
                    if i + run > lengths.len() {
                        return Err(FerroflateError::corrupted(
                            reader.bit_position() / 8,
                            "repeat run past end of code lengths",
                        ));
                    }
                    lengths[i..i + run].fill(previous);
                    i += run;
                }
                17 | 18 => {
                    let run = if symbol == 17 {
                        3 + reader.read_bits(3)? as usize
                    } else {
                        11 + reader.read_bits(7)? as usize
                    };
                    if i + run > lengths.len() {
                        return Err(FerroflateError::corrupted(
                            reader.bit_position() / 8,
                            "zero run past end of code lengths",
                        ));
                    }
                    i += run;
                }
                _ => {
                    return Err(FerroflateError::invalid_huffman(reader.bit_position()));
                }
            }
        }

        let litlen_tree = HuffmanTree::from_code_lengths(&lengths[..hlit])?;
        let dist_tree = HuffmanTree::from_code_lengths(&lengths[hlit..])?;
        self.inflate_codes(reader, &litlen_tree, &dist_tree)
    }

    /// Decode literal/length and distance symbols until end-of-block.
    fn inflate_codes<R: std::io::Read>(
        &mut self,
        reader: &mut BitReader<R>,
        litlen_tree: &HuffmanTree,
        dist_tree: &HuffmanTree,
    ) -> Result<()> {
        loop {
            let symbol = litlen_tree.decode(reader)?;

            if symbol < 256 {
                self.history.push(symbol as u8);
            } else if symbol == 256 {
                return Ok(());
            } else if symbol <= 285 {
                let extra_bits = LENGTH_EXTRA_BITS[symbol as usize - 257];
                let extra = reader.read_bits(extra_bits)? as u16;
                let length = decode_length(symbol, extra) as usize;

                let dist_symbol = dist_tree.decode(reader)?;
                if dist_symbol >= 30 {
                    return Err(FerroflateError::invalid_huffman(reader.bit_position()));
                }
                let dist_extra_bits = DISTANCE_EXTRA_BITS[dist_symbol as usize];
                let dist_extra = reader.read_bits(dist_extra_bits)? as u16;
                let distance = decode_distance(dist_symbol, dist_extra) as usize;

                if distance > self.history.len() {
                    return Err(FerroflateError::invalid_distance(
                        distance,
                        self.history.len(),
                    ));
                }

                for _ in 0..length {
                    let byte = self.history[self.history.len() - distance];
                    self.history.push(byte);
                }
            } else {
                return Err(FerroflateError::invalid_huffman(reader.bit_position()));
            }
        }
    }
}

impl Decompressor for Inflater {
    /// Streaming decode: compressed bytes may arrive in arbitrary pieces.
    ///
    /// Input is accumulated until it forms a complete stream; a decode that
    /// runs off the end of the accumulated bytes reports `NeedsInput` and is
    /// retried from the start when more arrive. Decoded bytes drain through
    /// `output` across as many calls as needed.
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        let mut consumed = 0;
        if !self.finished {
            self.buffered.extend_from_slice(input);
            consumed = input.len();

            let buffered = std::mem::take(&mut self.buffered);
            match self.decode_stream(&buffered) {
                Ok(()) => {
                    self.ready = self.history[self.dict_len..].to_vec();
                    self.ready_pos = 0;
                    self.finished = true;
                }
                Err(FerroflateError::UnexpectedEof { .. }) => {
                    // Not a whole stream yet; roll back and wait for more.
                    self.history.truncate(self.dict_len);
                    self.buffered = buffered;
                }
                Err(e) => return Err(e),
            }
        }

        let n = (self.ready.len() - self.ready_pos).min(output.len());
        output[..n].copy_from_slice(&self.ready[self.ready_pos..self.ready_pos + n]);
        self.ready_pos += n;

        let status = if !self.finished {
            DecompressStatus::NeedsInput
        } else if self.ready_pos < self.ready.len() {
            DecompressStatus::NeedsOutput
        } else {
            DecompressStatus::Done
        };
        Ok((consumed, n, status))
    }

    fn reset(&mut self) {
        Inflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.finished && self.ready_pos >= self.ready.len()
    }
}

/// Decompress a complete DEFLATE stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().inflate(data)
}

/// Decompress a complete DEFLATE stream with a preset dictionary.
pub fn inflate_with_dictionary(data: &[u8], dictionary: &[u8]) -> Result<Vec<u8>> {
    Inflater::with_dictionary(dictionary).inflate(data)
}

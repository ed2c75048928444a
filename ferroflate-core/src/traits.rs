//! Core traits for streaming compression and decompression.
//!
//! The compression trait follows the classic pointer/length streaming model:
//! the caller supplies an input slice and an output slice, the codec consumes
//! and produces as much as it can, and reports how far it got. All resumption
//! state lives inside the codec, so a call can be repeated with fresh buffers
//! after partial progress.

use crate::error::Result;

/// Status of a streaming compression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// More input data can be accepted.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// The stream is finished; no further bytes will be produced.
    Done,
}

/// Status of a streaming decompression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// More input is needed to continue decompression.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// Decompression is complete.
    Done,
}

/// Flush mode for compression.
///
/// Flush modes control where the current DEFLATE block ends and what kind of
/// boundary marker, if any, is injected after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// No flush: buffer data for best compression, closing blocks only when
    /// the internal token tally fills.
    #[default]
    None,
    /// Close the current block at the current byte boundary; emit no marker
    /// and defer any final bits.
    Block,
    /// Close the current block and emit an empty static block so a decoder
    /// can produce all data so far while history is preserved.
    Partial,
    /// Close the current block and emit an empty stored block, leaving the
    /// output byte-aligned with a `00 00 FF FF` marker.
    Sync,
    /// Like [`FlushMode::Sync`], but additionally forget the match history so
    /// decompression can restart at this point.
    Full,
    /// Close the final block and terminate the stream.
    Finish,
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Compress data from `input` into `output`.
    ///
    /// Returns `(bytes consumed from input, bytes written to output, status)`.
    /// The codec keeps all resumption state internally, so the caller may
    /// supply the unconsumed remainder of `input` (and a fresh `output`) on
    /// the next call.
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)>;

    /// Reset the compressor to its initial state.
    fn reset(&mut self);

    /// Check if the compressor has finished.
    fn is_finished(&self) -> bool;

    /// Compress all data at once (convenience method).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut buffer = vec![0u8; 32768];
        let mut input_pos = 0;

        loop {
            let flush = if input_pos >= input.len() {
                FlushMode::Finish
            } else {
                FlushMode::None
            };

            let (consumed, produced, status) =
                self.compress(&input[input_pos..], &mut buffer, flush)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            if status == CompressStatus::Done {
                break;
            }
        }

        Ok(output)
    }
}

/// A streaming decompressor (decoder).
pub trait Decompressor {
    /// Decompress data from `input` into `output`.
    ///
    /// Returns `(bytes consumed from input, bytes written to output, status)`.
    /// The codec keeps all resumption state internally, so the caller may
    /// feed the stream in arbitrary pieces and drain the decoded bytes
    /// through output buffers of any size.
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)>;

    /// Reset the decompressor to its initial state.
    fn reset(&mut self);

    /// Check if the decompressor has finished.
    fn is_finished(&self) -> bool;

    /// Decompress a complete stream at once (convenience method).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut buffer = vec![0u8; 32768];
        let mut input_pos = 0;

        loop {
            let (consumed, produced, status) =
                self.decompress(&input[input_pos..], &mut buffer)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                DecompressStatus::Done => break,
                DecompressStatus::NeedsInput if input_pos >= input.len() => break,
                DecompressStatus::NeedsInput | DecompressStatus::NeedsOutput => {}
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_mode_default() {
        assert_eq!(FlushMode::default(), FlushMode::None);
    }

    #[test]
    fn test_status_equality() {
        assert_ne!(CompressStatus::NeedsInput, CompressStatus::Done);
    }
}

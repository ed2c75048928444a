//! Edge case tests for DEFLATE compression.

use ferroflate_core::traits::{CompressStatus, FlushMode};
use ferroflate_deflate::{Deflater, Params, Strategy, deflate, inflate};

#[test]
fn test_empty_input() {
    let compressed = deflate(b"", 6).unwrap();
    assert!(compressed.len() <= 2);
    assert_eq!(inflate(&compressed).unwrap(), b"");
}

#[test]
fn test_single_byte() {
    let compressed = deflate(b"a", 1).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), b"a");
}

#[test]
fn test_all_zeros() {
    let input = vec![0u8; 1000];
    let compressed = deflate(&input, 6).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
    assert!(compressed.len() < input.len() / 10);
}

#[test]
fn test_all_same_byte() {
    let input = vec![255u8; 5000];
    let compressed = deflate(&input, 6).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
    assert!(compressed.len() < input.len() / 20);
}

#[test]
fn test_max_match_length() {
    // Repeating a 258-byte pattern exercises maximal matches.
    let pattern = vec![42u8; 258];
    let mut input = Vec::new();
    for _ in 0..10 {
        input.extend_from_slice(&pattern);
    }

    let compressed = deflate(&input, 9).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_alternating_pattern() {
    let input: Vec<u8> = (0..2000)
        .map(|i| if i % 2 == 0 { b'A' } else { b'B' })
        .collect();

    let compressed = deflate(&input, 6).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_binary_data() {
    let input: Vec<u8> = (0..=255u8).cycle().take(5000).collect();

    let compressed = deflate(&input, 6).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_large_input() {
    // 1 MiB of text-like data spans many window slides.
    let mut input = Vec::with_capacity(1024 * 1024);
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    while input.len() < 1024 * 1024 {
        input.extend_from_slice(pattern);
    }
    input.truncate(1024 * 1024);

    let compressed = deflate(&input, 5).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed.len(), input.len());
    assert_eq!(decompressed, input);
}

#[test]
fn test_incompressible_data() {
    // Pseudorandom bytes should pass through near 1:1 via stored blocks.
    let mut state = 0x2545F4914F6CDD1Du64;
    let input: Vec<u8> = (0..100_000)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 32) as u8
        })
        .collect();

    for level in [1, 6, 9] {
        let compressed = deflate(&input, level).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), input, "level {}", level);
        assert!(
            compressed.len() < input.len() + input.len() / 50,
            "level {} expanded {} -> {}",
            level,
            input.len(),
            compressed.len()
        );
    }
}

#[test]
fn test_long_distance_match() {
    // A match at maximum distance inside a 32K window.
    let mut input = vec![0u8; 32768];
    let pattern = b"PATTERN_TO_MATCH";
    input[..pattern.len()].copy_from_slice(pattern);
    input[32768 - pattern.len()..].copy_from_slice(pattern);

    let compressed = deflate(&input, 1).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_compression_levels() {
    let input = b"Hello, world! This is a test of DEFLATE compression with various levels.";

    for level in 0..=9 {
        let compressed = deflate(input, level).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), input, "level {} failed", level);

        if level == 0 {
            // Stored blocks carry a fixed header cost.
            assert!(compressed.len() > input.len());
        }
    }
}

#[test]
fn test_multi_block_stored_output() {
    // Level 0 must split anything beyond one stored block's capacity.
    let input: Vec<u8> = (0..200_000u32).map(|i| (i % 256) as u8).collect();
    let compressed = deflate(&input, 0).unwrap();
    assert!(compressed.len() > input.len());
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_strategy_huffman_only() {
    let input = b"huffman only never searches for matches, matches, matches";
    let mut p = Params::new(6);
    p.strategy = Strategy::HuffmanOnly;
    let mut deflater = Deflater::with_params(p).unwrap();
    let compressed = deflater.compress_to_vec(input).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_strategy_rle() {
    let mut input = Vec::new();
    for byte in [b'a', b'b', b'c', b'd'] {
        input.extend_from_slice(&vec![byte; 500]);
    }

    let mut p = Params::new(6);
    p.strategy = Strategy::Rle;
    let mut deflater = Deflater::with_params(p).unwrap();
    let compressed = deflater.compress_to_vec(&input).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
    assert!(compressed.len() < input.len() / 10);
}

#[test]
fn test_strategy_filtered() {
    let input: Vec<u8> = (0..4096u32).map(|i| (i % 17 + i % 5) as u8).collect();

    let mut p = Params::new(6);
    p.strategy = Strategy::Filtered;
    let mut deflater = Deflater::with_params(p).unwrap();
    let compressed = deflater.compress_to_vec(&input).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_strategy_fixed() {
    let input = b"fixed blocks only, for decoders without dynamic tables";
    let mut p = Params::new(9);
    p.strategy = Strategy::Fixed;
    let mut deflater = Deflater::with_params(p).unwrap();
    let compressed = deflater.compress_to_vec(input).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_small_windows() {
    let input: Vec<u8> = (0..20000u32).map(|i| (i % 251) as u8).collect();

    for window_bits in [9, 10, 12, 15] {
        let mut p = Params::new(6);
        p.window_bits = window_bits;
        let mut deflater = Deflater::with_params(p).unwrap();
        let compressed = deflater.compress_to_vec(&input).unwrap();
        assert_eq!(
            inflate(&compressed).unwrap(),
            input,
            "window_bits {} failed",
            window_bits
        );
    }
}

#[test]
fn test_mem_levels() {
    let input = b"mem level changes the tally size, not the format".repeat(50);

    for mem_level in [1, 4, 8, 9] {
        let mut p = Params::new(6);
        p.mem_level = mem_level;
        let mut deflater = Deflater::with_params(p).unwrap();
        let compressed = deflater.compress_to_vec(&input).unwrap();
        assert_eq!(
            inflate(&compressed).unwrap(),
            input,
            "mem_level {} failed",
            mem_level
        );
    }
}

#[test]
fn test_small_window_with_sliding() {
    // A 512-byte window over 100K of input slides hundreds of times.
    let mut p = Params::new(6);
    p.window_bits = 9;
    p.mem_level = 1;
    let mut deflater = Deflater::with_params(p).unwrap();

    let input: Vec<u8> = (0..100_000u32).map(|i| (i * 7 % 127) as u8).collect();
    let compressed = deflater.compress_to_vec(&input).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_text_roundtrip_all_levels_and_strategies() {
    let input = b"It was the best of times, it was the worst of times, \
                  it was the age of wisdom, it was the age of foolishness"
        .repeat(20);

    for level in [1, 4, 6, 9] {
        for strategy in [
            Strategy::Default,
            Strategy::Filtered,
            Strategy::HuffmanOnly,
            Strategy::Rle,
            Strategy::Fixed,
        ] {
            let mut p = Params::new(level);
            p.strategy = strategy;
            let mut deflater = Deflater::with_params(p).unwrap();
            let compressed = deflater.compress_to_vec(&input).unwrap();
            assert_eq!(
                inflate(&compressed).unwrap(),
                input,
                "level {} strategy {:?} failed",
                level,
                strategy
            );
        }
    }
}

#[test]
fn test_finish_with_tiny_inputs() {
    for len in 0..=16 {
        let input: Vec<u8> = (0..len as u8).collect();
        let mut deflater = Deflater::new(6);
        let mut buffer = vec![0u8; 64];
        let (consumed, produced, status) = deflater
            .compress(&input, &mut buffer, FlushMode::Finish)
            .unwrap();
        assert_eq!(consumed, input.len());
        assert_eq!(status, CompressStatus::Done);
        assert_eq!(inflate(&buffer[..produced]).unwrap(), input, "len {}", len);
    }
}

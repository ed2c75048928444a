//! Adler-32 checksum.
//!
//! Adler-32 is the checksum the zlib container family uses to identify
//! uncompressed data and preset dictionaries. The compressor returns it from
//! dictionary priming so callers can match dictionaries across the two ends
//! of a stream.

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Number of bytes that can be summed before the accumulators must be reduced.
const NMAX: usize = 5552;

/// Adler-32 checksum calculator.
#[derive(Clone, Debug)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a new Adler-32 calculator.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Update the checksum with more data.
    pub fn update(&mut self, data: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        let mut remaining = data;

        // Reduce in chunks so the accumulators never overflow.
        while remaining.len() >= NMAX {
            let (chunk, rest) = remaining.split_at(NMAX);
            remaining = rest;

            for &byte in chunk {
                a += byte as u32;
                b += a;
            }

            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        for &byte in remaining {
            a += byte as u32;
            b += a;
        }

        self.a = a % ADLER_MOD;
        self.b = b % ADLER_MOD;
    }

    /// Finalize and return the checksum.
    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Compute the Adler-32 checksum of `data` in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.finish()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(Adler32::checksum(&[]), 1);
    }

    #[test]
    fn test_known_value() {
        assert_eq!(Adler32::checksum(b"Hello"), 0x058C01F5);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = b"Hello, World!";

        let one_shot = Adler32::checksum(data);

        let mut adler = Adler32::new();
        adler.update(&data[..6]);
        adler.update(&data[6..]);
        assert_eq!(adler.finish(), one_shot);
    }

    #[test]
    fn test_large_input() {
        let data = vec![0x42u8; 20000];
        let checksum = Adler32::checksum(&data);
        assert_ne!(checksum, 0);
        assert_ne!(checksum, 1);
    }
}

//! Single-page compression with an adaptive level heuristic.
//!
//! The codec is DEFLATE via `flate2`; any LZ-family compressor with an
//! integer level and a `compress_bound` would satisfy the same contract.

use crate::config::PAGE_SIZE;
use crate::error::{CoreError, Result};
use flate2::write::ZlibEncoder;
use flate2::read::ZlibDecoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Upper bound on the compressed size of an `n`-byte input. DEFLATE's worst
/// case is the input plus a small fixed overhead; round up generously so
/// callers can pre-size buffers without a second allocation.
pub fn compress_bound(n: usize) -> usize {
    n + (n / 1000) + 64
}

fn level_to_effort(level: u32) -> Compression {
    Compression::new(level.clamp(0, 9))
}

/// Compresses a page. `input` must be exactly `PAGE_SIZE` bytes.
pub fn compress(input: &[u8], level: u32) -> Result<Vec<u8>> {
    if input.len() != PAGE_SIZE {
        return Err(CoreError::CompressError(format!(
            "expected {} byte input, got {}",
            PAGE_SIZE,
            input.len()
        )));
    }
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(compress_bound(PAGE_SIZE)), level_to_effort(level));
    encoder
        .write_all(input)
        .map_err(|e| CoreError::CompressError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CoreError::CompressError(e.to_string()))
}

/// Decompresses into a caller-provided `PAGE_SIZE` buffer. Short inputs are
/// zero-filled at the tail; this mirrors the page cache's own partial-read
/// handling for the decompress-on-load design (see `DESIGN.md`, open question 1).
pub fn decompress(input: &[u8], out: &mut [u8]) -> Result<()> {
    if out.len() != PAGE_SIZE {
        return Err(CoreError::CompressError(format!(
            "expected {} byte output buffer, got {}",
            PAGE_SIZE,
            out.len()
        )));
    }
    let mut decoder = ZlibDecoder::new(input);
    out.fill(0);
    let mut scratch = Vec::with_capacity(PAGE_SIZE);
    decoder
        .read_to_end(&mut scratch)
        .map_err(|e| CoreError::CompressError(e.to_string()))?;
    let n = scratch.len().min(PAGE_SIZE);
    out[..n].copy_from_slice(&scratch[..n]);
    Ok(())
}

/// Shannon entropy of `data`, in bits per byte, in `[0, 8]`.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let len = data.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Entropy-driven level pick, used when the caller passes level `0`
/// (optional variant 4.A(b)).
pub fn entropy_level(data: &[u8]) -> u32 {
    let h = shannon_entropy(data);
    if h < 4.0 {
        1
    } else if h < 6.0 {
        3
    } else {
        5
    }
}

/// Tracks the ratio-feedback adaptive level (variant 4.A(a), mandatory).
///
/// Callers remember the last compressed size; the next page is compressed
/// at `max_lvl` if the previous one compressed poorly (ratio above
/// `threshold`), otherwise at `min_lvl`.
#[derive(Debug, Clone)]
pub struct AdaptiveLevel {
    prev_compressed: usize,
    min_lvl: u32,
    max_lvl: u32,
    threshold: f64,
}

impl AdaptiveLevel {
    pub fn new(min_lvl: u32, max_lvl: u32, threshold: f64) -> Self {
        Self {
            prev_compressed: PAGE_SIZE,
            min_lvl,
            max_lvl,
            threshold,
        }
    }

    /// The level to use for the *next* compression call.
    pub fn next_level(&self) -> u32 {
        if self.prev_compressed as f64 / PAGE_SIZE as f64 > self.threshold {
            self.max_lvl
        } else {
            self.min_lvl
        }
    }

    /// Records the size of a just-completed compression, feeding the next
    /// call to [`Self::next_level`].
    pub fn record(&mut self, compressed_len: usize) {
        self.prev_compressed = compressed_len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_constant_page() {
        let input = [7u8; PAGE_SIZE];
        let compressed = compress(&input, 6).unwrap();
        let mut out = [0u8; PAGE_SIZE];
        decompress(&compressed, &mut out).unwrap();
        assert_eq!(input, out);
    }

    #[test]
    fn round_trip_random_page() {
        let mut input = [0u8; PAGE_SIZE];
        let mut seed: u32 = 0x2545F491;
        for b in input.iter_mut() {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            *b = (seed & 0xFF) as u8;
        }
        let compressed = compress(&input, 1).unwrap();
        let mut out = [0u8; PAGE_SIZE];
        decompress(&compressed, &mut out).unwrap();
        assert_eq!(input, out);
    }

    #[test]
    fn constant_data_compresses_well() {
        let input = [0u8; PAGE_SIZE];
        let compressed = compress(&input, 6).unwrap();
        assert!(compressed.len() < PAGE_SIZE / 10);
    }

    #[test]
    fn adaptive_level_starts_at_max() {
        // prev_compressed seeds at PAGE_SIZE, i.e. a hypothetical prior page
        // that didn't compress at all, so the first real call uses max_lvl.
        let adaptive = AdaptiveLevel::new(1, 9, 0.8);
        assert_eq!(adaptive.next_level(), 9);
    }

    #[test]
    fn adaptive_level_drops_after_good_compression() {
        let mut adaptive = AdaptiveLevel::new(1, 9, 0.8);
        adaptive.record((PAGE_SIZE as f64 * 0.1) as usize);
        assert_eq!(adaptive.next_level(), 1);
        adaptive.record((PAGE_SIZE as f64 * 0.9) as usize);
        assert_eq!(adaptive.next_level(), 9);
    }

    #[test]
    fn entropy_picks_expected_buckets() {
        let zeros = [0u8; PAGE_SIZE];
        assert_eq!(entropy_level(&zeros), 1);

        let mut alternating = [0u8; PAGE_SIZE];
        for (i, b) in alternating.iter_mut().enumerate() {
            *b = (i % 4) as u8;
        }
        assert!(entropy_level(&alternating) >= 1);
    }

    #[test]
    fn compress_bound_is_safe_for_empty_input() {
        assert!(compress_bound(0) >= 0);
    }
}

#![forbid(unsafe_code)]

//! Coarse randomness scoring for write buffers.
//!
//! Scores are Shannon entropy over the 256 byte values, normalized to a
//! byte: `round(H / 8 * 255)`. Encrypted or compressed output lands near
//! 255, text and structured data well below.

/// Size of the preview carried by every record.
pub const PREVIEW_LEN: usize = 16;
/// Number of profile windows following the head score.
pub const PROFILE_WINDOWS: usize = PREVIEW_LEN - 1;

/// Normalized entropy of `data`. Empty or absent input scores 0.
pub fn score(data: Option<&[u8]>) -> u8 {
    match data {
        Some(data) if !data.is_empty() => normalize(shannon(data)),
        _ => 0,
    }
}

/// Shannon entropy in bits per byte, `0.0..=8.0`.
fn shannon(data: &[u8]) -> f64 {
    let mut frequency = [0u64; 256];
    for &byte in data {
        frequency[byte as usize] += 1;
    }

    let len = data.len() as f64;
    frequency
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let probability = count as f64 / len;
            -probability * probability.log2()
        })
        .sum()
}

fn normalize(entropy: f64) -> u8 {
    (entropy / 8.0 * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Randomness summary of the first bytes of a write.
///
/// Byte 0 scores the whole sample. Bytes 1.. score consecutive windows of
/// the sample so a consumer can tell an encrypted body behind a plain
/// header from uniformly random output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntropyPreview([u8; PREVIEW_LEN]);

impl EntropyPreview {
    pub const fn zeroed() -> Self {
        Self([0; PREVIEW_LEN])
    }

    /// Sample at most `budget` leading bytes of `buffer`.
    pub fn compute(buffer: &[u8], budget: usize) -> Self {
        let sample = &buffer[..buffer.len().min(budget)];
        let mut preview = [0u8; PREVIEW_LEN];
        if sample.is_empty() {
            return Self(preview);
        }

        preview[0] = score(Some(sample));
        let window = sample.len().div_ceil(PROFILE_WINDOWS);
        for (slot, chunk) in preview[1..].iter_mut().zip(sample.chunks(window)) {
            *slot = score(Some(chunk));
        }
        Self(preview)
    }

    pub const fn from_bytes(bytes: [u8; PREVIEW_LEN]) -> Self {
        Self(bytes)
    }

    /// Score of the whole sample.
    pub fn score(&self) -> u8 {
        self.0[0]
    }

    pub fn profile(&self) -> &[u8] {
        &self.0[1..]
    }

    pub fn as_bytes(&self) -> &[u8; PREVIEW_LEN] {
        &self.0
    }
}

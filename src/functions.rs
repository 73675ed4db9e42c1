//! One-shot conveniences over whole in-memory buffers.
//!
//! These drive the incremental state machines to completion in a single
//! call. [`decompress`] rents its context from the process-wide pool and
//! pre-sizes its output from the frame's advertised content size when one
//! is present, falling back to doubling otherwise. Concatenated frames
//! decode to their concatenated payloads.

use crate::codec;
use crate::frame::compress::Compressor;
use crate::frame::types::{Status, ZstdError};
use crate::pool;

/// Worst-case compressed size for `src_size` bytes in a single frame.
pub fn compress_bound(src_size: usize) -> usize {
    codec::compress_bound(src_size)
}

/// Compress `src` into a single frame at `level`.
pub fn compress(src: &[u8], level: i32) -> Result<Vec<u8>, ZstdError> {
    let mut comp = Compressor::with_level(level)?;
    let mut dst = vec![0u8; codec::compress_bound(src.len())];
    let (status, consumed, written) = comp.compress(src, &mut dst, true)?;
    // A bound-sized destination always completes in one call.
    debug_assert_eq!(status, Status::Done);
    debug_assert_eq!(consumed, src.len());
    dst.truncate(written);
    Ok(dst)
}

/// Decompress a whole stream of one or more concatenated frames.
///
/// Unlike the stream adapters, truncated input here is an error: a buffer
/// handed over in full that ends mid-frame fails with `InvalidData`.
pub fn decompress(src: &[u8]) -> Result<Vec<u8>, ZstdError> {
    let capacity = match codec::get_frame_content_size(src) {
        Ok(Some(n)) if n > 0 => usize::try_from(n).unwrap_or(pool::SCRATCH_BUFFER_SIZE),
        _ => pool::SCRATCH_BUFFER_SIZE,
    };
    decompress_with_capacity(src, capacity)
}

/// [`decompress`] with an explicit initial output capacity, for callers
/// that know the decoded size better than the frame header does.
pub fn decompress_with_capacity(
    src: &[u8],
    initial_capacity: usize,
) -> Result<Vec<u8>, ZstdError> {
    let mut dec = pool::rent()?;
    let mut out = vec![0u8; initial_capacity.max(1)];
    let mut out_pos = 0;
    let mut in_pos = 0;

    loop {
        let (status, consumed, written, frame_finished) =
            dec.decompress(&src[in_pos..], &mut out[out_pos..], true)?;
        in_pos += consumed;
        out_pos += written;

        if in_pos == src.len() && (frame_finished || written == 0) {
            if !frame_finished {
                return Err(ZstdError::InvalidData(
                    "compressed buffer ends mid-frame".into(),
                ));
            }
            out.truncate(out_pos);
            return Ok(out);
        }
        match status {
            Status::DestinationTooSmall => {
                let target = out.len().saturating_mul(2);
                out.resize(target, 0);
            }
            Status::NeedMoreData => {
                return Err(ZstdError::InvalidData(
                    "compressed buffer ends mid-frame".into(),
                ));
            }
            Status::Done => {}
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let payload = b"one-shot helpers".repeat(500);
        let compressed = compress(&payload, 3).unwrap();
        assert!(compressed.len() < payload.len());
        assert_eq!(decompress(&compressed).unwrap(), payload);
    }

    #[test]
    fn empty_round_trip() {
        let compressed = compress(b"", 3).unwrap();
        assert!(!compressed.is_empty());
        assert_eq!(decompress(&compressed).unwrap(), b"");
    }

    #[test]
    fn concatenated_frames_round_trip() {
        let mut blob = compress(&b"left".repeat(100), 1).unwrap();
        blob.extend_from_slice(&compress(&b"right".repeat(100), 19).unwrap());
        let mut expected = b"left".repeat(100);
        expected.extend_from_slice(&b"right".repeat(100));
        assert_eq!(decompress(&blob).unwrap(), expected);
    }

    #[test]
    fn truncated_buffer_is_invalid_data() {
        let compressed = compress(&b"cut short".repeat(300), 3).unwrap();
        let cut = &compressed[..compressed.len() - 5];
        assert!(matches!(
            decompress(cut),
            Err(ZstdError::InvalidData(_))
        ));
    }

    #[test]
    fn tiny_initial_capacity_grows() {
        let payload = b"growth curve".repeat(2000);
        let compressed = compress(&payload, 3).unwrap();
        assert_eq!(decompress_with_capacity(&compressed, 1).unwrap(), payload);
    }

    /// Larger levels must not produce larger output on a compressible,
    /// non-degenerate corpus.
    #[test]
    fn level_monotonicity_on_fixed_corpus() {
        let corpus: Vec<u8> = (0..96 * 1024u32)
            .flat_map(|i| {
                let word = [b"alpha", b"gamma", b"delta"][(i % 3) as usize];
                word.iter().copied().chain(std::iter::once((i % 251) as u8))
            })
            .collect();
        assert!(corpus.len() >= 64 * 1024);

        let at_min = compress(&corpus, codec::min_compression_level()).unwrap();
        let at_max = compress(&corpus, codec::max_compression_level()).unwrap();
        assert!(at_max.len() <= at_min.len());
        assert_eq!(decompress(&at_max).unwrap(), corpus);
        assert_eq!(decompress(&at_min).unwrap(), corpus);
    }
}

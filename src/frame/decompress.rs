//! Incremental frame decompression.
//!
//! [`Decompressor`] is the read-side counterpart of
//! [`Compressor`](crate::frame::compress::Compressor): one compressed chunk
//! in, a tri-state [`Status`] plus progress counters out, with an extra
//! `frame_finished` signal that is `true` exactly when the end marker of the
//! current frame has been observed. After a finished frame the decompressor
//! is immediately ready for the next frame header — concatenated members
//! decode back-to-back in one session with no reset in between.

use crate::codec::{self, DCtxHandle, InBuffer, OutBuffer};
use crate::frame::types::{Status, ZstdError, WINDOW_LOG_MAX, WINDOW_LOG_MIN};

/// Streaming frame decompressor over a native decompression context.
pub struct Decompressor {
    ctx: DCtxHandle,
    /// Cap on the decoder window, pushed lazily like the compressor's
    /// configuration.
    window_log_max: Option<u32>,
    initialized: bool,
}

impl Decompressor {
    /// Create a decompressor with the codec's default window limit.
    pub fn new() -> Result<Self, ZstdError> {
        if codec::version_number() < codec::MIN_SUPPORTED_VERSION {
            return Err(ZstdError::Fatal(
                "linked zstd library lacks the unified streaming interface".into(),
            ));
        }
        let ctx = DCtxHandle::new().map_err(|e| ZstdError::Fatal(e.name()))?;
        Ok(Decompressor {
            ctx,
            window_log_max: None,
            initialized: false,
        })
    }

    /// Bound the sliding window the decoder will allocate for untrusted
    /// input.
    ///
    /// `window_log` must lie in `[10, 31]`; values inside that range the
    /// codec itself does not support are rejected by the codec on first use.
    /// Fails with `IllegalState` once the session is initialized (any
    /// `decompress` call since construction or the last `reset`).
    pub fn set_window_log_max(&mut self, window_log: u32) -> Result<(), ZstdError> {
        if self.initialized {
            return Err(ZstdError::IllegalState(
                "window limit cannot change during an active session",
            ));
        }
        if !(WINDOW_LOG_MIN..=WINDOW_LOG_MAX).contains(&window_log) {
            return Err(ZstdError::InvalidArgument(
                "window log outside the [10, 31] range",
            ));
        }
        self.window_log_max = Some(window_log);
        Ok(())
    }

    /// Decompress one chunk.
    ///
    /// Returns `(status, consumed, written, frame_finished)`:
    ///
    /// - `frame_finished` is `true` exactly when this call observed the end
    ///   marker of the current frame; the next consumed byte then starts a
    ///   new frame header.
    /// - `DestinationTooSmall` — `dst` filled with the frame still open.
    /// - `NeedMoreData` — all input consumed and the codec expects more.
    ///   With `final_block` set this is how truncated input surfaces: more
    ///   data is needed but none will come, and the caller observes an
    ///   end-of-stream without frame closure.
    /// - `Done` — anything else, including a finished frame with input left
    ///   over (the leftover belongs to the next member).
    ///
    /// Codec failures surface as [`ZstdError::InvalidData`].
    pub fn decompress(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        final_block: bool,
    ) -> Result<(Status, usize, usize, bool), ZstdError> {
        self.ensure_initialized()?;

        let mut input = InBuffer::around(src);
        let mut output = OutBuffer::around(dst);
        let hint = self
            .ctx
            .decompress_stream(&mut output, &mut input)
            .map_err(|e| ZstdError::InvalidData(e.name()))?;

        let consumed = input.pos;
        let written = output.pos;
        let frame_finished = hint == 0;

        let status = if written == dst.len() && !frame_finished {
            Status::DestinationTooSmall
        } else if !final_block && consumed == src.len() && !frame_finished && hint > 0 {
            Status::NeedMoreData
        } else if final_block && !frame_finished && consumed == src.len() && hint > 0 {
            // Truncated input: more data is needed but none will come. The
            // caller observes an end-of-stream without frame closure.
            Status::NeedMoreData
        } else {
            Status::Done
        };
        Ok((status, consumed, written, frame_finished))
    }

    /// Session-only reset: drops any half-decoded frame and returns the
    /// context to its just-created state (allocations may be reused). The
    /// window limit becomes settable again.
    pub fn reset(&mut self) -> Result<(), ZstdError> {
        self.ctx
            .reset_session()
            .map_err(|e| ZstdError::InvalidData(e.name()))?;
        self.initialized = false;
        Ok(())
    }

    fn ensure_initialized(&mut self) -> Result<(), ZstdError> {
        if self.initialized {
            return Ok(());
        }
        if let Some(log) = self.window_log_max {
            self.ctx
                .set_window_log_max(log)
                .map_err(|e| ZstdError::InvalidData(e.name()))?;
        }
        self.initialized = true;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::compress::Compressor;

    fn compress_frame(payload: &[u8], level: i32) -> Vec<u8> {
        let mut comp = Compressor::with_level(level).unwrap();
        let mut dst = vec![0u8; codec::compress_bound(payload.len())];
        let (status, _, written) = comp.compress(payload, &mut dst, true).unwrap();
        assert_eq!(status, Status::Done);
        dst.truncate(written);
        dst
    }

    #[test]
    fn whole_frame_in_one_call() {
        let payload = b"incremental decoding".repeat(100);
        let frame = compress_frame(&payload, 3);

        let mut dec = Decompressor::new().unwrap();
        let mut dst = vec![0u8; payload.len()];
        let (status, consumed, written, finished) =
            dec.decompress(&frame, &mut dst, true).unwrap();
        assert_eq!(status, Status::Done);
        assert_eq!(consumed, frame.len());
        assert_eq!(written, payload.len());
        assert!(finished);
        assert_eq!(dst, payload);
    }

    /// One-byte destinations force `DestinationTooSmall` on every step until
    /// the frame closes.
    #[test]
    fn single_byte_destination_steps() {
        let payload = b"tiny destination".repeat(32);
        let frame = compress_frame(&payload, 1);

        let mut dec = Decompressor::new().unwrap();
        let mut out = Vec::new();
        let mut pos = 0;
        let mut byte = [0u8; 1];
        loop {
            let (status, consumed, written, finished) =
                dec.decompress(&frame[pos..], &mut byte, true).unwrap();
            pos += consumed;
            out.extend_from_slice(&byte[..written]);
            if finished {
                break;
            }
            assert!(
                matches!(status, Status::DestinationTooSmall | Status::NeedMoreData),
                "unexpected status {status:?}"
            );
        }
        assert_eq!(out, payload);
        assert_eq!(pos, frame.len());
    }

    /// Dribbling compressed input one byte at a time exercises the
    /// `NeedMoreData` path.
    #[test]
    fn single_byte_source_steps() {
        let payload = b"tiny source".repeat(32);
        let frame = compress_frame(&payload, 1);

        let mut dec = Decompressor::new().unwrap();
        let mut out = vec![0u8; payload.len()];
        let mut out_pos = 0;
        let mut finished = false;
        for (i, chunk) in frame.chunks(1).enumerate() {
            let is_last = i + 1 == frame.len();
            let (_, consumed, written, done) =
                dec.decompress(chunk, &mut out[out_pos..], is_last).unwrap();
            assert_eq!(consumed, 1);
            out_pos += written;
            finished = done;
        }
        assert!(finished);
        assert_eq!(&out[..out_pos], &payload[..]);
    }

    /// Two concatenated frames decode in one session; `frame_finished` fires
    /// at each boundary without an intervening reset.
    #[test]
    fn concatenated_frames_decode_transparently() {
        let a = vec![b'A'; 4096];
        let b = vec![b'B'; 4096];
        let mut blob = compress_frame(&a, 3);
        let first_len = blob.len();
        blob.extend_from_slice(&compress_frame(&b, 3));

        let mut dec = Decompressor::new().unwrap();
        let mut dst = vec![0u8; 8192];

        let (status, consumed, written, finished) =
            dec.decompress(&blob, &mut dst, true).unwrap();
        assert_eq!(status, Status::Done);
        assert_eq!(consumed, first_len);
        assert_eq!(written, a.len());
        assert!(finished);

        let (status, consumed2, written2, finished) =
            dec.decompress(&blob[consumed..], &mut dst[written..], true).unwrap();
        assert_eq!(status, Status::Done);
        assert_eq!(consumed + consumed2, blob.len());
        assert_eq!(written2, b.len());
        assert!(finished);
        assert_eq!(&dst[..a.len()], &a[..]);
        assert_eq!(&dst[a.len()..], &b[..]);
    }

    /// A proper prefix of a valid frame yields a prefix of the original and
    /// reports `NeedMoreData` instead of failing.
    #[test]
    fn truncated_input_is_need_more_data_not_error() {
        let payload = b"truncation safety".repeat(500);
        let frame = compress_frame(&payload, 3);
        let cut = &frame[..frame.len() / 2];

        let mut dec = Decompressor::new().unwrap();
        let mut dst = vec![0u8; payload.len()];
        let (status, consumed, written, finished) =
            dec.decompress(cut, &mut dst, true).unwrap();
        assert_eq!(status, Status::NeedMoreData);
        assert_eq!(consumed, cut.len());
        assert!(!finished);
        assert_eq!(&dst[..written], &payload[..written]);
    }

    #[test]
    fn corrupt_input_is_invalid_data() {
        let mut frame = compress_frame(&b"corrupt me".repeat(100), 3);
        let mid = frame.len() / 2;
        frame[mid] ^= 0xFF;
        frame[mid + 1] ^= 0xFF;

        let mut dec = Decompressor::new().unwrap();
        let mut dst = vec![0u8; 4096];
        let result = (|| -> Result<(), ZstdError> {
            let mut pos = 0;
            loop {
                let (_, consumed, _, finished) =
                    dec.decompress(&frame[pos..], &mut dst, true)?;
                pos += consumed;
                if finished || consumed == 0 {
                    return Ok(());
                }
            }
        })();
        assert!(matches!(result, Err(ZstdError::InvalidData(_))));
    }

    #[test]
    fn window_log_validation_and_lock() {
        let mut dec = Decompressor::new().unwrap();
        assert!(matches!(
            dec.set_window_log_max(9),
            Err(ZstdError::InvalidArgument(_))
        ));
        assert!(matches!(
            dec.set_window_log_max(32),
            Err(ZstdError::InvalidArgument(_))
        ));
        dec.set_window_log_max(27).unwrap();

        let frame = compress_frame(b"window limited", 3);
        let mut dst = vec![0u8; 64];
        dec.decompress(&frame, &mut dst, true).unwrap();
        assert!(matches!(
            dec.set_window_log_max(20),
            Err(ZstdError::IllegalState(_))
        ));

        dec.reset().unwrap();
        dec.set_window_log_max(20).unwrap();
    }

    /// A window limit below what the frame requires must reject the frame.
    #[test]
    fn window_limit_rejects_oversized_frame() {
        // 4 MiB of incompressible-ish data forces a window above 2^10.
        let payload: Vec<u8> = (0..4 * 1024 * 1024u32)
            .map(|i| (i.wrapping_mul(2654435761) >> 24) as u8)
            .collect();
        let frame = compress_frame(&payload, 1);

        let mut dec = Decompressor::new().unwrap();
        dec.set_window_log_max(10).unwrap();
        let mut dst = vec![0u8; 64 * 1024];
        let mut pos = 0;
        let result = loop {
            match dec.decompress(&frame[pos..], &mut dst, true) {
                Ok((_, consumed, _, finished)) => {
                    pos += consumed;
                    if finished {
                        break Ok(());
                    }
                }
                Err(e) => break Err(e),
            }
        };
        assert!(matches!(result, Err(ZstdError::InvalidData(_))));
    }
}

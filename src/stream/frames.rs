//! Async frame iterator: decode a concatenated stream one whole frame at a
//! time.
//!
//! [`FrameStream::next_frame`] yields each member's fully decompressed
//! bytes together with the metadata parsed from its header. The output
//! buffer for a frame grows by doubling until the frame completes or an
//! optional [`max_frame_size`](FrameStream::with_max_frame_size) cap is hit
//! (`ResourceLimit`). The decoder is reset between frames, so a poisoned
//! member cannot leak state into the next one.
//!
//! Degenerate empty members (zero decompressed bytes from at most 8
//! consumed bytes — e.g. an empty skippable frame) are swallowed rather
//! than yielded.

use std::mem;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::cancel::CancelToken;
use crate::codec::{self, HeaderParse, RawFrameHeader};
use crate::frame::decompress::Decompressor;
use crate::frame::types::{FrameInfo, Status, ZstdError, MAX_FRAME_HEADER_SIZE};
use crate::pool;

/// First allocation for a frame's output; doubled as needed.
const INITIAL_FRAME_CAPACITY: usize = 16 * 1024;

/// Consumed-byte threshold under which an empty frame is considered
/// spurious and swallowed.
const EMPTY_FRAME_MAX_BYTES: u64 = 8;

/// One decoded member of a concatenated stream.
#[derive(Debug)]
pub struct DecodedFrame {
    /// Header metadata plus exact offset and on-wire size.
    pub info: FrameInfo,
    /// The frame's decompressed bytes (empty for skippable members large
    /// enough to be yielded).
    pub data: Vec<u8>,
}

/// Async iterator over whole decoded frames.
pub struct FrameStream<R: AsyncRead + Unpin> {
    dec: Decompressor,
    inner: R,
    scratch: Vec<u8>,
    in_pos: usize,
    in_len: usize,
    source_depleted: bool,
    /// Stream offset of the next frame to decode.
    offset: u64,
    max_frame_size: Option<usize>,
    cancel: Option<CancelToken>,
    /// Staging area for the current frame's header bytes, filled before the
    /// decoder consumes them.
    header_buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameStream<R> {
    /// Iterate frames from `source`, which must start at a frame boundary.
    pub fn new(source: R) -> Result<Self, ZstdError> {
        Ok(FrameStream {
            dec: Decompressor::new()?,
            inner: source,
            scratch: pool::rent_scratch(),
            in_pos: 0,
            in_len: 0,
            source_depleted: false,
            offset: 0,
            max_frame_size: None,
            cancel: None,
            header_buf: Vec::with_capacity(MAX_FRAME_HEADER_SIZE),
        })
    }

    /// Cap the decompressed size of a single frame; a frame needing more
    /// fails with [`ZstdError::ResourceLimit`].
    pub fn with_max_frame_size(mut self, limit: usize) -> Self {
        self.max_frame_size = Some(limit);
        self
    }

    /// Attach a cancellation token polled before every refill.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Replace or remove the cancellation token, e.g. to resume after a
    /// cancelled operation.
    pub fn set_cancel(&mut self, token: Option<CancelToken>) {
        self.cancel = token;
    }

    /// Decode the next frame. `Ok(None)` once the source is exhausted; a
    /// truncated trailing member is treated as end-of-stream and its
    /// partial bytes are discarded.
    pub async fn next_frame(&mut self) -> Result<Option<DecodedFrame>, ZstdError> {
        if let Some(token) = &self.cancel {
            token.check()?;
        }
        // Outer loop only repeats when a spurious empty frame was
        // swallowed.
        loop {
            match self.decode_one().await? {
                Decoded::Frame(frame) => return Ok(Some(frame)),
                Decoded::Swallowed => continue,
                Decoded::EndOfStream => return Ok(None),
            }
        }
    }

    async fn decode_one(&mut self) -> Result<Decoded, ZstdError> {
        // Fresh decoder session per frame.
        self.dec.reset()?;
        self.header_buf.clear();

        let initial = match self.max_frame_size {
            Some(cap) => INITIAL_FRAME_CAPACITY.min(cap.max(1)),
            None => INITIAL_FRAME_CAPACITY,
        };
        let mut out = vec![0u8; initial];
        let mut out_pos = 0;
        let mut consumed_in_frame: u64 = 0;
        let mut header: Option<RawFrameHeader> = None;

        loop {
            if self.in_pos == self.in_len && !self.source_depleted {
                if let Some(token) = &self.cancel {
                    token.check()?;
                }
                let n = self.inner.read(&mut self.scratch).await?;
                if n == 0 {
                    self.source_depleted = true;
                } else {
                    self.in_pos = 0;
                    self.in_len = n;
                }
            }
            if self.in_pos == self.in_len && self.source_depleted {
                // Clean end between frames, or a truncated tail whose
                // partial bytes nobody can use.
                return Ok(Decoded::EndOfStream);
            }

            let window_start = self.in_pos;
            let (status, consumed, written, finished) = self.dec.decompress(
                &self.scratch[self.in_pos..self.in_len],
                &mut out[out_pos..],
                self.source_depleted,
            )?;
            self.in_pos += consumed;
            out_pos += written;
            consumed_in_frame += consumed as u64;

            // Mirror the frame's first consumed bytes so the header query
            // can run against them; the decoder always swallows the header
            // before producing output.
            if header.is_none() && self.header_buf.len() < MAX_FRAME_HEADER_SIZE {
                let want = MAX_FRAME_HEADER_SIZE - self.header_buf.len();
                let take = want.min(consumed);
                self.header_buf
                    .extend_from_slice(&self.scratch[window_start..window_start + take]);
            }

            // Once the first compressed bytes are in, the header query can
            // be answered from the staged window.
            if header.is_none() && consumed_in_frame > 0 {
                match codec::get_frame_header(&self.header_buf)
                    .map_err(|e| ZstdError::InvalidData(e.name()))?
                {
                    HeaderParse::Done(raw) => header = Some(raw),
                    HeaderParse::NeedMore(_) => {}
                }
            }

            if finished {
                out.truncate(out_pos);
                let start = self.offset;
                self.offset += consumed_in_frame;
                if out_pos == 0 && consumed_in_frame <= EMPTY_FRAME_MAX_BYTES {
                    return Ok(Decoded::Swallowed);
                }
                let raw = header.ok_or_else(|| {
                    ZstdError::InvalidData("frame ended before its header was readable".into())
                })?;
                return Ok(Decoded::Frame(DecodedFrame {
                    info: FrameInfo::from_raw(raw, start, consumed_in_frame),
                    data: out,
                }));
            }

            match status {
                Status::DestinationTooSmall => {
                    self.grow(&mut out)?;
                }
                Status::NeedMoreData | Status::Done => {}
            }
        }
    }

    /// Double the output buffer, honoring the configured cap.
    fn grow(&self, out: &mut Vec<u8>) -> Result<(), ZstdError> {
        let current = out.len();
        let mut target = current.saturating_mul(2).max(INITIAL_FRAME_CAPACITY);
        if let Some(cap) = self.max_frame_size {
            if current >= cap {
                return Err(ZstdError::ResourceLimit {
                    limit: cap,
                    needed: current.saturating_add(1),
                });
            }
            target = target.min(cap);
        }
        out.resize(target, 0);
        Ok(())
    }
}

impl<R: AsyncRead + Unpin> Drop for FrameStream<R> {
    fn drop(&mut self) {
        pool::return_scratch(mem::take(&mut self.scratch));
    }
}

enum Decoded {
    Frame(DecodedFrame),
    Swallowed,
    EndOfStream,
}

//! Decompressing reader over any `std::io::Read` source.
//!
//! [`ZstdReader`] refills a pooled scratch buffer from the underlying
//! source and drives a [`Decompressor`] against the caller's destination.
//! Concatenated frames decode transparently — the reader crosses member
//! boundaries without surfacing them. A source that ends mid-frame is
//! reported as a short end-of-stream, not an error; callers needing
//! integrity must verify lengths or checksums themselves.

use std::io::{self, Read};
use std::mem;
use std::sync::atomic::AtomicBool;

use crate::frame::decompress::Decompressor;
use crate::frame::types::{Status, ZstdError};
use crate::pool;
use crate::stream::OpGuard;

/// Streaming frame decompressor bound to a byte source.
pub struct ZstdReader<R: Read> {
    dec: Decompressor,
    /// `None` once `into_inner` has taken the source back.
    inner: Option<R>,
    /// Pooled staging area for compressed input; returned on drop.
    scratch: Vec<u8>,
    /// Consumed prefix of the valid region.
    in_pos: usize,
    /// Valid bytes at the front of `scratch`.
    in_len: usize,
    /// The source returned 0 bytes; no refill will be attempted again until
    /// a reset.
    source_depleted: bool,
    active: AtomicBool,
}

impl<R: Read> ZstdReader<R> {
    /// Decompress from `source` with a default-configured decompressor.
    pub fn new(source: R) -> Result<Self, ZstdError> {
        Self::with_decompressor(Decompressor::new()?, source)
    }

    /// Wrap a pre-configured decompressor (e.g. one with a window limit).
    pub fn with_decompressor(dec: Decompressor, source: R) -> Result<Self, ZstdError> {
        Ok(ZstdReader {
            dec,
            inner: Some(source),
            scratch: pool::rent_scratch(),
            in_pos: 0,
            in_len: 0,
            source_depleted: false,
            active: AtomicBool::new(false),
        })
    }

    /// Shared reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        self.inner.as_ref().expect("source already taken")
    }

    /// Mutable reference to the underlying source.
    pub fn get_mut(&mut self) -> &mut R {
        self.inner.as_mut().expect("source already taken")
    }

    /// Consume the reader, returning the underlying source. Buffered
    /// compressed bytes that were read ahead are discarded.
    pub fn into_inner(mut self) -> R {
        self.inner.take().expect("source already taken")
    }

    /// Reset the decoder and discard buffered input, so the next read
    /// starts a fresh frame from whatever follows in the source.
    pub fn reset(&mut self) -> Result<(), ZstdError> {
        let _op = OpGuard::enter(&self.active)?;
        self.dec.reset()?;
        self.in_pos = 0;
        self.in_len = 0;
        self.source_depleted = false;
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ZstdError> {
        let _op = OpGuard::enter(&self.active)?;
        if buf.is_empty() {
            return Ok(0);
        }

        let mut total = 0;
        loop {
            if total == buf.len() {
                break;
            }
            if self.in_pos == self.in_len && !self.source_depleted {
                let n = self
                    .inner
                    .as_mut()
                    .expect("source already taken")
                    .read(&mut self.scratch)?;
                if n == 0 {
                    self.source_depleted = true;
                } else {
                    self.in_pos = 0;
                    self.in_len = n;
                }
            }

            let (status, consumed, written, _finished) = self.dec.decompress(
                &self.scratch[self.in_pos..self.in_len],
                &mut buf[total..],
                self.source_depleted,
            )?;
            self.in_pos += consumed;
            total += written;

            match status {
                // Caller's buffer filled mid-frame; hand back what we have.
                Status::DestinationTooSmall => {
                    if total > 0 {
                        break;
                    }
                }
                // Needs another refill round — or, with the source dry, the
                // stream is truncated and ends here, short.
                Status::NeedMoreData => {
                    if self.source_depleted {
                        break;
                    }
                }
                // Frame boundary or buffered input exhausted; keep going
                // into the next member unless the stream is over.
                Status::Done => {
                    if self.source_depleted && self.in_pos == self.in_len {
                        break;
                    }
                }
            }
        }
        Ok(total)
    }
}

impl<R: Read> Read for ZstdReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf).map_err(io::Error::from)
    }
}

impl<R: Read> Drop for ZstdReader<R> {
    fn drop(&mut self) {
        pool::return_scratch(mem::take(&mut self.scratch));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

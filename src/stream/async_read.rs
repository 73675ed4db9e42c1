//! Decompressing reader over any `tokio::io::AsyncRead` source.
//!
//! The async twin of [`ZstdReader`](crate::stream::ZstdReader): same refill
//! loop, same transparent handling of concatenated frames, same
//! truncation-as-short-EOF behavior. Suspension happens only at refills
//! from the underlying source; an optional [`CancelToken`] is polled on
//! entry and before each refill.

use std::mem;
use std::sync::atomic::AtomicBool;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::cancel::CancelToken;
use crate::frame::decompress::Decompressor;
use crate::frame::types::{Status, ZstdError};
use crate::pool;
use crate::stream::OpGuard;

/// Streaming frame decompressor bound to an async byte source.
pub struct AsyncZstdReader<R: AsyncRead + Unpin> {
    dec: Decompressor,
    inner: Option<R>,
    scratch: Vec<u8>,
    in_pos: usize,
    in_len: usize,
    source_depleted: bool,
    active: AtomicBool,
    cancel: Option<CancelToken>,
}

impl<R: AsyncRead + Unpin> AsyncZstdReader<R> {
    /// Decompress from `source` with a default-configured decompressor.
    pub fn new(source: R) -> Result<Self, ZstdError> {
        Self::with_decompressor(Decompressor::new()?, source)
    }

    /// Wrap a pre-configured decompressor (e.g. one with a window limit).
    pub fn with_decompressor(dec: Decompressor, source: R) -> Result<Self, ZstdError> {
        Ok(AsyncZstdReader {
            dec,
            inner: Some(source),
            scratch: pool::rent_scratch(),
            in_pos: 0,
            in_len: 0,
            source_depleted: false,
            active: AtomicBool::new(false),
            cancel: None,
        })
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

    /// Consume the reader, returning the underlying source.
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

    /// Read decompressed bytes into `buf`; `Ok(0)` signals end of stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ZstdError> {
        let _op = OpGuard::enter(&self.active)?;
        if let Some(token) = &self.cancel {
            token.check()?;
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let mut total = 0;
        loop {
            if total == buf.len() {
                break;
            }
            if self.in_pos == self.in_len && !self.source_depleted {
                if let Some(token) = &self.cancel {
                    token.check()?;
                }
                let n = self
                    .inner
                    .as_mut()
                    .expect("source already taken")
                    .read(&mut self.scratch)
                    .await?;
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
                Status::DestinationTooSmall => {
                    if total > 0 {
                        break;
                    }
                }
                Status::NeedMoreData => {
                    if self.source_depleted {
                        break;
                    }
                }
                Status::Done => {
                    if self.source_depleted && self.in_pos == self.in_len {
                        break;
                    }
                }
            }
        }
        Ok(total)
    }

    /// Read the whole remaining stream into `out`, returning the number of
    /// bytes appended.
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize, ZstdError> {
        let mut chunk = vec![0u8; pool::SCRATCH_BUFFER_SIZE];
        let mut appended = 0;
        loop {
            let n = self.read(&mut chunk).await?;
            if n == 0 {
                return Ok(appended);
            }
            out.extend_from_slice(&chunk[..n]);
            appended += n;
        }
    }
}

impl<R: AsyncRead + Unpin> Drop for AsyncZstdReader<R> {
    fn drop(&mut self) {
        pool::return_scratch(mem::take(&mut self.scratch));
    }
}

//! Compressing writer over any `tokio::io::AsyncWrite` sink.
//!
//! [`AsyncZstdWriter`] mirrors [`ZstdWriter`](crate::stream::ZstdWriter)
//! contract-for-contract; the codec itself is always driven synchronously
//! and the only suspension points are the writes into the underlying sink.
//! An optional [`CancelToken`] is polled on entry and before every sink
//! round-trip: once cancellation is observed the call fails with
//! `Cancelled` and the codec is not advanced further. Partial progress is
//! not rolled back — a [`reset`](crate::Compressor::reset) makes the
//! context reusable.
//!
//! There is no async drop: call [`AsyncZstdWriter::finish`] to terminate
//! the stream. A writer dropped without finishing leaves the last frame
//! unterminated.

use std::mem;
use std::sync::atomic::AtomicBool;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::cancel::CancelToken;
use crate::frame::compress::Compressor;
use crate::frame::types::{CompressionQuality, Status, ZstdError};
use crate::pool;
use crate::stream::OpGuard;

/// Streaming frame compressor bound to an async byte sink.
pub struct AsyncZstdWriter<W: AsyncWrite + Unpin> {
    comp: Compressor,
    inner: Option<W>,
    scratch: Vec<u8>,
    pending_frame_reset: bool,
    finished: bool,
    errored: bool,
    active: AtomicBool,
    cancel: Option<CancelToken>,
}

impl<W: AsyncWrite + Unpin> AsyncZstdWriter<W> {
    /// Compress at the default level into `sink`.
    pub fn new(sink: W) -> Result<Self, ZstdError> {
        Self::with_compressor(Compressor::new()?, sink)
    }

    /// Compress at an explicit level.
    pub fn with_level(sink: W, level: i32) -> Result<Self, ZstdError> {
        Self::with_compressor(Compressor::with_level(level)?, sink)
    }

    /// Compress at a [`CompressionQuality`]-selected level.
    pub fn with_quality(sink: W, quality: CompressionQuality) -> Result<Self, ZstdError> {
        Self::with_compressor(Compressor::with_level(quality.to_level())?, sink)
    }

    /// Wrap a pre-configured compressor.
    pub fn with_compressor(comp: Compressor, sink: W) -> Result<Self, ZstdError> {
        Ok(AsyncZstdWriter {
            comp,
            inner: Some(sink),
            scratch: pool::rent_scratch(),
            pending_frame_reset: false,
            finished: false,
            errored: false,
            active: AtomicBool::new(false),
            cancel: None,
        })
    }

    /// Attach a cancellation token polled before every sink round-trip.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Replace or remove the cancellation token, e.g. to resume after a
    /// cancelled operation.
    pub fn set_cancel(&mut self, token: Option<CancelToken>) {
        self.cancel = token;
    }

    /// Shared reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        self.inner.as_ref().expect("sink already taken")
    }

    /// Compress all of `buf` and forward the produced bytes to the sink.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<(), ZstdError> {
        let result = self.write_inner(buf).await;
        self.errored |= result.is_err();
        result
    }

    async fn write_inner(&mut self, buf: &[u8]) -> Result<(), ZstdError> {
        let _op = OpGuard::enter(&self.active)?;
        self.check_open()?;
        checkpoint(&self.cancel)?;
        if buf.is_empty() {
            return Ok(());
        }
        if self.pending_frame_reset {
            self.comp.reset()?;
            self.pending_frame_reset = false;
        }

        let mut fed = 0;
        while fed < buf.len() {
            let (status, consumed, written) =
                self.comp.compress(&buf[fed..], &mut self.scratch, false)?;
            fed += consumed;
            if written > 0 {
                checkpoint(&self.cancel)?;
                self.inner
                    .as_mut()
                    .expect("sink already taken")
                    .write_all(&self.scratch[..written])
                    .await?;
            }
            match status {
                Status::DestinationTooSmall => continue,
                Status::NeedMoreData | Status::Done => {
                    if consumed == 0 && written == 0 {
                        let (_, flushed) = self.comp.flush(&mut self.scratch)?;
                        if flushed > 0 {
                            checkpoint(&self.cancel)?;
                            self.inner
                                .as_mut()
                                .expect("sink already taken")
                                .write_all(&self.scratch[..flushed])
                                .await?;
                        } else {
                            return Err(ZstdError::Fatal(
                                "compressor made no progress".into(),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Drain pending compressed bytes and flush the sink; the frame stays
    /// open.
    pub async fn flush(&mut self) -> Result<(), ZstdError> {
        let result = self.flush_inner().await;
        self.errored |= result.is_err();
        result
    }

    async fn flush_inner(&mut self) -> Result<(), ZstdError> {
        let _op = OpGuard::enter(&self.active)?;
        self.check_open()?;
        checkpoint(&self.cancel)?;
        if !self.pending_frame_reset {
            loop {
                let (status, written) = self.comp.flush(&mut self.scratch)?;
                if written > 0 {
                    checkpoint(&self.cancel)?;
                    self.inner
                        .as_mut()
                        .expect("sink already taken")
                        .write_all(&self.scratch[..written])
                        .await?;
                }
                if status == Status::Done {
                    break;
                }
            }
        }
        self.inner
            .as_mut()
            .expect("sink already taken")
            .flush()
            .await?;
        Ok(())
    }

    /// Terminate the current frame; the next write begins a new one.
    /// Idempotent when nothing was written since the previous call.
    pub async fn flush_frame(&mut self) -> Result<(), ZstdError> {
        let result = self.flush_frame_inner().await;
        self.errored |= result.is_err();
        result
    }

    async fn flush_frame_inner(&mut self) -> Result<(), ZstdError> {
        let active: *const std::sync::atomic::AtomicBool = &self.active;
        let _op = OpGuard::enter(unsafe { &*active })?;
        self.check_open()?;
        checkpoint(&self.cancel)?;
        if self.pending_frame_reset {
            return Ok(());
        }
        self.drive_end().await?;
        self.inner
            .as_mut()
            .expect("sink already taken")
            .flush()
            .await?;
        self.pending_frame_reset = true;
        Ok(())
    }

    /// Terminate the stream and return the underlying sink.
    pub async fn finish(mut self) -> Result<W, ZstdError> {
        let result = self.finish_inner().await;
        self.errored |= result.is_err();
        result?;
        Ok(self.inner.take().expect("sink already taken"))
    }

    async fn finish_inner(&mut self) -> Result<(), ZstdError> {
        let active: *const std::sync::atomic::AtomicBool = &self.active;
        let _op = OpGuard::enter(unsafe { &*active })?;
        if self.finished {
            return Ok(());
        }
        checkpoint(&self.cancel)?;
        if !self.pending_frame_reset {
            self.drive_end().await?;
        }
        self.inner
            .as_mut()
            .expect("sink already taken")
            .flush()
            .await?;
        self.finished = true;
        Ok(())
    }

    async fn drive_end(&mut self) -> Result<(), ZstdError> {
        loop {
            let (status, _, written) = self.comp.compress(&[], &mut self.scratch, true)?;
            if written > 0 {
                checkpoint(&self.cancel)?;
                self.inner
                    .as_mut()
                    .expect("sink already taken")
                    .write_all(&self.scratch[..written])
                    .await?;
            }
            match status {
                Status::Done => return Ok(()),
                Status::DestinationTooSmall => continue,
                Status::NeedMoreData => {
                    return Err(ZstdError::Fatal(
                        "codec demanded input while ending a frame".into(),
                    ))
                }
            }
        }
    }

    fn check_open(&self) -> Result<(), ZstdError> {
        if self.finished {
            return Err(ZstdError::IllegalState("writer already finished"));
        }
        Ok(())
    }
}

impl<W: AsyncWrite + Unpin> Drop for AsyncZstdWriter<W> {
    fn drop(&mut self) {
        pool::return_scratch(mem::take(&mut self.scratch));
    }
}

fn checkpoint(cancel: &Option<CancelToken>) -> Result<(), ZstdError> {
    match cancel {
        Some(token) => token.check(),
        None => Ok(()),
    }
}

//! Compressing writer over any `std::io::Write` sink.
//!
//! [`ZstdWriter`] feeds caller bytes through a [`Compressor`] and forwards
//! the produced frames to the underlying sink, staging output in a pooled
//! scratch buffer. Three distinct levels of "flush":
//!
//! | Operation | Frame terminated? | New frame on next write? |
//! |-----------|-------------------|--------------------------|
//! | [`flush`](std::io::Write::flush) | no | no |
//! | [`flush_frame`](ZstdWriter::flush_frame) | yes | yes (deferred) |
//! | [`finish`](ZstdWriter::finish) / drop | yes, unless a frame flush just did | — (closes) |
//!
//! `flush_frame` does *not* start the next frame eagerly: it records a
//! pending reset that the next write performs. Finishing right after a
//! frame flush therefore emits no empty trailing frame, and consecutive
//! `flush_frame` calls with no intervening write are idempotent.
//!
//! To keep the underlying sink alive after the adapter closes, hand in
//! `&mut sink` (every `Write` is also implemented for `&mut W`) or recover
//! ownership with [`ZstdWriter::finish`].

use std::io::{self, Write};
use std::mem;
use std::sync::atomic::AtomicBool;

use crate::frame::compress::Compressor;
use crate::frame::types::{CompressionQuality, Status, ZstdError};
use crate::pool;
use crate::stream::OpGuard;

/// Streaming frame compressor bound to a byte sink.
pub struct ZstdWriter<W: Write> {
    comp: Compressor,
    /// `None` once `finish` has taken the sink back.
    inner: Option<W>,
    /// Pooled staging area for compressed output; returned on drop.
    scratch: Vec<u8>,
    /// The previous operation terminated a frame; the next write must begin
    /// a fresh one.
    pending_frame_reset: bool,
    finished: bool,
    /// Sticky: once a compression or sink error escaped, drop no longer
    /// tries to finalize.
    errored: bool,
    active: AtomicBool,
}

impl<W: Write> ZstdWriter<W> {
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

    /// Wrap a pre-configured compressor (e.g. one carrying a prefix).
    pub fn with_compressor(comp: Compressor, sink: W) -> Result<Self, ZstdError> {
        Ok(ZstdWriter {
            comp,
            inner: Some(sink),
            scratch: pool::rent_scratch(),
            pending_frame_reset: false,
            finished: false,
            errored: false,
            active: AtomicBool::new(false),
        })
    }

    /// Shared reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        self.inner.as_ref().expect("sink already taken")
    }

    /// Mutable reference to the underlying sink.
    ///
    /// Writing to it directly corrupts the compressed stream; useful for
    /// inspection only.
    pub fn get_mut(&mut self) -> &mut W {
        self.inner.as_mut().expect("sink already taken")
    }

    /// Terminate the current frame without closing the writer.
    ///
    /// The next write begins a new frame. Idempotent when nothing was
    /// written since the previous `flush_frame`.
    pub fn flush_frame(&mut self) -> Result<(), ZstdError> {
        let result = self.flush_frame_inner();
        self.errored |= result.is_err();
        result
    }

    fn flush_frame_inner(&mut self) -> Result<(), ZstdError> {
        let _op = OpGuard::enter(&self.active)?;
        self.check_open()?;
        if self.pending_frame_reset {
            return Ok(());
        }
        Self::drive_end(&mut self.comp, &mut self.scratch, self.inner.as_mut().expect("sink already taken"))?;
        self.inner.as_mut().expect("sink already taken").flush()?;
        self.pending_frame_reset = true;
        Ok(())
    }

    /// Terminate the stream and return the underlying sink.
    ///
    /// Writes the final end-of-frame marker unless a `flush_frame` already
    /// did and nothing followed it (no empty trailing frame), then flushes
    /// the sink. Preferred over dropping: errors surface instead of being
    /// discarded.
    pub fn finish(mut self) -> Result<W, ZstdError> {
        let result = self.finalize();
        self.errored |= result.is_err();
        result?;
        Ok(self.inner.take().expect("sink already taken"))
    }

    fn finalize(&mut self) -> Result<(), ZstdError> {
        let _op = OpGuard::enter(&self.active)?;
        if self.finished {
            return Ok(());
        }
        if !self.pending_frame_reset {
            Self::drive_end(&mut self.comp, &mut self.scratch, self.inner.as_mut().expect("sink already taken"))?;
        }
        self.inner.as_mut().expect("sink already taken").flush()?;
        self.finished = true;
        Ok(())
    }

    /// Drive the `end` directive until the codec reports the frame closed,
    /// draining the scratch into the sink between rounds.
    fn drive_end(comp: &mut Compressor, scratch: &mut [u8], sink: &mut W) -> Result<(), ZstdError> {
        loop {
            let (status, _, written) = comp.compress(&[], scratch, true)?;
            if written > 0 {
                sink.write_all(&scratch[..written])?;
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

    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, ZstdError> {
        let _op = OpGuard::enter(&self.active)?;
        self.check_open()?;
        if buf.is_empty() {
            return Ok(0);
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
                self.inner
                    .as_mut()
                    .expect("sink already taken")
                    .write_all(&self.scratch[..written])?;
            }
            match status {
                Status::DestinationTooSmall => continue,
                Status::NeedMoreData | Status::Done => {
                    if consumed == 0 && written == 0 {
                        // Stalled with neither side moving: one empty-input
                        // flush attempt, then give up on this call.
                        let (_, flushed) = self.comp.flush(&mut self.scratch)?;
                        if flushed > 0 {
                            self.inner
                                .as_mut()
                                .expect("sink already taken")
                                .write_all(&self.scratch[..flushed])?;
                        } else {
                            break;
                        }
                    }
                }
            }
        }
        Ok(fed)
    }

    fn flush_pending(&mut self) -> Result<(), ZstdError> {
        let _op = OpGuard::enter(&self.active)?;
        self.check_open()?;
        // With a frame reset pending nothing is buffered; only the sink
        // needs flushing.
        if !self.pending_frame_reset {
            loop {
                let (status, written) = self.comp.flush(&mut self.scratch)?;
                if written > 0 {
                    self.inner
                        .as_mut()
                        .expect("sink already taken")
                        .write_all(&self.scratch[..written])?;
                }
                if status == Status::Done {
                    break;
                }
            }
        }
        self.inner.as_mut().expect("sink already taken").flush()?;
        Ok(())
    }

    fn check_open(&self) -> Result<(), ZstdError> {
        if self.finished {
            return Err(ZstdError::IllegalState("writer already finished"));
        }
        Ok(())
    }
}

impl<W: Write> Write for ZstdWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.write_bytes(buf);
        self.errored |= result.is_err();
        result.map_err(io::Error::from)
    }

    /// Drain pending compressed bytes to the sink and flush it. The current
    /// frame stays open; decompressing what has been written so far yields
    /// every byte written so far.
    fn flush(&mut self) -> io::Result<()> {
        let result = self.flush_pending();
        self.errored |= result.is_err();
        result.map_err(io::Error::from)
    }
}

impl<W: Write> Drop for ZstdWriter<W> {
    /// Best-effort finalization for writers dropped without
    /// [`ZstdWriter::finish`]; errors are discarded. The scratch buffer goes
    /// back to the pool either way.
    fn drop(&mut self) {
        if self.inner.is_some() && !self.finished && !self.errored {
            let _ = self.finalize();
        }
        pool::return_scratch(mem::take(&mut self.scratch));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::inspect::frame_infos;
    use crate::functions;
    use std::sync::atomic::Ordering;

    #[test]
    fn round_trip_through_writer() {
        let payload = b"writer round trip ".repeat(1000);
        let mut writer = ZstdWriter::with_level(Vec::new(), 3).unwrap();
        writer.write_all(&payload).unwrap();
        let compressed = writer.finish().unwrap();
        assert!(compressed.len() < payload.len());
        assert_eq!(functions::decompress(&compressed).unwrap(), payload);
    }

    /// Entering any operation while the slot is taken fails fast with
    /// `IllegalState` and consumes no input.
    #[test]
    fn concurrent_entry_is_rejected() {
        let mut writer = ZstdWriter::new(Vec::new()).unwrap();
        writer.active.store(true, Ordering::Release);

        let err = writer.write_bytes(b"data").unwrap_err();
        assert!(matches!(err, ZstdError::IllegalState(_)));
        assert!(matches!(
            writer.flush_frame(),
            Err(ZstdError::IllegalState(_))
        ));
        assert!(matches!(
            writer.flush_pending(),
            Err(ZstdError::IllegalState(_))
        ));

        writer.active.store(false, Ordering::Release);
        writer.write_all(b"data").unwrap();
        let compressed = writer.finish().unwrap();
        assert_eq!(functions::decompress(&compressed).unwrap(), b"data");
    }

    #[test]
    fn flush_frame_is_idempotent() {
        let mut writer = ZstdWriter::new(Vec::new()).unwrap();
        writer.write_all(b"only frame").unwrap();
        writer.flush_frame().unwrap();
        let after_first = writer.get_ref().len();
        writer.flush_frame().unwrap();
        assert_eq!(writer.get_ref().len(), after_first);

        let compressed = writer.finish().unwrap();
        // The second flush_frame and the finish added nothing.
        assert_eq!(compressed.len(), after_first);
        assert_eq!(frame_infos(&compressed).unwrap().len(), 1);
    }

    #[test]
    fn finish_after_flush_frame_adds_no_empty_frame() {
        let mut writer = ZstdWriter::new(Vec::new()).unwrap();
        for payload in [&b"A"[..], b"B", b"C"] {
            writer.write_all(&payload.repeat(4096)).unwrap();
            writer.flush_frame().unwrap();
        }
        let compressed = writer.finish().unwrap();
        assert_eq!(frame_infos(&compressed).unwrap().len(), 3);
    }

    #[test]
    fn writes_after_finish_are_illegal() {
        let mut writer = ZstdWriter::new(Vec::new()).unwrap();
        writer.write_all(b"x").unwrap();
        writer.finalize().unwrap();
        assert!(matches!(
            writer.write_bytes(b"y"),
            Err(ZstdError::IllegalState(_))
        ));
    }

    #[test]
    fn drop_finalizes_the_frame() {
        let mut out = Vec::new();
        {
            let mut writer = ZstdWriter::new(&mut out).unwrap();
            writer.write_all(b"dropped, not finished").unwrap();
        }
        assert_eq!(
            functions::decompress(&out).unwrap(),
            b"dropped, not finished"
        );
    }
}

//! Frame inspection: walk a concatenated Zstandard stream and report
//! per-frame metadata without decompressing payloads.
//!
//! Two enumeration modes:
//!
//! - [`frame_infos`] — over a complete in-memory byte slice.
//! - [`FrameScanner`] — over an arbitrary `Read` source, buffering just
//!   enough of each frame to answer the codec's size query.
//!
//! Both recognise skippable members (magic `0x184D2A5x`) and include their
//! full length in the offset arithmetic, so
//! `infos[i + 1].offset == infos[i].offset + infos[i].compressed_size` and
//! the sizes sum to the stream length.

use std::io::Read;

use crate::codec::{self, HeaderParse};
use crate::frame::types::{FrameInfo, ZstdError};

/// Initial scratch capacity for the streaming scanner; grows by doubling
/// when a single frame does not fit.
const SCAN_BUFFER_SIZE: usize = 64 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// In-memory enumeration
// ─────────────────────────────────────────────────────────────────────────────

/// Enumerate every frame in `blob`, which must be a whole concatenated
/// stream starting at a frame boundary.
///
/// Fails with `InvalidData` when a size query errors, including the case of
/// a final truncated member.
pub fn frame_infos(blob: &[u8]) -> Result<Vec<FrameInfo>, ZstdError> {
    let mut infos = Vec::new();
    let mut offset = 0usize;
    while offset < blob.len() {
        let info = read_frame_info(&blob[offset..], offset as u64)?;
        offset += info.compressed_size as usize;
        infos.push(info);
    }
    Ok(infos)
}

/// Parse the metadata of the single frame starting at `src[0]`.
fn read_frame_info(src: &[u8], offset: u64) -> Result<FrameInfo, ZstdError> {
    let size = codec::find_frame_compressed_size(src)
        .map_err(|e| ZstdError::InvalidData(e.name()))?;
    let raw = match codec::get_frame_header(src).map_err(|e| ZstdError::InvalidData(e.name()))? {
        HeaderParse::Done(raw) => raw,
        // The size query succeeded, so the whole frame (header included) is
        // present; a short-input verdict here means the walk went off the
        // rails.
        HeaderParse::NeedMore(_) => {
            return Err(ZstdError::InvalidData(
                "frame header unreadable at reported boundary".into(),
            ))
        }
    };
    Ok(FrameInfo::from_raw(raw, offset, size as u64))
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming enumeration
// ─────────────────────────────────────────────────────────────────────────────

/// Frame-metadata iterator over an arbitrary byte source.
///
/// Buffers the current frame into a growing scratch buffer until the codec
/// can report its compressed size, emits the metadata record, drops the
/// consumed prefix, and continues. Yields `InvalidData` if the source ends
/// while the size query is still unsatisfied.
pub struct FrameScanner<R: Read> {
    inner: R,
    buf: Vec<u8>,
    /// Valid bytes at the front of `buf`.
    filled: usize,
    /// Stream offset of `buf[0]`.
    offset: u64,
    failed: bool,
}

impl<R: Read> FrameScanner<R> {
    /// Start scanning `reader` from its current position, which must be a
    /// frame boundary.
    pub fn new(reader: R) -> Self {
        FrameScanner {
            inner: reader,
            buf: vec![0u8; SCAN_BUFFER_SIZE],
            filled: 0,
            offset: 0,
            failed: false,
        }
    }

    /// Consume the scanner, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Pull more bytes from the source, growing the scratch when full.
    /// Returns the number of bytes read (0 at end of source).
    fn refill(&mut self) -> Result<usize, ZstdError> {
        if self.filled == self.buf.len() {
            self.buf.resize(self.buf.len() * 2, 0);
        }
        let n = self.inner.read(&mut self.buf[self.filled..])?;
        self.filled += n;
        Ok(n)
    }

    fn next_info(&mut self) -> Result<Option<FrameInfo>, ZstdError> {
        // Clean end of stream only between frames.
        if self.filled == 0 && self.refill()? == 0 {
            return Ok(None);
        }
        loop {
            match codec::find_frame_compressed_size(&self.buf[..self.filled]) {
                Ok(size) => {
                    let info = read_frame_info(&self.buf[..self.filled], self.offset)?;
                    self.buf.copy_within(size..self.filled, 0);
                    self.filled -= size;
                    self.offset += size as u64;
                    return Ok(Some(info));
                }
                // The codec reports short input as an error; refill and ask
                // again, and only give up when the source is dry.
                Err(e) => {
                    if self.refill()? == 0 {
                        return Err(ZstdError::InvalidData(e.name()));
                    }
                }
            }
        }
    }
}

impl<R: Read> Iterator for FrameScanner<R> {
    type Item = Result<FrameInfo, ZstdError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_info() {
            Ok(Some(info)) => Some(Ok(info)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

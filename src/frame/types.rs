//! Shared frame-layer types: the tri-state progress status, frame metadata,
//! the quality enum, and the crate error type.
//!
//! Covers:
//! - [`Status`] — the `Done` / `NeedMoreData` / `DestinationTooSmall`
//!   contract returned by every incremental operation
//! - [`FrameType`] / [`FrameInfo`] — per-frame metadata records emitted by
//!   the inspector and the async frame iterator
//! - [`CompressionQuality`] — the four-value quality selector and its
//!   mapping onto native levels
//! - [`ZstdError`] — one error enum for the whole crate, with `Display`,
//!   `std::error::Error`, and `io::Error` conversions

use std::fmt;
use std::io;

use crate::codec;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Magic number prefix of skippable frames; the low nibble is user-defined.
pub const SKIPPABLE_MAGIC_START: u32 = 0x184D_2A50;

/// Mask isolating the fixed part of the skippable magic number.
pub const SKIPPABLE_MAGIC_MASK: u32 = 0xFFFF_FFF0;

/// Smallest accepted `window_log_max` value (1 KiB window).
pub const WINDOW_LOG_MIN: u32 = 10;

/// Largest accepted `window_log_max` value (2 GiB window).
pub const WINDOW_LOG_MAX: u32 = 31;

/// Level used by [`CompressionQuality::Default`].
pub const DEFAULT_QUALITY_LEVEL: i32 = 5;

/// Upper bound of a Zstandard frame header, magic number included.
pub(crate) const MAX_FRAME_HEADER_SIZE: usize = 18;

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of one incremental compress, decompress, or flush step.
///
/// This is a progress report, not an error: every variant leaves the context
/// in a usable state and the accompanying counters say exactly how far the
/// call got. The tie-break between variants is fixed (see the state-machine
/// docs); callers rely on `DestinationTooSmall` winning over `NeedMoreData`
/// whenever the destination is actually full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The requested operation completed against the given buffers.
    Done,
    /// All input was consumed but the operation needs more to make progress.
    NeedMoreData,
    /// The destination filled up before the operation could complete.
    DestinationTooSmall,
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of a Zstandard stream member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// A regular compressed frame.
    Frame,
    /// A skippable frame wrapping an opaque user payload.
    Skippable,
}

impl FrameType {
    /// Stable string tag (`"frame"` / `"skippable"`).
    pub fn as_str(self) -> &'static str {
        match self {
            FrameType::Frame => "frame",
            FrameType::Skippable => "skippable",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of one frame within a concatenated stream.
///
/// `offset` and `compressed_size` are always exact;
/// `offset + compressed_size` is the offset of the next frame. The remaining
/// fields reflect what the frame header chose to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// Byte offset of the frame within the concatenated stream.
    pub offset: u64,
    /// Total on-wire size of the frame, header and end marker included.
    pub compressed_size: u64,
    /// Decompressed size, when the header advertises one. For skippable
    /// frames this is the payload length.
    pub content_size: Option<u64>,
    /// Sliding-window size required to decode the frame.
    pub window_size: Option<u64>,
    /// Dictionary id recorded in the header, if any.
    pub dict_id: Option<u32>,
    /// Whether a content checksum trails the frame.
    pub has_checksum: bool,
    /// Regular or skippable member.
    pub frame_type: FrameType,
}

impl FrameInfo {
    /// Assemble the public record from a raw header plus walk-derived fields.
    pub(crate) fn from_raw(
        raw: codec::RawFrameHeader,
        offset: u64,
        compressed_size: u64,
    ) -> Self {
        FrameInfo {
            offset,
            compressed_size,
            content_size: raw.content_size,
            window_size: (raw.window_size != 0).then_some(raw.window_size),
            dict_id: (raw.dict_id != 0).then_some(raw.dict_id),
            has_checksum: raw.checksum_flag,
            frame_type: if raw.skippable {
                FrameType::Skippable
            } else {
                FrameType::Frame
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compression quality
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse quality selector mapped onto native compression levels.
///
/// [`CompressionQuality::None`] and [`CompressionQuality::Fastest`] both map
/// to the codec's minimum (fastest) level, [`CompressionQuality::Default`]
/// to level 5, and [`CompressionQuality::Maximum`] to the codec's maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum CompressionQuality {
    None = 0,
    Fastest = 1,
    #[default]
    Default = 2,
    Maximum = 3,
}

impl CompressionQuality {
    /// Resolve to a concrete native level.
    pub fn to_level(self) -> i32 {
        match self {
            CompressionQuality::None | CompressionQuality::Fastest => {
                codec::min_compression_level()
            }
            CompressionQuality::Default => DEFAULT_QUALITY_LEVEL,
            CompressionQuality::Maximum => codec::max_compression_level(),
        }
    }
}

impl TryFrom<i32> for CompressionQuality {
    type Error = ZstdError;

    fn try_from(value: i32) -> Result<Self, ZstdError> {
        match value {
            0 => Ok(CompressionQuality::None),
            1 => Ok(CompressionQuality::Fastest),
            2 => Ok(CompressionQuality::Default),
            3 => Ok(CompressionQuality::Maximum),
            _ => Err(ZstdError::InvalidArgument(
                "compression quality outside the defined set",
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised by this crate.
///
/// Progress conditions (`NeedMoreData`, `DestinationTooSmall`) are *not*
/// errors — they travel through [`Status`]. Truncated input on the decode
/// side is also not an error: stream readers surface it as a short
/// end-of-stream and leave integrity checks to the caller.
#[derive(Debug)]
pub enum ZstdError {
    /// A parameter was outside its accepted range.
    InvalidArgument(&'static str),
    /// The operation is not legal in the object's current state
    /// (concurrent entry, configuration after first use, use after close).
    IllegalState(&'static str),
    /// The decoder rejected the compressed data. Carries the codec's error
    /// name.
    InvalidData(String),
    /// The encoder (or context management) failed unexpectedly. Carries the
    /// codec's error name.
    Fatal(String),
    /// A configured size cap was exceeded while decoding a frame.
    ResourceLimit { limit: usize, needed: usize },
    /// Cooperative cancellation was observed before the operation advanced.
    Cancelled,
    /// The underlying byte source or sink failed.
    Io(io::Error),
}

impl fmt::Display for ZstdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZstdError::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
            ZstdError::IllegalState(what) => write!(f, "illegal state: {what}"),
            ZstdError::InvalidData(name) => write!(f, "invalid compressed data: {name}"),
            ZstdError::Fatal(name) => write!(f, "compression failure: {name}"),
            ZstdError::ResourceLimit { limit, needed } => write!(
                f,
                "frame exceeds configured size limit ({needed} > {limit} bytes)"
            ),
            ZstdError::Cancelled => f.write_str("operation cancelled"),
            ZstdError::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for ZstdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZstdError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ZstdError {
    fn from(err: io::Error) -> Self {
        ZstdError::Io(err)
    }
}

impl From<ZstdError> for io::Error {
    fn from(err: ZstdError) -> Self {
        match err {
            ZstdError::Io(inner) => inner,
            ZstdError::InvalidData(_) => io::Error::new(io::ErrorKind::InvalidData, err),
            ZstdError::InvalidArgument(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            ZstdError::Cancelled => io::Error::new(io::ErrorKind::Interrupted, err),
            _ => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

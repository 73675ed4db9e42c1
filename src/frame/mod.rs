//! Frame layer: the incremental encoder/decoder state machines, per-frame
//! metadata, and the frame inspector.
//!
//! This is the core contract of the crate. [`Compressor`] and
//! [`Decompressor`] translate single buffer-at-a-time calls into the
//! tri-state [`Status`] protocol; [`inspect`] walks concatenated members
//! without decoding them. The `stream` module builds ordered byte streams on
//! top of these types.

pub mod compress;
pub mod decompress;
pub mod inspect;
pub mod types;

pub use compress::Compressor;
pub use decompress::Decompressor;
pub use inspect::{frame_infos, FrameScanner};
pub use types::{
    CompressionQuality, FrameInfo, FrameType, Status, ZstdError, DEFAULT_QUALITY_LEVEL,
    SKIPPABLE_MAGIC_MASK, SKIPPABLE_MAGIC_START, WINDOW_LOG_MAX, WINDOW_LOG_MIN,
};

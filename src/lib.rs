//! `zstdio` — incremental Zstandard streaming over the native libzstd
//! codec.
//!
//! The crate pipes unbounded byte sequences through caller-supplied
//! buffers: the encoder and decoder state machines report progress through
//! a tri-state [`Status`] instead of buffering payloads internally, and the
//! stream adapters build ordered `Read`/`Write` (and async) byte streams on
//! top of them, multi-frame concatenation included.
//!
//! # Crate layout
//!
//! | Module   | Contents |
//! |----------|----------|
//! | `codec`  | Safe boundary over `zstd-sys`: context guards, buffer descriptors, streaming primitives, frame queries. |
//! | `frame`  | [`Compressor`] / [`Decompressor`] state machines, [`FrameInfo`] metadata, the frame inspector, error type. |
//! | `stream` | [`ZstdWriter`] / [`ZstdReader`] sync adapters, their async twins, and the [`FrameStream`] frame iterator. |
//! | `pool`   | Process-wide decompressor pool and pooled scratch buffers. |
//! | `functions` | One-shot whole-buffer compress / decompress. |
//! | `cancel` | [`CancelToken`] for cooperative cancellation of async operations. |
//!
//! # Example
//!
//! ```
//! use std::io::{Read, Write};
//!
//! let mut writer = zstdio::ZstdWriter::with_level(Vec::new(), 3)?;
//! writer.write_all(b"hello zstd")?;
//! let compressed = writer.finish()?;
//!
//! let mut reader = zstdio::ZstdReader::new(&compressed[..])?;
//! let mut out = Vec::new();
//! reader.read_to_end(&mut out)?;
//! assert_eq!(out, b"hello zstd");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cancel;
pub mod codec;
pub mod frame;
pub mod functions;
pub mod pool;
pub mod stream;

pub use cancel::CancelToken;
pub use frame::{
    frame_infos, CompressionQuality, Compressor, Decompressor, FrameInfo, FrameScanner,
    FrameType, Status, ZstdError,
};
pub use stream::{
    AsyncZstdReader, AsyncZstdWriter, DecodedFrame, FrameStream, ZstdReader, ZstdWriter,
};

/// Version number of the linked Zstandard library
/// (`major * 10000 + minor * 100 + patch`).
pub fn version_number() -> u32 {
    codec::version_number()
}

/// Fastest (most negative) compression level the codec supports.
pub fn min_compression_level() -> i32 {
    codec::min_compression_level()
}

/// Highest-ratio compression level the codec supports.
pub fn max_compression_level() -> i32 {
    codec::max_compression_level()
}

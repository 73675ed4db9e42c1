//! Stream adapters: ordered byte streams over the incremental frame layer.
//!
//! | Module | Contents |
//! |--------|----------|
//! | `write` | [`ZstdWriter`] — compressing `std::io::Write` adapter with the basic-flush / frame-flush / finish taxonomy. |
//! | `read` | [`ZstdReader`] — decompressing `std::io::Read` adapter, transparent across concatenated frames. |
//! | `async_write` | [`AsyncZstdWriter`] — the write adapter over `tokio::io::AsyncWrite`, with cooperative cancellation. |
//! | `async_read` | [`AsyncZstdReader`] — the read adapter over `tokio::io::AsyncRead`. |
//! | `frames` | [`FrameStream`] — async iterator yielding whole decoded frames with their metadata. |
//!
//! Every adapter is direction-locked at construction and guards against
//! concurrent entry with a single-slot operation flag: a second
//! read/write/flush/finish while one is in progress fails fast with
//! `IllegalState` and leaves the in-progress call unaffected.

pub mod async_read;
pub mod async_write;
pub mod frames;
pub mod read;
pub mod write;

pub use async_read::AsyncZstdReader;
pub use async_write::AsyncZstdWriter;
pub use frames::{DecodedFrame, FrameStream};
pub use read::ZstdReader;
pub use write::ZstdWriter;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::frame::types::ZstdError;

/// Single-slot mutual-exclusion token held for the duration of one adapter
/// operation.
///
/// Entry moves the flag 0 → 1 with a compare-and-set and fails fast when it
/// is already taken; drop restores it on every path, error paths included.
/// There is no queueing — concurrent misuse is rejected, not serialised.
pub(crate) struct OpGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> OpGuard<'a> {
    pub(crate) fn enter(flag: &'a AtomicBool) -> Result<Self, ZstdError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ZstdError::IllegalState("another operation is in progress"))?;
        Ok(OpGuard { flag })
    }
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

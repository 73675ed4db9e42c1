//! Reusable resources: pooled scratch buffers and a process-wide
//! decompressor pool.
//!
//! Both pools hand resources around over bounded channels, so returning to a
//! full pool simply drops the resource instead of blocking, and renting from
//! an empty pool allocates fresh. There is no initialisation ritual; the
//! channels are created on first use and are safe to touch from any thread.
//!
//! - Scratch buffers back the stream adapters' staging areas. They are
//!   rented at construction and returned at close, without zeroing.
//! - [`rent`] returns a [`PooledDecompressor`] whose context goes back to
//!   the pool on drop after a successful reset; at most
//!   [`DECOMPRESSOR_RETENTION`] contexts are retained to bound steady-state
//!   memory. Compressors are not pooled — their level and prefix are
//!   caller-specific.

use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::frame::decompress::Decompressor;
use crate::frame::types::ZstdError;

// ─────────────────────────────────────────────────────────────────────────────
// Scratch buffers
// ─────────────────────────────────────────────────────────────────────────────

/// Size of every pooled scratch buffer (and the adapters' default staging
/// capacity).
pub(crate) const SCRATCH_BUFFER_SIZE: usize = 64 * 1024;

/// Scratch buffers retained when idle.
const SCRATCH_RETENTION: usize = 16;

fn scratch_pool() -> &'static (Sender<Vec<u8>>, Receiver<Vec<u8>>) {
    static POOL: OnceLock<(Sender<Vec<u8>>, Receiver<Vec<u8>>)> = OnceLock::new();
    POOL.get_or_init(|| bounded(SCRATCH_RETENTION))
}

/// Rent a `SCRATCH_BUFFER_SIZE` staging buffer, allocating when the pool is
/// empty. Contents are unspecified.
pub(crate) fn rent_scratch() -> Vec<u8> {
    let (_, rx) = scratch_pool();
    rx.try_recv()
        .unwrap_or_else(|_| vec![0u8; SCRATCH_BUFFER_SIZE])
}

/// Return a staging buffer. Buffers of the wrong size (a caller override)
/// and overflow beyond the retention cap are dropped.
pub(crate) fn return_scratch(buf: Vec<u8>) {
    if buf.len() == SCRATCH_BUFFER_SIZE {
        let (tx, _) = scratch_pool();
        let _ = tx.try_send(buf);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decompressor pool
// ─────────────────────────────────────────────────────────────────────────────

/// Decompression contexts retained when idle.
pub const DECOMPRESSOR_RETENTION: usize = 32;

fn decompressor_pool() -> &'static (Sender<Decompressor>, Receiver<Decompressor>) {
    static POOL: OnceLock<(Sender<Decompressor>, Receiver<Decompressor>)> = OnceLock::new();
    POOL.get_or_init(|| bounded(DECOMPRESSOR_RETENTION))
}

/// Rent a decompressor from the process-wide pool, creating one when the
/// pool is empty. The context behaves as freshly created.
pub fn rent() -> Result<PooledDecompressor, ZstdError> {
    let (_, rx) = decompressor_pool();
    let inner = match rx.try_recv() {
        Ok(dec) => dec,
        Err(_) => Decompressor::new()?,
    };
    Ok(PooledDecompressor { inner: Some(inner) })
}

/// A pooled decompression context.
///
/// Dereferences to [`Decompressor`]. On drop the context is reset and handed
/// back to the pool; if the reset fails or the pool is at capacity it is
/// disposed instead.
pub struct PooledDecompressor {
    inner: Option<Decompressor>,
}

impl PooledDecompressor {
    /// Detach the context from the pool; it will not be returned on drop.
    pub fn into_inner(mut self) -> Decompressor {
        self.inner.take().expect("context already detached")
    }
}

impl Deref for PooledDecompressor {
    type Target = Decompressor;

    fn deref(&self) -> &Decompressor {
        self.inner.as_ref().expect("context already detached")
    }
}

impl DerefMut for PooledDecompressor {
    fn deref_mut(&mut self) -> &mut Decompressor {
        self.inner.as_mut().expect("context already detached")
    }
}

impl Drop for PooledDecompressor {
    fn drop(&mut self) {
        if let Some(mut dec) = self.inner.take() {
            if dec.reset().is_ok() {
                let (tx, _) = decompressor_pool();
                let _ = tx.try_send(dec);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

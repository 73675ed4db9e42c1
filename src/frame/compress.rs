//! Incremental frame compression.
//!
//! [`Compressor`] maps one caller chunk plus an end-of-input flag onto the
//! tri-state [`Status`] contract: every call reports how many source bytes
//! the codec consumed, how many destination bytes it produced, and whether
//! the caller should bring more input or a fresh destination. The type never
//! buffers payload bytes of its own — all staging stays inside the native
//! context.
//!
//! Configuration (level, raw prefix) is *session-scoped*: it may only change
//! while the compressor is unconfigured, is pushed into the native state
//! lazily on the first [`Compressor::compress`] call of a session, and a
//! [`Compressor::reset`] ends the session, unpinning the prefix.

use crate::codec::{self, CCtxHandle, EndDirective, InBuffer, OutBuffer};
use crate::frame::types::{Status, ZstdError, DEFAULT_QUALITY_LEVEL};

/// Streaming frame compressor over a native compression context.
///
/// At most one operation may run on a `Compressor` at a time; `&mut self`
/// enforces that statically. The stream adapters add a dynamic guard on top
/// for their own entry points.
pub struct Compressor {
    ctx: CCtxHandle,
    level: i32,
    /// Owned copy of the raw prefix. Boxed so the bytes keep a stable
    /// address while the native context references them; released on
    /// `reset` or drop.
    prefix: Option<Box<[u8]>>,
    /// Set once level/prefix have been pushed into the native state for the
    /// current session.
    configured: bool,
}

impl Compressor {
    /// Create a compressor at the default level.
    pub fn new() -> Result<Self, ZstdError> {
        Self::with_level(DEFAULT_QUALITY_LEVEL)
    }

    /// Create a compressor at an explicit level.
    ///
    /// The level must lie in the codec-reported `[min, max]` range.
    pub fn with_level(level: i32) -> Result<Self, ZstdError> {
        if codec::version_number() < codec::MIN_SUPPORTED_VERSION {
            return Err(ZstdError::Fatal(
                "linked zstd library lacks the unified streaming interface".into(),
            ));
        }
        validate_level(level)?;
        let ctx = CCtxHandle::new().map_err(|e| ZstdError::Fatal(e.name()))?;
        Ok(Compressor {
            ctx,
            level,
            prefix: None,
            configured: false,
        })
    }

    /// The level the next session will compress at.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Change the compression level for the next session.
    ///
    /// Fails with `IllegalState` once the current session is configured,
    /// i.e. after any `compress` call since construction or the last
    /// `reset`.
    pub fn set_compression_level(&mut self, level: i32) -> Result<(), ZstdError> {
        if self.configured {
            return Err(ZstdError::IllegalState(
                "compression level cannot change during an active session",
            ));
        }
        validate_level(level)?;
        self.level = level;
        Ok(())
    }

    /// Install a raw content prefix for the next session.
    ///
    /// The bytes are copied into an owned buffer and pinned until the
    /// session ends. An empty slice clears any prior prefix. Fails with
    /// `IllegalState` once the session is configured.
    pub fn set_prefix(&mut self, prefix: &[u8]) -> Result<(), ZstdError> {
        if self.configured {
            return Err(ZstdError::IllegalState(
                "prefix cannot change during an active session",
            ));
        }
        self.prefix = if prefix.is_empty() {
            None
        } else {
            Some(prefix.to_vec().into_boxed_slice())
        };
        Ok(())
    }

    /// Compress one chunk.
    ///
    /// Drives the unified streaming primitive with directive `End` when
    /// `final_block` is set, `Continue` otherwise, and returns
    /// `(status, consumed, written)`:
    ///
    /// - `Done` — with `final_block`, the frame is complete and the most
    ///   recent output bytes end it; without, the chunk was fully absorbed.
    /// - `DestinationTooSmall` — `dst` filled before the codec finished;
    ///   call again with a fresh destination (remaining input starts at
    ///   `consumed`).
    /// - `NeedMoreData` — all input consumed, destination has room, frame
    ///   still open.
    ///
    /// `consumed <= src.len()` and `written <= dst.len()` always hold.
    pub fn compress(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        final_block: bool,
    ) -> Result<(Status, usize, usize), ZstdError> {
        self.ensure_configured()?;

        let directive = if final_block {
            EndDirective::End
        } else {
            EndDirective::Continue
        };
        let mut input = InBuffer::around(src);
        let mut output = OutBuffer::around(dst);
        let remaining = self
            .ctx
            .compress_stream2(&mut output, &mut input, directive)
            .map_err(|e| ZstdError::Fatal(e.name()))?;

        let consumed = input.pos;
        let written = output.pos;

        // Tie-break order is load-bearing: a full destination must win over
        // "need more data" so drain loops re-enter before asking for input.
        let status = if final_block && consumed == src.len() && remaining == 0 {
            Status::Done
        } else if final_block && remaining > 0 && written == dst.len() {
            Status::DestinationTooSmall
        } else if !final_block && written == dst.len() {
            Status::DestinationTooSmall
        } else if !final_block && consumed == src.len() && written < dst.len() {
            Status::NeedMoreData
        } else {
            Status::Done
        };
        Ok((status, consumed, written))
    }

    /// Drain buffered bytes into `dst` without ending the frame.
    ///
    /// Loops over the `Flush` directive while the codec reports bytes
    /// remaining and the destination has room. Returns `(Done, written)`
    /// when the internal buffers are empty, `(DestinationTooSmall, written)`
    /// when `dst` filled first. Never emits an end-of-frame marker.
    pub fn flush(&mut self, dst: &mut [u8]) -> Result<(Status, usize), ZstdError> {
        self.ensure_configured()?;

        let mut output = OutBuffer::around(dst);
        loop {
            let mut input = InBuffer::around(&[]);
            let remaining = self
                .ctx
                .compress_stream2(&mut output, &mut input, EndDirective::Flush)
                .map_err(|e| ZstdError::Fatal(e.name()))?;
            if remaining == 0 {
                return Ok((Status::Done, output.pos));
            }
            if output.is_full() {
                return Ok((Status::DestinationTooSmall, output.pos));
            }
        }
    }

    /// End the current session: session-only reset of the native state,
    /// prefix unpinned, back to unconfigured. The next `compress` starts a
    /// fresh frame as if the compressor had just been created (allocations
    /// may be reused).
    pub fn reset(&mut self) -> Result<(), ZstdError> {
        self.ctx
            .reset_session()
            .map_err(|e| ZstdError::Fatal(e.name()))?;
        self.prefix = None;
        self.configured = false;
        Ok(())
    }

    /// Push level and prefix into the native state on first use of a
    /// session.
    fn ensure_configured(&mut self) -> Result<(), ZstdError> {
        if self.configured {
            return Ok(());
        }
        self.ctx
            .set_compression_level(self.level)
            .map_err(|e| ZstdError::Fatal(e.name()))?;
        if let Some(prefix) = &self.prefix {
            self.ctx
                .ref_prefix(prefix)
                .map_err(|e| ZstdError::Fatal(e.name()))?;
        }
        self.configured = true;
        Ok(())
    }
}

fn validate_level(level: i32) -> Result<(), ZstdError> {
    if level < codec::min_compression_level() || level > codec::max_compression_level() {
        return Err(ZstdError::InvalidArgument(
            "compression level outside the codec-supported range",
        ));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

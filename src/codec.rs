//! Safe boundary over the native Zstandard library (`zstd-sys`).
//!
//! Everything `unsafe` in this crate lives here. The module owns:
//!
//! - [`CCtxHandle`] / [`DCtxHandle`] — guards around the native compression
//!   and decompression contexts, freed exactly once on drop.
//! - [`InBuffer`] / [`OutBuffer`] — slice-backed views of the C
//!   `ZSTD_inBuffer` / `ZSTD_outBuffer` descriptors (data pointer, size,
//!   position). The codec advances `pos`; callers read it back.
//! - Thin wrappers for the streaming primitives (`ZSTD_compressStream2`,
//!   `ZSTD_decompressStream`), parameter setters, session reset, and the
//!   frame-inspection queries (`ZSTD_findFrameCompressedSize`,
//!   `ZSTD_getFrameContentSize`, `ZSTD_getFrameHeader`).
//! - Error introspection: native return codes are checked with
//!   `ZSTD_isError` and carried as [`CodecError`] until the calling layer
//!   converts them into the public error kind exactly once.
//!
//! Higher layers never see a raw pointer or a raw return code.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::{c_int, c_void};
use std::ptr::NonNull;

// ─────────────────────────────────────────────────────────────────────────────
// End directive
// ─────────────────────────────────────────────────────────────────────────────

/// Directive passed to the unified streaming compression primitive.
///
/// Maps 1-to-1 onto `ZSTD_EndDirective`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndDirective {
    /// Collect more data; the codec buffers input at will (`ZSTD_e_continue`).
    Continue,
    /// Flush whatever is buffered, without ending the frame (`ZSTD_e_flush`).
    Flush,
    /// Flush everything and write the end-of-frame marker (`ZSTD_e_end`).
    End,
}

impl EndDirective {
    fn to_native(self) -> zstd_sys::ZSTD_EndDirective {
        match self {
            EndDirective::Continue => zstd_sys::ZSTD_EndDirective::ZSTD_e_continue,
            EndDirective::Flush => zstd_sys::ZSTD_EndDirective::ZSTD_e_flush,
            EndDirective::End => zstd_sys::ZSTD_EndDirective::ZSTD_e_end,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error introspection
// ─────────────────────────────────────────────────────────────────────────────

/// A raw error code reported by the native library.
///
/// Not public API: the layer that invoked the codec converts this into the
/// appropriate [`ZstdError`](crate::frame::types::ZstdError) kind (decoder
/// errors become `InvalidData`, encoder errors become `Fatal`).
#[derive(Debug, Clone)]
pub(crate) struct CodecError {
    code: usize,
}

impl CodecError {
    /// Human-readable name from `ZSTD_getErrorName`.
    pub(crate) fn name(&self) -> String {
        unsafe {
            let ptr = zstd_sys::ZSTD_getErrorName(self.code);
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Wraps `ZSTD_isError`.
#[inline]
fn is_error(code: usize) -> bool {
    unsafe { zstd_sys::ZSTD_isError(code) != 0 }
}

/// Check a native return value, splitting the error sentinel range off.
#[inline]
fn parse_code(code: usize) -> Result<usize, CodecError> {
    if is_error(code) {
        Err(CodecError { code })
    } else {
        Ok(code)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Library-level queries
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps `ZSTD_versionNumber` (e.g. `10507` for v1.5.7).
pub fn version_number() -> u32 {
    unsafe { zstd_sys::ZSTD_versionNumber() }
}

/// Wraps `ZSTD_minCLevel` — the fastest (most negative) supported level.
pub fn min_compression_level() -> i32 {
    unsafe { zstd_sys::ZSTD_minCLevel() }
}

/// Wraps `ZSTD_maxCLevel` — the slowest, highest-ratio supported level.
pub fn max_compression_level() -> i32 {
    unsafe { zstd_sys::ZSTD_maxCLevel() }
}

/// Wraps `ZSTD_compressBound` — worst-case compressed size for `src_size`
/// input bytes in a single frame.
pub fn compress_bound(src_size: usize) -> usize {
    unsafe { zstd_sys::ZSTD_compressBound(src_size) }
}

/// First library version providing the unified `ZSTD_compressStream2` path.
/// Older codecs only offer the legacy init/flush/end triple, which this crate
/// does not drive.
pub(crate) const MIN_SUPPORTED_VERSION: u32 = 10400;

// ─────────────────────────────────────────────────────────────────────────────
// Buffer descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// Read-side buffer descriptor: a source slice plus a consumption cursor.
///
/// The native call advances `pos`; `pos <= src.len()` always holds.
#[derive(Debug)]
pub struct InBuffer<'a> {
    pub src: &'a [u8],
    pub pos: usize,
}

impl<'a> InBuffer<'a> {
    /// Wrap `src` with `pos = 0`.
    pub fn around(src: &'a [u8]) -> Self {
        InBuffer { src, pos: 0 }
    }

    fn to_native(&mut self) -> zstd_sys::ZSTD_inBuffer {
        zstd_sys::ZSTD_inBuffer {
            src: self.src.as_ptr() as *const c_void,
            size: self.src.len(),
            pos: self.pos,
        }
    }
}

/// Write-side buffer descriptor: a destination slice plus a fill cursor.
///
/// The native call advances `pos`; bytes `..pos` are valid output.
#[derive(Debug)]
pub struct OutBuffer<'a> {
    pub dst: &'a mut [u8],
    pub pos: usize,
}

impl<'a> OutBuffer<'a> {
    /// Wrap `dst` with `pos = 0`.
    pub fn around(dst: &'a mut [u8]) -> Self {
        OutBuffer { dst, pos: 0 }
    }

    /// `true` once the destination has no room left.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.pos == self.dst.len()
    }

    fn to_native(&mut self) -> zstd_sys::ZSTD_outBuffer {
        zstd_sys::ZSTD_outBuffer {
            dst: self.dst.as_mut_ptr() as *mut c_void,
            size: self.dst.len(),
            pos: self.pos,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compression context guard
// ─────────────────────────────────────────────────────────────────────────────

/// Owning guard around a native `ZSTD_CCtx`.
///
/// The native state is freed exactly once when the guard drops, including
/// during unwinds. The pointer never escapes this module.
pub(crate) struct CCtxHandle {
    ptr: NonNull<zstd_sys::ZSTD_CCtx>,
}

impl CCtxHandle {
    /// Wraps `ZSTD_createCCtx`. Fails only on allocation failure.
    pub(crate) fn new() -> Result<Self, CodecError> {
        let ptr = unsafe { zstd_sys::ZSTD_createCCtx() };
        NonNull::new(ptr)
            .map(|ptr| CCtxHandle { ptr })
            .ok_or(CodecError { code: usize::MAX })
    }

    /// Wraps `ZSTD_CCtx_setParameter(ZSTD_c_compressionLevel)`.
    pub(crate) fn set_compression_level(&mut self, level: i32) -> Result<(), CodecError> {
        parse_code(unsafe {
            zstd_sys::ZSTD_CCtx_setParameter(
                self.ptr.as_ptr(),
                zstd_sys::ZSTD_cParameter::ZSTD_c_compressionLevel,
                level as c_int,
            )
        })
        .map(|_| ())
    }

    /// Wraps `ZSTD_CCtx_refPrefix`.
    ///
    /// The referenced bytes must stay at a stable address until the frame
    /// using them has been fully compressed or the session is reset; the
    /// caller owns that pin.
    pub(crate) fn ref_prefix(&mut self, prefix: &[u8]) -> Result<(), CodecError> {
        parse_code(unsafe {
            zstd_sys::ZSTD_CCtx_refPrefix(
                self.ptr.as_ptr(),
                prefix.as_ptr() as *const c_void,
                prefix.len(),
            )
        })
        .map(|_| ())
    }

    /// Wraps `ZSTD_CCtx_reset(ZSTD_reset_session_only)`. Parameters survive;
    /// any in-progress frame and referenced prefix are abandoned.
    pub(crate) fn reset_session(&mut self) -> Result<(), CodecError> {
        parse_code(unsafe {
            zstd_sys::ZSTD_CCtx_reset(
                self.ptr.as_ptr(),
                zstd_sys::ZSTD_ResetDirective::ZSTD_reset_session_only,
            )
        })
        .map(|_| ())
    }

    /// Wraps `ZSTD_compressStream2`.
    ///
    /// Returns the codec's "bytes still to flush" value; `0` means the
    /// requested directive completed. Both cursors are advanced in place.
    pub(crate) fn compress_stream2(
        &mut self,
        output: &mut OutBuffer<'_>,
        input: &mut InBuffer<'_>,
        directive: EndDirective,
    ) -> Result<usize, CodecError> {
        let mut out = output.to_native();
        let mut inp = input.to_native();
        let code = unsafe {
            zstd_sys::ZSTD_compressStream2(
                self.ptr.as_ptr(),
                &mut out,
                &mut inp,
                directive.to_native(),
            )
        };
        output.pos = out.pos;
        input.pos = inp.pos;
        parse_code(code)
    }
}

impl Drop for CCtxHandle {
    fn drop(&mut self) {
        unsafe {
            zstd_sys::ZSTD_freeCCtx(self.ptr.as_ptr());
        }
    }
}

// The native context carries no thread affinity; it must simply not be
// entered concurrently, which `&mut self` already enforces.
unsafe impl Send for CCtxHandle {}

// ─────────────────────────────────────────────────────────────────────────────
// Decompression context guard
// ─────────────────────────────────────────────────────────────────────────────

/// Owning guard around a native `ZSTD_DCtx`. Same lifetime rules as
/// [`CCtxHandle`].
pub(crate) struct DCtxHandle {
    ptr: NonNull<zstd_sys::ZSTD_DCtx>,
}

impl DCtxHandle {
    /// Wraps `ZSTD_createDCtx`.
    pub(crate) fn new() -> Result<Self, CodecError> {
        let ptr = unsafe { zstd_sys::ZSTD_createDCtx() };
        NonNull::new(ptr)
            .map(|ptr| DCtxHandle { ptr })
            .ok_or(CodecError { code: usize::MAX })
    }

    /// Wraps `ZSTD_DCtx_setParameter(ZSTD_d_windowLogMax)`.
    pub(crate) fn set_window_log_max(&mut self, window_log: u32) -> Result<(), CodecError> {
        parse_code(unsafe {
            zstd_sys::ZSTD_DCtx_setParameter(
                self.ptr.as_ptr(),
                zstd_sys::ZSTD_dParameter::ZSTD_d_windowLogMax,
                window_log as c_int,
            )
        })
        .map(|_| ())
    }

    /// Wraps `ZSTD_DCtx_reset(ZSTD_reset_session_only)`.
    pub(crate) fn reset_session(&mut self) -> Result<(), CodecError> {
        parse_code(unsafe {
            zstd_sys::ZSTD_DCtx_reset(
                self.ptr.as_ptr(),
                zstd_sys::ZSTD_ResetDirective::ZSTD_reset_session_only,
            )
        })
        .map(|_| ())
    }

    /// Wraps `ZSTD_decompressStream`.
    ///
    /// Returns `0` when the current frame just completed, otherwise a
    /// strictly positive hint of how many more input bytes the codec expects.
    pub(crate) fn decompress_stream(
        &mut self,
        output: &mut OutBuffer<'_>,
        input: &mut InBuffer<'_>,
    ) -> Result<usize, CodecError> {
        let mut out = output.to_native();
        let mut inp = input.to_native();
        let code = unsafe {
            zstd_sys::ZSTD_decompressStream(self.ptr.as_ptr(), &mut out, &mut inp)
        };
        output.pos = out.pos;
        input.pos = inp.pos;
        parse_code(code)
    }
}

impl Drop for DCtxHandle {
    fn drop(&mut self) {
        unsafe {
            zstd_sys::ZSTD_freeDCtx(self.ptr.as_ptr());
        }
    }
}

unsafe impl Send for DCtxHandle {}

// ─────────────────────────────────────────────────────────────────────────────
// Frame inspection queries
// ─────────────────────────────────────────────────────────────────────────────

/// Raw frame-header fields as reported by `ZSTD_getFrameHeader`, before
/// translation into the public [`FrameInfo`](crate::frame::types::FrameInfo).
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawFrameHeader {
    /// Decompressed size when advertised; for skippable frames, the payload
    /// length. `None` when the header omits the field.
    pub content_size: Option<u64>,
    pub window_size: u64,
    pub dict_id: u32,
    pub checksum_flag: bool,
    pub skippable: bool,
}

/// Outcome of a frame-header parse attempt over a possibly short input.
pub(crate) enum HeaderParse {
    /// Header fully decoded.
    Done(RawFrameHeader),
    /// Input too short; the codec wants at least this many bytes.
    NeedMore(usize),
}

/// Wraps `ZSTD_getFrameHeader`.
///
/// Short input is not an error here — it surfaces as
/// [`HeaderParse::NeedMore`] so streaming callers can refill and retry.
pub(crate) fn get_frame_header(src: &[u8]) -> Result<HeaderParse, CodecError> {
    let mut raw = unsafe { std::mem::MaybeUninit::<zstd_sys::ZSTD_FrameHeader>::zeroed().assume_init() };
    let code = unsafe {
        zstd_sys::ZSTD_getFrameHeader(&mut raw, src.as_ptr() as *const c_void, src.len())
    };
    if is_error(code) {
        return Err(CodecError { code });
    }
    if code > 0 {
        return Ok(HeaderParse::NeedMore(code));
    }
    let skippable =
        matches!(raw.frameType, zstd_sys::ZSTD_FrameType_e::ZSTD_skippableFrame);
    // Regular frames report "no content-size field" through the UNKNOWN
    // sentinel; skippable frames always carry their payload length here.
    let content_size = match raw.frameContentSize as u64 {
        x if !skippable && x == zstd_sys::ZSTD_CONTENTSIZE_UNKNOWN as u64 => None,
        n => Some(n),
    };
    Ok(HeaderParse::Done(RawFrameHeader {
        content_size,
        window_size: raw.windowSize as u64,
        dict_id: raw.dictID,
        checksum_flag: raw.checksumFlag != 0,
        skippable,
    }))
}

/// Wraps `ZSTD_findFrameCompressedSize`.
///
/// `src` must start at a frame boundary and contain the entire frame
/// (skippable frames included); errors otherwise.
pub(crate) fn find_frame_compressed_size(src: &[u8]) -> Result<usize, CodecError> {
    parse_code(unsafe {
        zstd_sys::ZSTD_findFrameCompressedSize(src.as_ptr() as *const c_void, src.len())
    })
}

/// Wraps `ZSTD_getFrameContentSize`.
///
/// `Ok(None)` means the frame does not advertise its decompressed size;
/// `Err` means `src` does not hold a parsable frame header.
pub(crate) fn get_frame_content_size(src: &[u8]) -> Result<Option<u64>, CodecError> {
    let raw = unsafe {
        zstd_sys::ZSTD_getFrameContentSize(src.as_ptr() as *const c_void, src.len())
    };
    let unknown = zstd_sys::ZSTD_CONTENTSIZE_UNKNOWN as u64;
    let error = zstd_sys::ZSTD_CONTENTSIZE_ERROR as u64;
    match raw as u64 {
        x if x == unknown => Ok(None),
        x if x == error => Err(CodecError { code: usize::MAX }),
        n => Ok(Some(n)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Narrow safe wrappers over the raw ZSTD contexts.
//!
//! This is the crate's entire view of the codec: create a context with our
//! allocator callbacks, set parameters on it, run a one-shot operation,
//! reset it, classify the result.  Everything else about ZSTD is someone
//! else's business.
//!
//! Both handles own their raw context plus the boxed [`MemHooks`] the
//! codec's allocator callbacks dereference; the box keeps that state at a
//! stable address for as long as the context can still allocate or free.

use std::ffi::CStr;
use std::os::raw::{c_int, c_void};
use std::sync::Arc;

use crate::alloc::{custom_mem, MemHooks};
use crate::stats::{AdapterStats, Stat};

/// Runtime version number of the linked ZSTD library
/// (`major * 10000 + minor * 100 + patch`).
pub(crate) fn version_number() -> u32 {
    unsafe { zstd_sys::ZSTD_versionNumber() as u32 }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error classification
// ─────────────────────────────────────────────────────────────────────────────

/// A raw ZSTD error code, kept verbatim for classification and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CodecError {
    code: usize,
}

impl CodecError {
    /// Wraps a raw return value, separating success (the produced size)
    /// from failure.
    fn check(code: usize) -> Result<usize, CodecError> {
        if unsafe { zstd_sys::ZSTD_isError(code) } != 0 {
            Err(CodecError { code })
        } else {
            Ok(code)
        }
    }

    /// True when the failure only means the output did not fit — an
    /// expected outcome for incompressible input, not a codec fault.
    pub(crate) fn is_dst_too_small(&self) -> bool {
        let kind = unsafe { zstd_sys::ZSTD_getErrorCode(self.code) };
        kind == zstd_sys::ZSTD_ErrorCode::ZSTD_error_dstSize_tooSmall
    }

    /// The codec's own description of the error.
    pub(crate) fn name(&self) -> &'static str {
        unsafe {
            let ptr = zstd_sys::ZSTD_getErrorName(self.code);
            CStr::from_ptr(ptr).to_str().unwrap_or("unknown zstd error")
        }
    }
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::error::Error for CodecError {}

// ─────────────────────────────────────────────────────────────────────────────
// Parameters and reset directives
// ─────────────────────────────────────────────────────────────────────────────

/// Compression parameters the pipeline sets per checkout.
pub(crate) enum CParam {
    /// Signed compression level (fast levels are negative).
    CompressionLevel(i32),
    /// Suppress the codec's 4-byte magic; the frame header replaces it.
    MagiclessFormat,
    /// Whether the codec appends its own content checksum.
    ChecksumFlag(bool),
    /// Whether the codec stores the original content size.
    ContentSizeFlag(bool),
}

impl CParam {
    fn to_raw(&self) -> (zstd_sys::ZSTD_cParameter, c_int) {
        use zstd_sys::ZSTD_cParameter::*;
        match *self {
            CParam::CompressionLevel(level) => (ZSTD_c_compressionLevel, level as c_int),
            // ZSTD_c_format lives behind the experimental alias.
            CParam::MagiclessFormat => (
                ZSTD_c_experimentalParam2,
                zstd_sys::ZSTD_format_e::ZSTD_f_zstd1_magicless as c_int,
            ),
            CParam::ChecksumFlag(on) => (ZSTD_c_checksumFlag, c_int::from(on)),
            CParam::ContentSizeFlag(on) => (ZSTD_c_contentSizeFlag, c_int::from(on)),
        }
    }
}

/// Which part of a context to reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResetKind {
    /// Abandon the current session (after an error); parameters survive.
    SessionOnly,
    /// Return parameters to defaults; done at every pool checkout.
    Parameters,
}

impl ResetKind {
    fn to_raw(self) -> zstd_sys::ZSTD_ResetDirective {
        match self {
            ResetKind::SessionOnly => zstd_sys::ZSTD_ResetDirective::ZSTD_reset_session_only,
            ResetKind::Parameters => zstd_sys::ZSTD_ResetDirective::ZSTD_reset_parameters,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compression context
// ─────────────────────────────────────────────────────────────────────────────

/// Owned ZSTD compression context with the non-blocking allocator
/// personality.
pub(crate) struct CompressCtx {
    ctx: *mut zstd_sys::ZSTD_CCtx,
    hooks: Box<MemHooks>,
}

// The raw context is exclusively owned and never aliased; moving it between
// threads is what the pool exists to do.
unsafe impl Send for CompressCtx {}

impl CompressCtx {
    /// Creates a context, or `None` when the codec (or its first workspace
    /// allocation) fails.  Counts itself in the `buffers` gauge.
    pub(crate) fn new(stats: Arc<AdapterStats>) -> Option<CompressCtx> {
        let hooks = Box::new(MemHooks { blocking: false, stats });
        let ctx = unsafe { zstd_sys::ZSTD_createCCtx_advanced(custom_mem(&hooks)) };
        if ctx.is_null() {
            return None;
        }
        hooks.stats.add(Stat::Buffers, 1);
        Some(CompressCtx { ctx, hooks })
    }

    /// Sets one parameter; failures are surfaced but harmless to ignore for
    /// parameters that are known-valid.
    pub(crate) fn set_parameter(&mut self, param: CParam) -> Result<(), CodecError> {
        let (raw, value) = param.to_raw();
        let code = unsafe { zstd_sys::ZSTD_CCtx_setParameter(self.ctx, raw, value) };
        CodecError::check(code).map(|_| ())
    }

    /// One-shot compression of `src` into `dst` under the parameters set so
    /// far.  Returns the produced byte count.
    pub(crate) fn compress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, CodecError> {
        let code = unsafe {
            zstd_sys::ZSTD_compress2(
                self.ctx,
                dst.as_mut_ptr() as *mut c_void,
                dst.len(),
                src.as_ptr() as *const c_void,
                src.len(),
            )
        };
        CodecError::check(code)
    }

    pub(crate) fn reset(&mut self, kind: ResetKind) -> Result<(), CodecError> {
        let code = unsafe { zstd_sys::ZSTD_CCtx_reset(self.ctx, kind.to_raw()) };
        CodecError::check(code).map(|_| ())
    }
}

impl PartialEq for CompressCtx {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ctx, other.ctx)
    }
}

impl Drop for CompressCtx {
    fn drop(&mut self) {
        // Frees through zstd_free_cb, which still needs self.hooks; the box
        // itself is dropped after this body returns.
        unsafe { zstd_sys::ZSTD_freeCCtx(self.ctx) };
        self.hooks.stats.sub(Stat::Buffers, 1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decompression context
// ─────────────────────────────────────────────────────────────────────────────

/// Owned ZSTD decompression context with the blocking allocator
/// personality.
pub(crate) struct DecompressCtx {
    ctx: *mut zstd_sys::ZSTD_DCtx,
    hooks: Box<MemHooks>,
}

unsafe impl Send for DecompressCtx {}

impl DecompressCtx {
    pub(crate) fn new(stats: Arc<AdapterStats>) -> Option<DecompressCtx> {
        let hooks = Box::new(MemHooks { blocking: true, stats });
        let ctx = unsafe { zstd_sys::ZSTD_createDCtx_advanced(custom_mem(&hooks)) };
        if ctx.is_null() {
            return None;
        }
        hooks.stats.add(Stat::Buffers, 1);
        Some(DecompressCtx { ctx, hooks })
    }

    /// Expect magic-less frames from here on.
    pub(crate) fn set_magicless_format(&mut self) -> Result<(), CodecError> {
        let code = unsafe {
            zstd_sys::ZSTD_DCtx_setParameter(
                self.ctx,
                // ZSTD_d_format lives behind the experimental alias.
                zstd_sys::ZSTD_dParameter::ZSTD_d_experimentalParam1,
                zstd_sys::ZSTD_format_e::ZSTD_f_zstd1_magicless as c_int,
            )
        };
        CodecError::check(code).map(|_| ())
    }

    /// One-shot decompression of `src` into `dst`.  Returns the number of
    /// bytes written.
    pub(crate) fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, CodecError> {
        let code = unsafe {
            zstd_sys::ZSTD_decompressDCtx(
                self.ctx,
                dst.as_mut_ptr() as *mut c_void,
                dst.len(),
                src.as_ptr() as *const c_void,
                src.len(),
            )
        };
        CodecError::check(code)
    }

    pub(crate) fn reset(&mut self, kind: ResetKind) -> Result<(), CodecError> {
        let code = unsafe { zstd_sys::ZSTD_DCtx_reset(self.ctx, kind.to_raw()) };
        CodecError::check(code).map(|_| ())
    }
}

impl PartialEq for DecompressCtx {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ctx, other.ctx)
    }
}

impl Drop for DecompressCtx {
    fn drop(&mut self) {
        unsafe { zstd_sys::ZSTD_freeDCtx(self.ctx) };
        self.hooks.stats.sub(Stat::Buffers, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_number_fits_the_header_field() {
        let version = version_number();
        assert!(version > 0);
        assert!(version <= crate::frame::VERSION_MAX);
    }

    #[test]
    fn create_and_drop_track_the_buffers_gauge() {
        let stats = Arc::new(AdapterStats::new());
        {
            let _c = CompressCtx::new(Arc::clone(&stats)).expect("cctx");
            let _d = DecompressCtx::new(Arc::clone(&stats)).expect("dctx");
            assert_eq!(stats.get(Stat::Buffers), 2);
            assert!(stats.get(Stat::Size) > 0, "contexts hold workspace bytes");
        }
        assert_eq!(stats.get(Stat::Buffers), 0);
        assert_eq!(stats.get(Stat::Size), 0);
    }

    #[test]
    fn oneshot_magicless_roundtrip() {
        let stats = Arc::new(AdapterStats::new());
        let mut cctx = CompressCtx::new(Arc::clone(&stats)).expect("cctx");
        cctx.set_parameter(CParam::CompressionLevel(3)).expect("level");
        cctx.set_parameter(CParam::MagiclessFormat).expect("format");
        cctx.set_parameter(CParam::ChecksumFlag(false)).expect("checksum");
        cctx.set_parameter(CParam::ContentSizeFlag(false)).expect("contentsize");

        let src = vec![0x5Au8; 4096];
        let mut compressed = vec![0u8; 4096];
        let c_len = cctx.compress(&mut compressed, &src).expect("compress");
        assert!(c_len < src.len());

        let mut dctx = DecompressCtx::new(stats).expect("dctx");
        dctx.set_magicless_format().expect("format");
        let mut out = vec![0u8; 4096];
        let written = dctx.decompress(&mut out, &compressed[..c_len]).expect("decompress");
        assert_eq!(written, src.len());
        assert_eq!(out, src);
    }

    #[test]
    fn dst_too_small_is_classified_as_such() {
        let stats = Arc::new(AdapterStats::new());
        let mut cctx = CompressCtx::new(stats).expect("cctx");
        cctx.set_parameter(CParam::CompressionLevel(1)).expect("level");

        // No frame fits in 4 bytes, however compressible the input.
        let src = vec![0xA5u8; 4096];
        let mut dst = vec![0u8; 4];
        let err = cctx.compress(&mut dst, &src).expect_err("must overflow");
        assert!(err.is_dst_too_small(), "got: {err}");
    }

    #[test]
    fn session_reset_recovers_from_an_error() {
        let stats = Arc::new(AdapterStats::new());
        let mut cctx = CompressCtx::new(stats).expect("cctx");
        cctx.set_parameter(CParam::CompressionLevel(3)).expect("level");

        let src = vec![0x11u8; 2048];
        let mut tiny = vec![0u8; 8];
        assert!(cctx.compress(&mut tiny, &src).is_err());
        cctx.reset(ResetKind::SessionOnly).expect("reset");

        let mut dst = vec![0u8; 4096];
        assert!(cctx.compress(&mut dst, &src).is_ok());
    }
}

//! The block adapter: compression and decompression pipelines, the
//! early-abort heuristic, and lifecycle.
//!
//! A [`BlockAdapter`] owns everything process-wide the pipelines need — one
//! pool of compression contexts, one pool of decompression contexts, the
//! counter block, and the tunables.  Construction is initialization;
//! dropping the adapter tears the pools down (contexts are owned values, so
//! a live borrow can never dangle — the pipelines always return their
//! context before they return to the caller).
//!
//! Both compression entry points speak the storage layer's convention: the
//! return value is the produced frame size, and a return equal to
//! `src.len()` means "declined — store the block uncompressed".  Declining
//! covers every compression-side failure (bad level, no memory, output did
//! not fit, codec fault); only a genuine codec fault is counted as one.
//! Decompression, by contrast, fails loudly: a block that cannot be decoded
//! is unreadable data, and the caller needs to know.

use std::sync::Arc;

use crate::codec::{self, CParam, CompressCtx, DecompressCtx, ResetKind};
use crate::frame::{FrameError, FrameHeader, HEADER_SIZE, VERSION_MAX};
use crate::level::BlockLevel;
use crate::pool::ObjPool;
use crate::stats::{AdapterStats, Stat};
use crate::tunables::Tunables;

// ─────────────────────────────────────────────────────────────────────────────
// DecompressError
// ─────────────────────────────────────────────────────────────────────────────

/// Why a block could not be decompressed.  Every variant corresponds to
/// exactly one counter bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressError {
    /// The stored level byte is outside the recognized domain — a strong
    /// indicator of corruption.
    LevelInvalid,
    /// The header's compressed length does not fit inside the frame.
    HeaderInvalid,
    /// No decompression context could be produced.
    AllocFailed,
    /// The codec rejected the payload.
    CodecFailed,
}

impl std::fmt::Display for DecompressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecompressError::LevelInvalid => write!(f, "stored compression level is invalid"),
            DecompressError::HeaderInvalid => write!(f, "frame header is invalid"),
            DecompressError::AllocFailed => write!(f, "decompression context unavailable"),
            DecompressError::CodecFailed => write!(f, "decompression failed"),
        }
    }
}

impl std::error::Error for DecompressError {}

// ─────────────────────────────────────────────────────────────────────────────
// BlockAdapter
// ─────────────────────────────────────────────────────────────────────────────

/// Compression adapter for fixed-size logical blocks.
///
/// Cheap to share behind an `Arc`; every entry point takes `&self`.
pub struct BlockAdapter {
    cctx_pool: ObjPool<CompressCtx>,
    dctx_pool: ObjPool<DecompressCtx>,
    stats: Arc<AdapterStats>,
    tunables: Tunables,
}

impl Default for BlockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockAdapter {
    /// Builds the two context pools, the counter block, and default
    /// tunables.
    pub fn new() -> BlockAdapter {
        let stats = Arc::new(AdapterStats::new());

        let cctx_stats = Arc::clone(&stats);
        let cctx_pool = ObjPool::new(
            "zstd-cctx",
            Box::new(move || CompressCtx::new(Arc::clone(&cctx_stats))),
            // Compressor state is reset per *session* only on error; the
            // checkout reset scrubs parameters alone.
            Box::new(|ctx: &mut CompressCtx| {
                let _ = ctx.reset(ResetKind::Parameters);
            }),
        );

        let dctx_stats = Arc::clone(&stats);
        let dctx_pool = ObjPool::new(
            "zstd-dctx",
            Box::new(move || DecompressCtx::new(Arc::clone(&dctx_stats))),
            Box::new(|ctx: &mut DecompressCtx| {
                let _ = ctx.reset(ResetKind::Parameters);
            }),
        );

        BlockAdapter { cctx_pool, dctx_pool, stats, tunables: Tunables::new() }
    }

    /// The adapter's counters.
    pub fn stats(&self) -> &AdapterStats {
        &self.stats
    }

    /// A shareable handle to the counters that outlives the adapter —
    /// useful for verifying the gauges drain to zero after teardown.
    pub fn stats_handle(&self) -> Arc<AdapterStats> {
        Arc::clone(&self.stats)
    }

    /// The adapter's runtime configuration.
    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// Version number of the linked codec, as stored in frame headers.
    pub fn codec_version_number() -> u32 {
        codec::version_number()
    }

    /// Reap both pools if they have sat idle past the reap interval.
    /// Advisory; the host calls this when memory pressure rises.
    pub fn reap_now(&self) {
        self.cctx_pool.reap();
        self.dctx_pool.reap();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Compression
    // ─────────────────────────────────────────────────────────────────────

    /// Compresses one block with early-abort probing.
    ///
    /// For blocks that are big enough, at a level expensive enough, a cheap
    /// LZ4 pass against a tightened budget decides whether the data looks
    /// compressible at all; when LZ4 says no, an optional fast-ZSTD pass
    /// gets a second opinion.  Only when a probe says yes (or the gate does
    /// not engage) does the requested level run.
    ///
    /// Why two passes: LZ4 alone loses a chunk of the achievable savings on
    /// highly compressible data, and the zstd-fast levels alone are weaker
    /// predictors than LZ4.  Stacked, each covers the other's blind spot.
    ///
    /// Returns the produced frame size; `src.len()` means declined.
    /// `dst` contents are unspecified after a decline — the fast-ZSTD probe
    /// uses it as scratch space.
    pub fn compress_with_heuristic(&self, src: &[u8], dst: &mut [u8], raw_level: u8) -> usize {
        let s_len = src.len();

        let level = match BlockLevel::from_raw(raw_level) {
            Ok(level) => level,
            Err(_) => {
                self.stats.bump(Stat::CompressLevelInvalid);
                return s_len;
            }
        };

        let t = &self.tunables;
        // The ea_* tunables reserve a level-scaled abort size here; until
        // that lands, the configured size is used as-is.
        let abort_size = t.abort_size();
        let hard = t.hard_mode() > 0;

        let engaged = hard
            || (t.lz4_pass()
                && level.codec_level() >= t.cutoff_level()
                && s_len >= abort_size);

        if engaged {
            // The probe's destination budget is s_len shrunk by a few
            // percent: LZ4 output that cannot beat that is a strong signal
            // the requested level will not pay for itself either.
            let shift = t.lz4_shift_size().min(usize::BITS - 1);
            let lz4_budget = s_len - (s_len >> shift);
            let lz4_fits = lz4_flex::block::compress(src).len() < lz4_budget;

            if lz4_fits && !hard {
                self.stats.bump(Stat::Lz4PassAllowed);
            } else {
                self.stats.bump(Stat::Lz4PassRejected);
                if !t.zstd_pass() {
                    if !hard {
                        return s_len;
                    }
                } else {
                    let probe_level = match t.firstpass_mode() {
                        // Mode 3's experimental tuned profile is not
                        // implemented; it probes at zstd-2 like mode 2.
                        2 | 3 => BlockLevel::Level2,
                        _ => BlockLevel::Level1,
                    };
                    let pass_len = self.compress(src, dst, probe_level.raw());
                    if (pass_len == s_len || pass_len == 0 || pass_len > dst.len()) && !hard {
                        self.stats.bump(Stat::ZstdPassRejected);
                        return s_len;
                    }
                    self.stats.bump(Stat::ZstdPassAllowed);
                }
            }
        } else {
            self.stats.bump(Stat::PassIgnored);
            if s_len < abort_size {
                self.stats.bump(Stat::PassIgnoredSize);
            }
        }

        self.compress(src, dst, raw_level)
    }

    /// Compresses one block at the requested level, no probing.
    ///
    /// Emits the 8-byte frame header followed by the magic-less payload.
    /// Returns the produced frame size; `src.len()` means declined.
    pub fn compress(&self, src: &[u8], dst: &mut [u8], raw_level: u8) -> usize {
        let s_len = src.len();

        let level = match BlockLevel::from_raw(raw_level) {
            Ok(level) => level,
            Err(_) => {
                self.stats.bump(Stat::CompressLevelInvalid);
                return s_len;
            }
        };

        debug_assert!(dst.len() >= HEADER_SIZE);
        debug_assert!(dst.len() <= s_len);
        if dst.len() < HEADER_SIZE {
            return s_len;
        }

        let mut cctx = match self.cctx_pool.grab() {
            Some(ctx) => ctx,
            // Out of memory; gently fall through so the caller stores the
            // block uncompressed rather than stalling the write path.
            None => {
                self.stats.bump(Stat::CompressAllocFail);
                return s_len;
            }
        };

        let _ = cctx.set_parameter(CParam::CompressionLevel(level.codec_level()));
        // The frame header replaces the codec's magic, and the host already
        // checksums and sizes each block.
        let _ = cctx.set_parameter(CParam::MagiclessFormat);
        let _ = cctx.set_parameter(CParam::ChecksumFlag(false));
        let _ = cctx.set_parameter(CParam::ContentSizeFlag(false));

        let result = cctx.compress(&mut dst[HEADER_SIZE..], src);
        if result.is_err() {
            // Session state is only suspect after an error.
            let _ = cctx.reset(ResetKind::SessionOnly);
        }
        self.cctx_pool.ungrab(cctx);

        let c_len = match result {
            Ok(c_len) => c_len,
            Err(err) => {
                // Output not fitting is the expected fate of incompressible
                // input; anything else is a real failure.
                if !err.is_dst_too_small() {
                    self.stats.bump(Stat::CompressFailed);
                    tracing::debug!(error = %err, "zstd block compression failed");
                }
                return s_len;
            }
        };

        if c_len + HEADER_SIZE > s_len {
            return s_len;
        }

        debug_assert!(codec::version_number() <= VERSION_MAX);
        let header = FrameHeader {
            c_len: c_len as u32,
            version: codec::version_number(),
            // The original enumerant, not the translated codec level, so a
            // future level-table change cannot strand this block.
            level_byte: raw_level,
        };
        if header.encode(dst).is_err() {
            return s_len;
        }

        c_len + HEADER_SIZE
    }

    // ─────────────────────────────────────────────────────────────────────
    // Decompression
    // ─────────────────────────────────────────────────────────────────────

    /// Decompresses one frame into `dst`.
    pub fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<(), DecompressError> {
        self.decompress_with_level(src, dst).map(|_| ())
    }

    /// Decompresses one frame and reports the level it was compressed
    /// with, as stored in the header.
    pub fn decompress_with_level(
        &self,
        src: &[u8],
        dst: &mut [u8],
    ) -> Result<BlockLevel, DecompressError> {
        let s_len = src.len();

        let header = match FrameHeader::decode(src) {
            Ok(header) => header,
            Err(_) => {
                self.stats.bump(Stat::DecompressHeaderInvalid);
                return Err(DecompressError::HeaderInvalid);
            }
        };

        // The stored codec version (header.version()) is deliberately
        // ignored: no incompatible codec change exists yet.  When one
        // appears, this is where decoding diverges on it.
        let level = match header.validate(s_len) {
            Ok(level) => level,
            Err(FrameError::LevelInvalid(_)) => {
                self.stats.bump(Stat::DecompressLevelInvalid);
                return Err(DecompressError::LevelInvalid);
            }
            Err(_) => {
                self.stats.bump(Stat::DecompressHeaderInvalid);
                return Err(DecompressError::HeaderInvalid);
            }
        };

        debug_assert!(dst.len() >= s_len);

        let mut dctx = match self.dctx_pool.grab() {
            Some(ctx) => ctx,
            // The blocking allocator personality means this can't happen in
            // practice; defend anyway.
            None => {
                self.stats.bump(Stat::DecompressAllocFail);
                return Err(DecompressError::AllocFailed);
            }
        };

        let _ = dctx.set_magicless_format();

        let payload = &src[HEADER_SIZE..HEADER_SIZE + header.c_len as usize];
        let result = dctx.decompress(dst, payload);
        if result.is_err() {
            let _ = dctx.reset(ResetKind::SessionOnly);
        }
        self.dctx_pool.ungrab(dctx);

        match result {
            Ok(_) => Ok(level),
            Err(err) => {
                self.stats.bump(Stat::DecompressFailed);
                tracing::debug!(error = %err, "zstd block decompression failed");
                Err(DecompressError::CodecFailed)
            }
        }
    }
}

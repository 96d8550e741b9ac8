//! `zblock` — a block-level Zstandard compression adapter for storage I/O
//! paths.
//!
//! Each fixed-size logical block handed to the adapter becomes a
//! self-describing frame: an 8-byte big-endian header (compressed length,
//! codec version, and the originally requested level) followed by the
//! compressed payload in magic-less ZSTD framing.  Decoding needs nothing
//! but the frame itself.
//!
//! Expensive codec contexts are recycled through per-adapter elastic pools,
//! and an optional two-stage early-abort heuristic (an LZ4 pass against a
//! tightened budget, then a fast-ZSTD pass) skips the requested level
//! entirely when a block looks incompressible.
//!
//! # Crate layout
//!
//! | Module     | Contents |
//! |------------|----------|
//! | `adapter`  | [`BlockAdapter`] — compression/decompression pipelines, heuristic, lifecycle. |
//! | `frame`    | The 8-byte big-endian frame header: encode, decode, validate. |
//! | `level`    | [`BlockLevel`] — the closed storage-layer level domain and its ZSTD translation. |
//! | `pool`     | [`ObjPool`] — mutex-protected elastic free-list with idle reaping. |
//! | `stats`    | [`AdapterStats`] — named monotonic counters and gauges. |
//! | `tunables` | [`Tunables`] — runtime-writable heuristic knobs. |
//!
//! Two private modules complete the picture: `codec` (the narrow safe seam
//! over the raw ZSTD contexts) and `alloc` (the custom allocator callbacks
//! with size-prefixed records and the blocking/non-blocking personalities).
//!
//! # Example
//!
//! ```no_run
//! use zblock::{BlockAdapter, BlockLevel};
//!
//! let adapter = BlockAdapter::new();
//! let src = vec![0u8; 128 * 1024];
//! let mut dst = vec![0u8; src.len()];
//!
//! let produced = adapter.compress_with_heuristic(&src, &mut dst, BlockLevel::DEFAULT.raw());
//! if produced < src.len() {
//!     let mut out = vec![0u8; src.len()];
//!     let level = adapter
//!         .decompress_with_level(&dst[..produced], &mut out)
//!         .expect("round-trip");
//!     assert_eq!(level, BlockLevel::DEFAULT);
//!     assert_eq!(out, src);
//! } // else: store the block uncompressed
//! ```

pub mod adapter;
pub mod frame;
pub mod level;
pub mod pool;
pub mod stats;
pub mod tunables;

mod alloc;
mod codec;

// ── Top-level re-exports ──────────────────────────────────────────────────────
pub use adapter::{BlockAdapter, DecompressError};
pub use frame::{FrameError, FrameHeader, HEADER_SIZE};
pub use level::{BlockLevel, LevelError};
pub use stats::{AdapterStats, Stat, StatsSnapshot};
pub use tunables::Tunables;

/// Version number of the linked ZSTD library
/// (`major * 10000 + minor * 100 + patch`), as stamped into frame headers.
pub fn zstd_version_number() -> u32 {
    BlockAdapter::codec_version_number()
}

//! Named adapter counters.
//!
//! A fixed schema of 64-bit counters with stable string names, exported
//! read-only to the host.  Fourteen are monotonic event counters; `buffers`
//! and `size` are gauges tracking the live codec contexts and the bytes the
//! codec currently holds through the allocator shim, and are the only
//! counters that ever decrease.
//!
//! All operations are relaxed atomics: counters are independent and no
//! cross-counter consistency is promised.

use std::sync::atomic::{AtomicU64, Ordering};

// ─────────────────────────────────────────────────────────────────────────────
// Counter identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Identifies one counter in the fixed schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Stat {
    /// The allocator shim returned null at least once.
    AllocFail,
    /// A compression context could not be created.
    CompressAllocFail,
    /// A decompression context could not be created.
    DecompressAllocFail,
    /// `compress` was handed an unrecognized level byte.
    CompressLevelInvalid,
    /// A frame header carried an unrecognized level byte.
    DecompressLevelInvalid,
    /// A frame header failed the length invariant.
    DecompressHeaderInvalid,
    /// The codec reported a real compression failure (not "did not fit").
    CompressFailed,
    /// The codec reported a decompression failure.
    DecompressFailed,
    /// LZ4 first-pass early abort verdict: compressible, keep going.
    Lz4PassAllowed,
    /// LZ4 first-pass early abort verdict: incompressible.
    Lz4PassRejected,
    /// Fast-ZSTD second-pass verdict: compressible, keep going.
    ZstdPassAllowed,
    /// Fast-ZSTD second-pass verdict: give up.
    ZstdPassRejected,
    /// The early-abort gate did not engage for this block.
    PassIgnored,
    /// ...specifically because the block was below the abort size.
    PassIgnoredSize,
    /// Gauge: codec contexts currently alive (pooled or borrowed).
    Buffers,
    /// Gauge: bytes currently allocated to codec contexts.
    Size,
}

/// Number of counters in the schema.
pub const STAT_COUNT: usize = 16;

impl Stat {
    /// Every counter, in schema order.
    pub const ALL: [Stat; STAT_COUNT] = [
        Stat::AllocFail,
        Stat::CompressAllocFail,
        Stat::DecompressAllocFail,
        Stat::CompressLevelInvalid,
        Stat::DecompressLevelInvalid,
        Stat::DecompressHeaderInvalid,
        Stat::CompressFailed,
        Stat::DecompressFailed,
        Stat::Lz4PassAllowed,
        Stat::Lz4PassRejected,
        Stat::ZstdPassAllowed,
        Stat::ZstdPassRejected,
        Stat::PassIgnored,
        Stat::PassIgnoredSize,
        Stat::Buffers,
        Stat::Size,
    ];

    /// The stable external name of this counter.
    pub fn name(self) -> &'static str {
        match self {
            Stat::AllocFail => "alloc_fail",
            Stat::CompressAllocFail => "compress_alloc_fail",
            Stat::DecompressAllocFail => "decompress_alloc_fail",
            Stat::CompressLevelInvalid => "compress_level_invalid",
            Stat::DecompressLevelInvalid => "decompress_level_invalid",
            Stat::DecompressHeaderInvalid => "decompress_header_invalid",
            Stat::CompressFailed => "compress_failed",
            Stat::DecompressFailed => "decompress_failed",
            Stat::Lz4PassAllowed => "lz4pass_allowed",
            Stat::Lz4PassRejected => "lz4pass_rejected",
            Stat::ZstdPassAllowed => "zstdpass_allowed",
            Stat::ZstdPassRejected => "zstdpass_rejected",
            Stat::PassIgnored => "passignored",
            Stat::PassIgnoredSize => "passignored_size",
            Stat::Buffers => "buffers",
            Stat::Size => "size",
        }
    }

    /// True for the two gauges, which may legitimately decrease.
    pub fn is_gauge(self) -> bool {
        matches!(self, Stat::Buffers | Stat::Size)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AdapterStats
// ─────────────────────────────────────────────────────────────────────────────

/// The adapter's counter block.  Safe to share and update concurrently.
#[derive(Debug, Default)]
pub struct AdapterStats {
    counters: [AtomicU64; STAT_COUNT],
}

impl AdapterStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn cell(&self, stat: Stat) -> &AtomicU64 {
        &self.counters[stat as usize]
    }

    /// Increment `stat` by one.
    #[inline]
    pub fn bump(&self, stat: Stat) {
        self.cell(stat).fetch_add(1, Ordering::Relaxed);
    }

    /// Increment `stat` by `n`.
    #[inline]
    pub fn add(&self, stat: Stat, n: u64) {
        self.cell(stat).fetch_add(n, Ordering::Relaxed);
    }

    /// Decrement `stat` by `n`.  Only meaningful for the gauges.
    #[inline]
    pub fn sub(&self, stat: Stat, n: u64) {
        self.cell(stat).fetch_sub(n, Ordering::Relaxed);
    }

    /// Current value of `stat`.
    #[inline]
    pub fn get(&self, stat: Stat) -> u64 {
        self.cell(stat).load(Ordering::Relaxed)
    }

    /// Reset one counter to zero.
    pub fn zero(&self, stat: Stat) {
        self.cell(stat).store(0, Ordering::Relaxed);
    }

    /// Reset every monotonic counter, leaving the gauges alone — the host's
    /// stat-reset write path.  Clearing `buffers`/`size` would desynchronize
    /// them from the contexts that are actually alive.
    pub fn zero_all(&self) {
        for stat in Stat::ALL {
            if !stat.is_gauge() {
                self.zero(stat);
            }
        }
    }

    /// A point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut values = [0u64; STAT_COUNT];
        for stat in Stat::ALL {
            values[stat as usize] = self.get(stat);
        }
        StatsSnapshot { values }
    }
}

/// A copied view of the counters, detached from the live atomics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    values: [u64; STAT_COUNT],
}

impl StatsSnapshot {
    /// Value of `stat` at snapshot time.
    #[inline]
    pub fn get(&self, stat: Stat) -> u64 {
        self.values[stat as usize]
    }

    /// Iterates `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        Stat::ALL.iter().map(move |&s| (s.name(), self.values[s as usize]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_add_sub_get() {
        let stats = AdapterStats::new();
        stats.bump(Stat::CompressFailed);
        stats.bump(Stat::CompressFailed);
        assert_eq!(stats.get(Stat::CompressFailed), 2);

        stats.add(Stat::Size, 1024);
        stats.sub(Stat::Size, 24);
        assert_eq!(stats.get(Stat::Size), 1000);
    }

    #[test]
    fn counters_are_independent() {
        let stats = AdapterStats::new();
        stats.bump(Stat::Lz4PassAllowed);
        for stat in Stat::ALL {
            let expected = if stat == Stat::Lz4PassAllowed { 1 } else { 0 };
            assert_eq!(stats.get(stat), expected, "{}", stat.name());
        }
    }

    #[test]
    fn zero_all_spares_the_gauges() {
        let stats = AdapterStats::new();
        stats.bump(Stat::DecompressFailed);
        stats.add(Stat::Buffers, 3);
        stats.add(Stat::Size, 4096);

        stats.zero_all();
        assert_eq!(stats.get(Stat::DecompressFailed), 0);
        assert_eq!(stats.get(Stat::Buffers), 3);
        assert_eq!(stats.get(Stat::Size), 4096);
    }

    #[test]
    fn snapshot_is_detached() {
        let stats = AdapterStats::new();
        stats.bump(Stat::PassIgnored);
        let snap = stats.snapshot();
        stats.bump(Stat::PassIgnored);
        assert_eq!(snap.get(Stat::PassIgnored), 1);
        assert_eq!(stats.get(Stat::PassIgnored), 2);
    }

    #[test]
    fn names_are_stable_and_unique() {
        let names: Vec<&str> = Stat::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names[0], "alloc_fail");
        assert_eq!(names[STAT_COUNT - 1], "size");
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len(), "duplicate counter name");
    }

    #[test]
    fn snapshot_iter_follows_schema_order() {
        let stats = AdapterStats::new();
        stats.bump(Stat::AllocFail);
        let snap = stats.snapshot();
        let first = snap.iter().next();
        assert_eq!(first, Some(("alloc_fail", 1)));
        assert_eq!(snap.iter().count(), STAT_COUNT);
    }
}

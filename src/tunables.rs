//! Runtime-writable heuristic tunables and their compile-time defaults.
//!
//! Every knob is an independent relaxed atomic with a getter/setter pair, so
//! the host can retune a live adapter without synchronizing against in-flight
//! block operations.  A compress call reads each knob at most once; two calls
//! racing a setter may simply disagree about which configuration they saw.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicUsize, Ordering};

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// LZ4 first-pass probe enabled by default.
pub const DEFAULT_LZ4_PASS: bool = true;

/// Fast-ZSTD second-pass probe enabled by default.
pub const DEFAULT_ZSTD_PASS: bool = true;

/// Which level the second-pass probe runs: 1 → zstd-1, 2 → zstd-2.
/// (Mode 3 is accepted and currently behaves like mode 2; see
/// [`Tunables::set_firstpass_mode`].)
pub const DEFAULT_FIRSTPASS_MODE: u32 = 1;

/// Minimum translated codec level at which the early-abort gate engages.
pub const DEFAULT_CUTOFF_LEVEL: i32 = 3;

/// Minimum block size in bytes for the early-abort gate (128 KiB —
/// experimentally, smaller blocks gain too little to be worth the probe).
pub const DEFAULT_ABORT_SIZE: usize = 131_072;

/// Bits shifted off `s_len` to tighten the LZ4 probe budget
/// (3 → budget ≈ 0.875 × `s_len`).
pub const DEFAULT_LZ4_SHIFT_SIZE: u32 = 3;

/// Reserved level-scaled abort sizing: enable flag.
pub const DEFAULT_EA_DIVISION_MODE: u32 = 1;
/// Reserved level-scaled abort sizing: divisor per step.
pub const DEFAULT_EA_DIVISOR: u32 = 2;
/// Reserved level-scaled abort sizing: levels per step.
pub const DEFAULT_EA_LEVEL_FACTOR: u32 = 2;

/// Hard mode off by default.
pub const DEFAULT_HARD_MODE: u32 = 0;

// ─────────────────────────────────────────────────────────────────────────────
// Tunables
// ─────────────────────────────────────────────────────────────────────────────

/// The adapter's runtime-writable configuration block.
#[derive(Debug)]
pub struct Tunables {
    lz4_pass: AtomicBool,
    zstd_pass: AtomicBool,
    firstpass_mode: AtomicU32,
    cutoff_level: AtomicI32,
    abort_size: AtomicUsize,
    lz4_shift_size: AtomicU32,
    ea_division_mode: AtomicU32,
    ea_divisor: AtomicU32,
    ea_level_factor: AtomicU32,
    hard_mode: AtomicU32,
}

impl Default for Tunables {
    fn default() -> Self {
        Tunables {
            lz4_pass: AtomicBool::new(DEFAULT_LZ4_PASS),
            zstd_pass: AtomicBool::new(DEFAULT_ZSTD_PASS),
            firstpass_mode: AtomicU32::new(DEFAULT_FIRSTPASS_MODE),
            cutoff_level: AtomicI32::new(DEFAULT_CUTOFF_LEVEL),
            abort_size: AtomicUsize::new(DEFAULT_ABORT_SIZE),
            lz4_shift_size: AtomicU32::new(DEFAULT_LZ4_SHIFT_SIZE),
            ea_division_mode: AtomicU32::new(DEFAULT_EA_DIVISION_MODE),
            ea_divisor: AtomicU32::new(DEFAULT_EA_DIVISOR),
            ea_level_factor: AtomicU32::new(DEFAULT_EA_LEVEL_FACTOR),
            hard_mode: AtomicU32::new(DEFAULT_HARD_MODE),
        }
    }
}

impl Tunables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether to try an LZ4 pass to decide on early abort.
    pub fn lz4_pass(&self) -> bool {
        self.lz4_pass.load(Ordering::Relaxed)
    }

    pub fn set_lz4_pass(&self, enabled: bool) {
        self.lz4_pass.store(enabled, Ordering::Relaxed);
    }

    /// Whether to try a fast-ZSTD pass after a rejecting LZ4 pass.
    pub fn zstd_pass(&self) -> bool {
        self.zstd_pass.load(Ordering::Relaxed)
    }

    pub fn set_zstd_pass(&self, enabled: bool) {
        self.zstd_pass.store(enabled, Ordering::Relaxed);
    }

    /// Which configuration the fast-ZSTD probe runs.
    pub fn firstpass_mode(&self) -> u32 {
        self.firstpass_mode.load(Ordering::Relaxed)
    }

    /// `1` probes at zstd-1, `2` at zstd-2.  `3` historically selected an
    /// experimental hand-tuned parameter set; that profile is intentionally
    /// not implemented and `3` currently probes at zstd-2.
    pub fn set_firstpass_mode(&self, mode: u32) {
        self.firstpass_mode.store(mode, Ordering::Relaxed);
    }

    /// Translated codec level at or above which the gate engages
    /// (e.g. `3` means zstd-3 and up get the probe treatment).
    pub fn cutoff_level(&self) -> i32 {
        self.cutoff_level.load(Ordering::Relaxed)
    }

    pub fn set_cutoff_level(&self, level: i32) {
        self.cutoff_level.store(level, Ordering::Relaxed);
    }

    /// Only blocks at least this large are considered for early abort.
    pub fn abort_size(&self) -> usize {
        self.abort_size.load(Ordering::Relaxed)
    }

    pub fn set_abort_size(&self, size: usize) {
        self.abort_size.store(size, Ordering::Relaxed);
    }

    /// How many bits to shift off `s_len` when tightening the LZ4 budget.
    pub fn lz4_shift_size(&self) -> u32 {
        self.lz4_shift_size.load(Ordering::Relaxed)
    }

    pub fn set_lz4_shift_size(&self, shift: u32) {
        self.lz4_shift_size.store(shift, Ordering::Relaxed);
    }

    /// Reserved: whether the abort size scales down with the level.
    /// Currently inert — the gate always uses [`Tunables::abort_size`]
    /// as-is.
    pub fn ea_division_mode(&self) -> u32 {
        self.ea_division_mode.load(Ordering::Relaxed)
    }

    pub fn set_ea_division_mode(&self, mode: u32) {
        self.ea_division_mode.store(mode, Ordering::Relaxed);
    }

    /// Reserved: how fast the scaled abort size shrinks.  Currently inert.
    pub fn ea_divisor(&self) -> u32 {
        self.ea_divisor.load(Ordering::Relaxed)
    }

    pub fn set_ea_divisor(&self, divisor: u32) {
        self.ea_divisor.store(divisor, Ordering::Relaxed);
    }

    /// Reserved: how many levels between scaling steps.  Currently inert.
    pub fn ea_level_factor(&self) -> u32 {
        self.ea_level_factor.load(Ordering::Relaxed)
    }

    pub fn set_ea_level_factor(&self, factor: u32) {
        self.ea_level_factor.store(factor, Ordering::Relaxed);
    }

    /// Test override: `> 0` forces every enabled probe to run on every
    /// block and keeps the heuristic from ever declining.
    pub fn hard_mode(&self) -> u32 {
        self.hard_mode.load(Ordering::Relaxed)
    }

    pub fn set_hard_mode(&self, mode: u32) {
        self.hard_mode.store(mode, Ordering::Relaxed);
    }
}

//! Storage-layer compression levels and their translation to ZSTD levels.
//!
//! The storage layer names its compression intent with a single byte: values
//! `1..=19` select the normal ZSTD levels directly, and a sparse band of
//! high raw values selects the negative "fast" levels (`--fast=N` in zstd
//! terms).  The raw byte is what gets persisted in the frame header, so the
//! domain is closed and must stay stable across releases.
//!
//! Covers:
//! - [`BlockLevel`] — the closed enum of recognized levels
//! - [`BlockLevel::from_raw`] / [`BlockLevel::raw`] — byte round-trip
//! - [`BlockLevel::codec_level`] — translation to the signed ZSTD level
//! - [`LevelError`] — the single failure mode (unrecognized byte)

use core::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Raw-byte domain boundaries
// ─────────────────────────────────────────────────────────────────────────────

/// Lowest raw byte of the normal-level band.
pub const RAW_LEVEL_MIN: u8 = 1;
/// Highest raw byte of the normal-level band.
pub const RAW_LEVEL_MAX: u8 = 19;
/// Lowest raw byte of the fast-level band.
pub const RAW_FAST_MIN: u8 = 201;
/// Highest raw byte of the fast-level band.
pub const RAW_FAST_MAX: u8 = 221;

/// Number of entries in the static level map.
const LEVEL_COUNT: usize = 40;

// ─────────────────────────────────────────────────────────────────────────────
// BlockLevel
// ─────────────────────────────────────────────────────────────────────────────

/// A recognized storage-layer compression level.
///
/// The discriminant is the raw byte persisted on disk.  `Level1..Level19`
/// map to the ZSTD levels of the same number; the `Fast*` tags map to the
/// negative ZSTD fast levels (`Fast20` → `-20`).  Intermediate fast values
/// (say, a hypothetical `-11`) are not part of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BlockLevel {
    Level1 = 1,
    Level2 = 2,
    Level3 = 3,
    Level4 = 4,
    Level5 = 5,
    Level6 = 6,
    Level7 = 7,
    Level8 = 8,
    Level9 = 9,
    Level10 = 10,
    Level11 = 11,
    Level12 = 12,
    Level13 = 13,
    Level14 = 14,
    Level15 = 15,
    Level16 = 16,
    Level17 = 17,
    Level18 = 18,
    Level19 = 19,
    Fast1 = 201,
    Fast2 = 202,
    Fast3 = 203,
    Fast4 = 204,
    Fast5 = 205,
    Fast6 = 206,
    Fast7 = 207,
    Fast8 = 208,
    Fast9 = 209,
    Fast10 = 210,
    Fast20 = 211,
    Fast30 = 212,
    Fast40 = 213,
    Fast50 = 214,
    Fast60 = 215,
    Fast70 = 216,
    Fast80 = 217,
    Fast90 = 218,
    Fast100 = 219,
    Fast500 = 220,
    Fast1000 = 221,
}

/// One row of the static level map: the signed ZSTD level paired with the
/// storage-layer enumerant it belongs to.
struct LevelMapEntry {
    codec: i16,
    level: BlockLevel,
}

/// Level map, indexed as `raw - 1` for the normal band and
/// `raw - RAW_FAST_MIN + 19` for the fast band.
static LEVEL_MAP: [LevelMapEntry; LEVEL_COUNT] = [
    LevelMapEntry { codec: 1, level: BlockLevel::Level1 },
    LevelMapEntry { codec: 2, level: BlockLevel::Level2 },
    LevelMapEntry { codec: 3, level: BlockLevel::Level3 },
    LevelMapEntry { codec: 4, level: BlockLevel::Level4 },
    LevelMapEntry { codec: 5, level: BlockLevel::Level5 },
    LevelMapEntry { codec: 6, level: BlockLevel::Level6 },
    LevelMapEntry { codec: 7, level: BlockLevel::Level7 },
    LevelMapEntry { codec: 8, level: BlockLevel::Level8 },
    LevelMapEntry { codec: 9, level: BlockLevel::Level9 },
    LevelMapEntry { codec: 10, level: BlockLevel::Level10 },
    LevelMapEntry { codec: 11, level: BlockLevel::Level11 },
    LevelMapEntry { codec: 12, level: BlockLevel::Level12 },
    LevelMapEntry { codec: 13, level: BlockLevel::Level13 },
    LevelMapEntry { codec: 14, level: BlockLevel::Level14 },
    LevelMapEntry { codec: 15, level: BlockLevel::Level15 },
    LevelMapEntry { codec: 16, level: BlockLevel::Level16 },
    LevelMapEntry { codec: 17, level: BlockLevel::Level17 },
    LevelMapEntry { codec: 18, level: BlockLevel::Level18 },
    LevelMapEntry { codec: 19, level: BlockLevel::Level19 },
    LevelMapEntry { codec: -1, level: BlockLevel::Fast1 },
    LevelMapEntry { codec: -2, level: BlockLevel::Fast2 },
    LevelMapEntry { codec: -3, level: BlockLevel::Fast3 },
    LevelMapEntry { codec: -4, level: BlockLevel::Fast4 },
    LevelMapEntry { codec: -5, level: BlockLevel::Fast5 },
    LevelMapEntry { codec: -6, level: BlockLevel::Fast6 },
    LevelMapEntry { codec: -7, level: BlockLevel::Fast7 },
    LevelMapEntry { codec: -8, level: BlockLevel::Fast8 },
    LevelMapEntry { codec: -9, level: BlockLevel::Fast9 },
    LevelMapEntry { codec: -10, level: BlockLevel::Fast10 },
    LevelMapEntry { codec: -20, level: BlockLevel::Fast20 },
    LevelMapEntry { codec: -30, level: BlockLevel::Fast30 },
    LevelMapEntry { codec: -40, level: BlockLevel::Fast40 },
    LevelMapEntry { codec: -50, level: BlockLevel::Fast50 },
    LevelMapEntry { codec: -60, level: BlockLevel::Fast60 },
    LevelMapEntry { codec: -70, level: BlockLevel::Fast70 },
    LevelMapEntry { codec: -80, level: BlockLevel::Fast80 },
    LevelMapEntry { codec: -90, level: BlockLevel::Fast90 },
    LevelMapEntry { codec: -100, level: BlockLevel::Fast100 },
    LevelMapEntry { codec: -500, level: BlockLevel::Fast500 },
    LevelMapEntry { codec: -1000, level: BlockLevel::Fast1000 },
];

impl BlockLevel {
    /// Default level when the host expresses no preference.
    pub const DEFAULT: BlockLevel = BlockLevel::Level3;

    /// Parses a raw on-disk level byte.
    ///
    /// Total over the recognized domain (`1..=19` and the fast band);
    /// everything else — including 0, the gap `20..=200`, and `222..=255` —
    /// is a [`LevelError`].
    pub fn from_raw(raw: u8) -> Result<BlockLevel, LevelError> {
        let idx = match raw {
            RAW_LEVEL_MIN..=RAW_LEVEL_MAX => (raw - RAW_LEVEL_MIN) as usize,
            RAW_FAST_MIN..=RAW_FAST_MAX => {
                (raw - RAW_FAST_MIN) as usize + RAW_LEVEL_MAX as usize
            }
            _ => return Err(LevelError(raw)),
        };
        Ok(LEVEL_MAP[idx].level)
    }

    /// The raw byte persisted in the frame header.
    #[inline]
    pub fn raw(self) -> u8 {
        self as u8
    }

    /// The signed level handed to the ZSTD codec.
    ///
    /// Normal levels map to themselves; fast tags map to their negative
    /// value (`Fast500` → `-500`).
    pub fn codec_level(self) -> i32 {
        let raw = self.raw();
        let idx = if raw <= RAW_LEVEL_MAX {
            (raw - RAW_LEVEL_MIN) as usize
        } else {
            (raw - RAW_FAST_MIN) as usize + RAW_LEVEL_MAX as usize
        };
        i32::from(LEVEL_MAP[idx].codec)
    }

    /// True for the fast (negative) band.
    #[inline]
    pub fn is_fast(self) -> bool {
        self.raw() >= RAW_FAST_MIN
    }

    /// Iterates every recognized level, normal band first.
    pub fn all() -> impl Iterator<Item = BlockLevel> {
        LEVEL_MAP.iter().map(|e| e.level)
    }
}

impl TryFrom<u8> for BlockLevel {
    type Error = LevelError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        BlockLevel::from_raw(raw)
    }
}

impl fmt::Display for BlockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codec = self.codec_level();
        if self.is_fast() {
            write!(f, "zstd-fast-{}", -codec)
        } else {
            write!(f, "zstd-{codec}")
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LevelError
// ─────────────────────────────────────────────────────────────────────────────

/// A level byte outside the recognized domain.  Carries the offending byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelError(pub u8);

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized compression level byte {}", self.0)
    }
}

impl std::error::Error for LevelError {}

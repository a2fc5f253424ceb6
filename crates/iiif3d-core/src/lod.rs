//! Level of Detail
//!
//! Ordered quality tiers and the pacing table used between progressive steps.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named quality tier of a 3D asset.
///
/// The derived ordering is the load order: `Low < Medium < High < Ultra < Extreme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LodLevel {
    /// Smallest asset, shown first
    Low,
    /// Second tier
    Medium,
    /// Third tier
    High,
    /// Fourth tier
    Ultra,
    /// Highest tier; also absorbs every rank past the fifth
    Extreme,
}

impl LodLevel {
    /// All levels in load order
    pub const ALL: [LodLevel; 5] = [
        LodLevel::Low,
        LodLevel::Medium,
        LodLevel::High,
        LodLevel::Ultra,
        LodLevel::Extreme,
    ];

    /// Map a size rank onto a level. Ranks past the last level collapse into `Extreme`.
    pub fn from_rank(rank: usize) -> Self {
        Self::ALL[rank.min(Self::ALL.len() - 1)]
    }

    /// Position of this level in the global order
    pub fn rank(&self) -> usize {
        *self as usize
    }

    /// Lowercase name (`low`, `medium`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
            Self::Extreme => "extreme",
        }
    }

    /// Uppercase label used by the loading panel (`LOW`, `MEDIUM`, ...)
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Ultra => "ULTRA",
            Self::Extreme => "EXTREME",
        }
    }

    /// Default pause after this level finishes during progressive loading
    pub fn default_delay(&self) -> Duration {
        let millis = match self {
            Self::Low => 100,
            Self::Medium => 500,
            Self::High => 1000,
            Self::Ultra => 1500,
            Self::Extreme => 2000,
        };
        Duration::from_millis(millis)
    }
}

impl fmt::Display for LodLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown level name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown LOD level: {0}")]
pub struct ParseLodLevelError(pub String);

impl FromStr for LodLevel {
    type Err = ParseLodLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLodLevelError(s.to_string()))
    }
}

/// Per-level pause inserted between progressive steps, in milliseconds.
///
/// The pause paces the visible quality steps; it is not a bandwidth throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodDelays {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub ultra: u64,
    pub extreme: u64,
}

impl LodDelays {
    /// A table with no pauses at all
    pub const fn none() -> Self {
        Self {
            low: 0,
            medium: 0,
            high: 0,
            ultra: 0,
            extreme: 0,
        }
    }

    /// Pause to insert after `level` has finished
    pub fn delay_after(&self, level: LodLevel) -> Duration {
        let millis = match level {
            LodLevel::Low => self.low,
            LodLevel::Medium => self.medium,
            LodLevel::High => self.high,
            LodLevel::Ultra => self.ultra,
            LodLevel::Extreme => self.extreme,
        };
        Duration::from_millis(millis)
    }

    /// Sum of the pauses a progressive run over `levels` will take
    pub fn total_for(&self, levels: &[LodLevel]) -> Duration {
        let Some((_, paced)) = levels.split_last() else {
            return Duration::ZERO;
        };
        paced.iter().map(|level| self.delay_after(*level)).sum()
    }
}

impl Default for LodDelays {
    fn default() -> Self {
        Self {
            low: LodLevel::Low.default_delay().as_millis() as u64,
            medium: LodLevel::Medium.default_delay().as_millis() as u64,
            high: LodLevel::High.default_delay().as_millis() as u64,
            ultra: LodLevel::Ultra.default_delay().as_millis() as u64,
            extreme: LodLevel::Extreme.default_delay().as_millis() as u64,
        }
    }
}

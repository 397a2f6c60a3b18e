//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Xp threshold growth per level.
///
/// After each level-up the threshold becomes
/// `floor(max_xp * (100 + growth_percent) / 100)`, and always grows by at
/// least one so the curve is strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpCurve {
    /// Threshold of a level-0 stat
    pub base_max_xp: u32,
    /// Threshold growth per level, in percent
    pub growth_percent: u32,
}

impl Default for XpCurve {
    fn default() -> Self {
        Self {
            base_max_xp: 100,
            growth_percent: 10,
        }
    }
}

impl XpCurve {
    /// Threshold that follows `max_xp`.
    #[must_use]
    pub fn next_max_xp(&self, max_xp: u32) -> u32 {
        let grown = u64::from(max_xp) * u64::from(100 + self.growth_percent) / 100;
        let grown = u32::try_from(grown).unwrap_or(u32::MAX);
        grown.max(max_xp.saturating_add(1))
    }

    /// Threshold of a stat at `level`.
    #[must_use]
    pub fn max_xp_at(&self, level: u32) -> u32 {
        (0..level).fold(self.base_max_xp.max(1), |max, _| self.next_max_xp(max))
    }
}

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Xp threshold curve
    pub xp_curve: XpCurve,
    /// Elo of every stat on a new record
    pub initial_elo: i32,
    /// Ratings never drop below this value
    pub elo_floor: i32,
    /// Outstanding pending effects a single target may hold
    pub max_pending_per_target: usize,
    /// Upper bound of the energy pool (the lower bound is 0)
    pub energy_max: u8,
    /// Master seed for reward and random-stat draws, `None` for entropy
    pub seed: Option<u64>,
    /// How often a drain re-acquires its lock set when attackers change under it
    pub lock_retry_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            xp_curve: XpCurve::default(),
            initial_elo: 1200,
            elo_floor: 0,
            max_pending_per_target: 25,
            energy_max: 100,
            seed: None,
            lock_retry_limit: 8,
        }
    }
}

impl EngineConfig {
    /// Default config with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Default config with a different queue bound.
    #[must_use]
    pub fn with_queue_bound(max_pending_per_target: usize) -> Self {
        Self {
            max_pending_per_target,
            ..Default::default()
        }
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the parser error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_curve_grows_ten_percent() {
        let curve = XpCurve::default();
        assert_eq!(curve.next_max_xp(100), 110);
        assert_eq!(curve.next_max_xp(110), 121);
        assert_eq!(curve.max_xp_at(0), 100);
        assert_eq!(curve.max_xp_at(2), 121);
    }

    #[test]
    fn flat_curve_still_increases() {
        let curve = XpCurve {
            base_max_xp: 5,
            growth_percent: 0,
        };
        assert_eq!(curve.next_max_xp(5), 6);
    }

    #[test]
    fn curve_saturates() {
        let curve = XpCurve::default();
        assert_eq!(curve.next_max_xp(u32::MAX), u32::MAX);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "seed": 7, "elo_floor": 100 }"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.elo_floor, 100);
        assert_eq!(config.initial_elo, 1200);
        assert_eq!(config.xp_curve, XpCurve::default());
    }
}

use std::{env, time::Duration};

use crate::error::{Result, RouteBuddyError};

pub const LATENCY_ENV: &str = "ROUTE_BUDDY_LATENCY_MS";
pub const SEED_ENV: &str = "ROUTE_BUDDY_SEED";
pub const ROAD_FACTOR_MIN_ENV: &str = "ROUTE_BUDDY_ROAD_FACTOR_MIN";
pub const ROAD_FACTOR_MAX_ENV: &str = "ROUTE_BUDDY_ROAD_FACTOR_MAX";

const DEFAULT_ROAD_FACTOR_MIN: f64 = 1.2;
const DEFAULT_ROAD_FACTOR_MAX: f64 = 1.4;
const DEFAULT_LATENCY: Duration = Duration::from_millis(1_500);

/// Settings for the simulated routing service.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Lower bound (inclusive) of the road factor.
    pub road_factor_min: f64,
    /// Upper bound (exclusive) of the road factor.
    pub road_factor_max: f64,
    /// Artificial delay before a computation resolves.
    pub latency: Duration,
    /// Seed for the road factor generator; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            road_factor_min: DEFAULT_ROAD_FACTOR_MIN,
            road_factor_max: DEFAULT_ROAD_FACTOR_MAX,
            latency: DEFAULT_LATENCY,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `ROUTE_BUDDY_LATENCY_MS`, `ROUTE_BUDDY_SEED`,
    /// `ROUTE_BUDDY_ROAD_FACTOR_MIN` and `ROUTE_BUDDY_ROAD_FACTOR_MAX`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(LATENCY_ENV) {
            let millis = parse_env::<u64>(LATENCY_ENV, &raw, "an unsigned integer")?;
            config.latency = Duration::from_millis(millis);
        }
        if let Some(raw) = lookup(SEED_ENV) {
            config.seed = Some(parse_env::<u64>(SEED_ENV, &raw, "an unsigned integer")?);
        }
        if let Some(raw) = lookup(ROAD_FACTOR_MIN_ENV) {
            config.road_factor_min = parse_env::<f64>(ROAD_FACTOR_MIN_ENV, &raw, "a number")?;
        }
        if let Some(raw) = lookup(ROAD_FACTOR_MAX_ENV) {
            config.road_factor_max = parse_env::<f64>(ROAD_FACTOR_MAX_ENV, &raw, "a number")?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        Self { latency, ..self }
    }

    pub fn with_road_factor(self, min: f64, max: f64) -> Self {
        Self {
            road_factor_min: min,
            road_factor_max: max,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_road_factor(self.road_factor_min, self.road_factor_max)
    }
}

/// A road factor range must be finite, positive and non-empty.
pub fn validate_road_factor(min: f64, max: f64) -> Result<()> {
    if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min >= max {
        return Err(RouteBuddyError::Config(format!(
            "road factor range [{min}, {max}) must be positive and non-empty"
        )));
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str, expected: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| RouteBuddyError::Config(format!("{key} must be {expected}, got {raw:?}")))
}

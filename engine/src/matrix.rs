use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::{validate_road_factor, EngineConfig},
    error::{Result, RouteBuddyError},
    geo::haversine_km,
    models::{DistanceMatrix, Location},
};

/// Source of the multiplier turning a great-circle distance into an
/// estimated road distance.
///
/// The engine asks for one factor per off-diagonal cell, in row-major order,
/// so `(i, j)` and `(j, i)` receive independent samples and the resulting
/// matrix is generally not symmetric.
///
/// # Implementations
/// - `UniformRoadFactor`: uniform draw from a configured range (production)
/// - `FixedRoadFactor`: constant multiplier (tests, reproducible reports)
pub trait RoadFactor: Send {
    fn sample(&mut self) -> f64;
}

/// Uniform road factor in `[min, max)` backed by a seedable generator.
pub struct UniformRoadFactor {
    rng: StdRng,
    min: f64,
    max: f64,
}

impl UniformRoadFactor {
    /// Rejects a range that is empty, inverted, non-positive or not finite.
    pub fn new(min: f64, max: f64, seed: Option<u64>) -> Result<Self> {
        validate_road_factor(min, max)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { rng, min, max })
    }
}

impl RoadFactor for UniformRoadFactor {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(self.min..self.max)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedRoadFactor(pub f64);

impl RoadFactor for FixedRoadFactor {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// Simulated routing service producing full distance matrices.
pub struct DistanceMatrixEngine<R = UniformRoadFactor> {
    road_factor: R,
    latency: Duration,
}

impl DistanceMatrixEngine<UniformRoadFactor> {
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let road_factor =
            UniformRoadFactor::new(config.road_factor_min, config.road_factor_max, config.seed)?;
        Ok(Self::new(road_factor, config.latency))
    }
}

impl<R: RoadFactor> DistanceMatrixEngine<R> {
    pub fn new(road_factor: R, latency: Duration) -> Self {
        Self {
            road_factor,
            latency,
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Build the N×N matrix for `locations` without any simulated delay.
    ///
    /// Cell `(i, j)` is `haversine_km(i, j) * factor` for `i != j` and `0`
    /// on the diagonal. Fewer than two locations is rejected.
    pub fn compute_matrix(&mut self, locations: &[Location]) -> Result<DistanceMatrix> {
        ensure_enough_locations(locations)?;

        let coords: Vec<_> = locations.iter().map(Location::coordinate).collect();
        let mut rows = Vec::with_capacity(coords.len());
        for (i, &from) in coords.iter().enumerate() {
            let mut row = Vec::with_capacity(coords.len());
            for (j, &to) in coords.iter().enumerate() {
                if i == j {
                    row.push(0.0);
                } else {
                    row.push(haversine_km(from, to) * self.road_factor.sample());
                }
            }
            rows.push(row);
        }

        tracing::debug!(locations = coords.len(), "distance matrix computed");
        Ok(DistanceMatrix::from_rows(rows))
    }

    /// Asynchronous variant emulating a remote routing call: waits for the
    /// configured latency, then resolves with the complete matrix.
    pub async fn estimate(&mut self, locations: &[Location]) -> Result<DistanceMatrix> {
        ensure_enough_locations(locations)?;
        tracing::debug!(
            locations = locations.len(),
            latency_ms = self.latency.as_millis() as u64,
            "requesting distance matrix"
        );
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.compute_matrix(locations)
    }
}

fn ensure_enough_locations(locations: &[Location]) -> Result<()> {
    if locations.len() < 2 {
        return Err(RouteBuddyError::InsufficientInput(locations.len()));
    }
    Ok(())
}

use serde::Serialize;

use crate::{
    error::{Result, RouteBuddyError},
    models::{DistanceMatrix, Location},
};

/// Upper bounds (inclusive) of the histogram buckets, in km. Anything above
/// the last bound falls into the open-ended bucket.
pub const BUCKET_BOUNDS_KM: [f64; 3] = [10.0, 50.0, 100.0];
pub const BUCKET_LABELS: [&str; 4] = ["0-10 km", "10-50 km", "50-100 km", "100+ km"];

/// A single route and its distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteExtremum {
    pub from: usize,
    pub to: usize,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Histogram {
    counts: [usize; 4],
}

impl Histogram {
    fn record(&mut self, distance_km: f64) {
        let bucket = BUCKET_BOUNDS_KM
            .iter()
            .position(|&bound| distance_km <= bound)
            .unwrap_or(BUCKET_BOUNDS_KM.len());
        self.counts[bucket] += 1;
    }

    pub fn counts(&self) -> [usize; 4] {
        self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(label, count)` pairs in bucket order.
    pub fn buckets(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        BUCKET_LABELS.iter().copied().zip(self.counts.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub min: RouteExtremum,
    pub max: RouteExtremum,
    pub mean_km: f64,
    pub total_km: f64,
    /// Number of routes considered, i.e. off-diagonal cells.
    pub count: usize,
    pub histogram: Histogram,
}

/// Summarise every off-diagonal cell of `matrix`.
///
/// Returns `Ok(None)` when there is no route to summarise. When several
/// routes share the minimum (or maximum) distance, the last one in row-major
/// order is reported.
pub fn compute_statistics(
    locations: &[Location],
    matrix: &DistanceMatrix,
) -> Result<Option<Statistics>> {
    ensure_shape(locations, matrix)?;

    let mut cells = matrix.off_diagonal();
    let Some((from, to, first)) = cells.next() else {
        return Ok(None);
    };

    let seed = RouteExtremum {
        from,
        to,
        distance_km: first,
    };
    let mut stats = Statistics {
        min: seed,
        max: seed,
        mean_km: 0.0,
        total_km: first,
        count: 1,
        histogram: Histogram::default(),
    };
    stats.histogram.record(first);

    for (from, to, distance_km) in cells {
        let route = RouteExtremum {
            from,
            to,
            distance_km,
        };
        if distance_km <= stats.min.distance_km {
            stats.min = route;
        }
        if distance_km >= stats.max.distance_km {
            stats.max = route;
        }
        stats.total_km += distance_km;
        stats.count += 1;
        stats.histogram.record(distance_km);
    }
    stats.mean_km = stats.total_km / stats.count as f64;

    Ok(Some(stats))
}

/// Mean of the off-diagonal cells, `None` for matrices without routes.
pub fn average_distance_km(matrix: &DistanceMatrix) -> Option<f64> {
    let (sum, count) = matrix
        .off_diagonal()
        .fold((0.0, 0usize), |(sum, count), (_, _, d)| (sum + d, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub(crate) fn ensure_shape(locations: &[Location], matrix: &DistanceMatrix) -> Result<()> {
    if matrix.size() != locations.len() || !matrix.is_square() {
        return Err(RouteBuddyError::MatrixShape {
            rows: matrix.size(),
            locations: locations.len(),
        });
    }
    Ok(())
}

use chrono::{DateTime, Utc};

use crate::{
    error::{Result, RouteBuddyError},
    export::{saved_project, Exporter},
    import::validate,
    matrix::{DistanceMatrixEngine, RoadFactor},
    models::{DistanceMatrix, Location, SavedProject},
    stats::{compute_statistics, Statistics},
};

/// Owns the session's ordered locations and the matrix derived from them.
///
/// Any mutation of the list drops the matrix and bumps a generation counter.
/// A computation started against an older generation is discarded when it
/// completes, so a stored matrix always matches the current list.
#[derive(Debug, Default)]
pub struct LocationStore {
    locations: Vec<Location>,
    matrix: Option<DistanceMatrix>,
    generation: u64,
    in_flight: Option<u64>,
}

/// Snapshot taken by [`LocationStore::begin_computation`].
#[derive(Debug, Clone)]
pub struct PendingComputation {
    generation: u64,
    locations: Vec<Location>,
}

/// Outcome of a [`PendingComputation`], to be handed back to the store.
#[derive(Debug)]
pub struct ComputedMatrix {
    generation: u64,
    result: Result<DistanceMatrix>,
}

impl PendingComputation {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub async fn run<R: RoadFactor>(self, engine: &mut DistanceMatrixEngine<R>) -> ComputedMatrix {
        let result = engine.estimate(&self.locations).await;
        ComputedMatrix {
            generation: self.generation,
            result,
        }
    }
}

impl LocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn matrix(&self) -> Option<&DistanceMatrix> {
        self.matrix.as_ref()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// True while a computation for the current list has not completed.
    pub fn is_calculating(&self) -> bool {
        self.in_flight == Some(self.generation)
    }

    pub fn add_location(&mut self, location: Location) -> Result<()> {
        validate(&location)?;
        self.locations.push(location);
        self.invalidate();
        Ok(())
    }

    /// Append several locations at once. Nothing is added if any is invalid.
    pub fn extend(&mut self, locations: impl IntoIterator<Item = Location>) -> Result<usize> {
        let locations: Vec<_> = locations.into_iter().collect();
        for location in &locations {
            validate(location)?;
        }
        let added = locations.len();
        self.locations.extend(locations);
        self.invalidate();
        Ok(added)
    }

    /// Remove by position. An out-of-bounds index is an error and leaves the
    /// store untouched.
    pub fn remove_location(&mut self, index: usize) -> Result<Location> {
        if index >= self.locations.len() {
            return Err(RouteBuddyError::IndexOutOfBounds {
                index,
                len: self.locations.len(),
            });
        }
        let removed = self.locations.remove(index);
        self.invalidate();
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.locations.clear();
        self.invalidate();
    }

    pub fn begin_computation(&mut self) -> Result<PendingComputation> {
        if self.locations.len() < 2 {
            return Err(RouteBuddyError::InsufficientInput(self.locations.len()));
        }
        self.in_flight = Some(self.generation);
        tracing::debug!(
            generation = self.generation,
            locations = self.locations.len(),
            "distance computation started"
        );
        Ok(PendingComputation {
            generation: self.generation,
            locations: self.locations.clone(),
        })
    }

    /// Store the result of a computation.
    ///
    /// Returns `Ok(None)` when the list changed since the computation began;
    /// the stale result is dropped and the store keeps its absent matrix.
    pub fn complete(&mut self, computed: ComputedMatrix) -> Result<Option<&DistanceMatrix>> {
        if computed.generation != self.generation {
            tracing::warn!(
                started = computed.generation,
                current = self.generation,
                "discarding stale distance matrix"
            );
            return Ok(None);
        }
        self.in_flight = None;
        match computed.result {
            Ok(matrix) => {
                tracing::info!(locations = matrix.size(), "distance matrix stored");
                self.matrix = Some(matrix);
                Ok(self.matrix.as_ref())
            }
            Err(err) => {
                self.matrix = None;
                Err(err)
            }
        }
    }

    /// Compute and store the matrix for the current list.
    pub async fn compute_distances<R: RoadFactor>(
        &mut self,
        engine: &mut DistanceMatrixEngine<R>,
    ) -> Result<&DistanceMatrix> {
        let computed = self.begin_computation()?.run(engine).await;
        self.complete(computed)?.ok_or(RouteBuddyError::NoData)
    }

    pub fn statistics(&self) -> Result<Option<Statistics>> {
        let matrix = self.matrix.as_ref().ok_or(RouteBuddyError::NoData)?;
        compute_statistics(&self.locations, matrix)
    }

    pub fn exporter(&self) -> Result<Exporter<'_>> {
        Exporter::new(&self.locations, self.matrix.as_ref())
    }

    pub fn saved_project(&self, now: DateTime<Utc>) -> Result<SavedProject> {
        saved_project(&self.locations, self.matrix.as_ref(), now)
    }

    fn invalidate(&mut self) {
        if self.matrix.take().is_some() {
            tracing::debug!("distance matrix invalidated");
        }
        self.generation += 1;
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{error::ValidationError, matrix::FixedRoadFactor};

    fn engine() -> DistanceMatrixEngine<FixedRoadFactor> {
        DistanceMatrixEngine::new(FixedRoadFactor(1.3), Duration::from_millis(1_500))
    }

    fn store_with(n: usize) -> LocationStore {
        let mut store = LocationStore::new();
        for i in 0..n {
            store
                .add_location(Location::new(format!("P{i}"), 45.0, i as f64))
                .unwrap();
        }
        store
    }

    #[test]
    fn starts_empty() {
        let store = LocationStore::new();
        assert!(store.is_empty());
        assert!(store.matrix().is_none());
        assert!(!store.is_calculating());
    }

    #[test]
    fn add_keeps_order_and_duplicates() {
        let mut store = LocationStore::new();
        let a = Location::new("A", 1.0, 1.0);
        store.add_location(a.clone()).unwrap();
        store.add_location(a.clone()).unwrap();
        assert_eq!(store.locations(), &[a.clone(), a]);
    }

    #[test]
    fn add_rejects_invalid_location() {
        let mut store = LocationStore::new();
        let err = store.add_location(Location::new("", 1.0, 1.0)).unwrap_err();
        assert!(matches!(
            err,
            RouteBuddyError::Validation(ValidationError::EmptyName)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn extend_is_all_or_nothing() {
        let mut store = store_with(1);
        let err = store
            .extend(vec![Location::new("B", 0.0, 0.0), Location::new("C", 91.0, 0.0)])
            .unwrap_err();
        assert!(matches!(err, RouteBuddyError::Validation(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_out_of_bounds_is_an_error() {
        let mut store = store_with(2);
        let err = store.remove_location(2).unwrap_err();
        assert!(matches!(
            err,
            RouteBuddyError::IndexOutOfBounds { index: 2, len: 2 }
        ));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn begin_requires_two_locations() {
        let mut store = store_with(1);
        assert!(matches!(
            store.begin_computation(),
            Err(RouteBuddyError::InsufficientInput(1))
        ));
        assert!(!store.is_calculating());
    }

    #[test]
    fn statistics_without_matrix_is_no_data() {
        let store = store_with(3);
        assert!(matches!(store.statistics(), Err(RouteBuddyError::NoData)));
        assert!(matches!(store.exporter(), Err(RouteBuddyError::NoData)));
    }

    #[tokio::test(start_paused = true)]
    async fn compute_stores_matrix() {
        let mut store = store_with(3);
        let matrix = store.compute_distances(&mut engine()).await.unwrap().clone();
        assert_eq!(matrix.size(), 3);
        assert_eq!(store.matrix(), Some(&matrix));
        assert!(!store.is_calculating());
        assert!(store.statistics().unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn removing_a_location_invalidates_matrix() {
        let mut store = store_with(3);
        store.compute_distances(&mut engine()).await.unwrap();

        let removed = store.remove_location(0).unwrap();
        assert_eq!(removed.name, "P0");
        assert!(store.matrix().is_none());
        assert!(matches!(store.statistics(), Err(RouteBuddyError::NoData)));
    }

    #[tokio::test(start_paused = true)]
    async fn add_and_clear_invalidate_matrix() {
        let mut store = store_with(2);
        store.compute_distances(&mut engine()).await.unwrap();
        store.add_location(Location::new("Q", 0.0, 0.0)).unwrap();
        assert!(store.matrix().is_none());

        store.compute_distances(&mut engine()).await.unwrap();
        store.clear();
        assert!(store.matrix().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_during_computation_discards_result() {
        let mut store = store_with(3);
        let mut engine = engine();
        let pending = store.begin_computation().unwrap();
        assert!(store.is_calculating());

        let (computed, ()) = tokio::join!(pending.run(&mut engine), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            store.add_location(Location::new("Late", 10.0, 10.0)).unwrap();
        });

        assert!(store.complete(computed).unwrap().is_none());
        assert!(store.matrix().is_none());
        assert_eq!(store.len(), 4);
        assert!(!store.is_calculating());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_result_does_not_overwrite_newer_one() {
        let mut store = store_with(2);
        let mut engine = engine();
        let stale = store.begin_computation().unwrap().run(&mut engine).await;

        store.add_location(Location::new("C", 46.0, 2.0)).unwrap();
        store.compute_distances(&mut engine).await.unwrap();

        assert!(store.complete(stale).unwrap().is_none());
        assert_eq!(store.matrix().map(DistanceMatrix::size), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn saved_project_includes_matrix_once_computed() {
        let now = Utc::now();
        let mut store = store_with(2);
        assert!(store.saved_project(now).unwrap().distance_matrix.is_none());
        store.compute_distances(&mut engine()).await.unwrap();
        assert!(store.saved_project(now).unwrap().distance_matrix.is_some());
    }
}

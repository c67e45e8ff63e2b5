pub mod config;
pub mod error;
pub mod export;
pub mod geo;
pub mod import;
pub mod matrix;
pub mod models;
pub mod stats;
pub mod store;
pub mod view;

pub use config::EngineConfig;
pub use error::{Result, RouteBuddyError, ValidationError};
pub use export::{ExportFormat, ExportPayload, Exporter};
pub use import::ImportReport;
pub use matrix::{DistanceMatrixEngine, FixedRoadFactor, RoadFactor, UniformRoadFactor};
pub use models::{DistanceMatrix, Location};
pub use stats::{compute_statistics, Statistics};
pub use store::LocationStore;

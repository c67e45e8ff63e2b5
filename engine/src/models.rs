//! Wire types shared with other consumers of the matrix data.

pub use shared::{
    Coordinate, DistanceMatrix, ExportStatistics, Location, LocationsFile, ProjectEnvelope,
    ProjectExport, SavedProject,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// A named point as entered by the user or read from an import file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lng,
            address: None,
        }
    }

    pub fn with_address(self, address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..self
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lon: self.lng,
        }
    }
}

/// Row-major table of estimated travel distances in kilometres.
///
/// `rows()[i][j]` is the distance from location `i` to location `j`. The
/// matrix is not required to be symmetric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceMatrix(Vec<Vec<f64>>);

impl DistanceMatrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        Self(rows)
    }

    /// Number of rows.
    pub fn size(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_square(&self) -> bool {
        let n = self.0.len();
        self.0.iter().all(|row| row.len() == n)
    }

    pub fn get(&self, from: usize, to: usize) -> Option<f64> {
        self.0.get(from).and_then(|row| row.get(to)).copied()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.0
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.0
    }

    /// Every `(from, to, distance)` cell with `from != to`, in row-major order.
    pub fn off_diagonal(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.0.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(move |(j, _)| *j != i)
                .map(move |(j, &d)| (i, j, d))
        })
    }
}

/// Import document: `{ "locations": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationsFile {
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEnvelope {
    pub name: String,
    pub created: String,
    pub locations: Vec<Location>,
    pub distance_matrix: DistanceMatrix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatistics {
    pub total_locations: usize,
    pub total_routes: usize,
    pub average_distance: Option<f64>,
}

/// Full JSON export written as `route_buddy_project_<date>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectExport {
    pub project: ProjectEnvelope,
    pub statistics: Option<ExportStatistics>,
}

/// Saved project file. Written for later reuse, never read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedProject {
    pub name: String,
    pub locations: Vec<Location>,
    pub distance_matrix: Option<DistanceMatrix>,
    pub saved: String,
}

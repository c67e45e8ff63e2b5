use std::{
    fmt, fs,
    io,
    path::{Path, PathBuf},
};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_xlsxwriter::{ColNum, RowNum, Workbook, XlsxError};

use crate::{
    error::{Result, RouteBuddyError},
    models::{
        DistanceMatrix, ExportStatistics, Location, ProjectEnvelope, ProjectExport, SavedProject,
    },
    stats::{average_distance_km, ensure_shape},
    view::format_km,
};

const PROJECT_NAME: &str = "Route Buddy Project";
const MATRIX_SHEET: &str = "Distance matrix";
const LOCATIONS_SHEET: &str = "Locations";
const LOCATION_HEADERS: [&str; 4] = ["Name", "Latitude", "Longitude", "Address"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Workbook,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [Self::Csv, Self::Json, Self::Workbook];

    pub fn file_name(self, now: DateTime<Utc>) -> String {
        let date = iso_date(now);
        match self {
            Self::Csv => format!("distance_matrix_{date}.csv"),
            Self::Json => format!("route_buddy_project_{date}.json"),
            Self::Workbook => format!("route_buddy_{date}.xlsx"),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv;charset=utf-8",
            Self::Json => "application/json;charset=utf-8",
            Self::Workbook => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Workbook => "xlsx",
        })
    }
}

/// A finished export, ready to be downloaded or written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPayload {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportPayload {
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "export written");
        Ok(path)
    }
}

/// Serializes a computed (locations, matrix) pair.
#[derive(Debug, Clone, Copy)]
pub struct Exporter<'a> {
    locations: &'a [Location],
    matrix: &'a DistanceMatrix,
}

impl<'a> Exporter<'a> {
    /// Fails with `NoData` when no matrix has been computed.
    pub fn new(locations: &'a [Location], matrix: Option<&'a DistanceMatrix>) -> Result<Self> {
        let matrix = matrix.ok_or(RouteBuddyError::NoData)?;
        ensure_shape(locations, matrix)?;
        Ok(Self { locations, matrix })
    }

    /// Header row followed by one row per origin, values with 2 decimals
    /// (see [`format_km`]).
    pub fn grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.locations.len() + 1);
        grid.push(
            std::iter::once(String::new())
                .chain(self.locations.iter().map(|loc| loc.name.clone()))
                .collect(),
        );
        for (loc, row) in self.locations.iter().zip(self.matrix.rows()) {
            grid.push(
                std::iter::once(loc.name.clone())
                    .chain(row.iter().copied().map(format_km))
                    .collect(),
            );
        }
        grid
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        for record in self.grid() {
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| RouteBuddyError::Io(err.into_error()))?;
        let mut csv = String::from_utf8(bytes)
            .map_err(|err| RouteBuddyError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))?;
        if csv.ends_with('\n') {
            csv.pop();
        }
        Ok(csv)
    }

    pub fn project_export(&self, created: DateTime<Utc>) -> ProjectExport {
        let n = self.locations.len();
        ProjectExport {
            project: ProjectEnvelope {
                name: PROJECT_NAME.to_string(),
                created: iso_timestamp(created),
                locations: self.locations.to_vec(),
                distance_matrix: self.matrix.clone(),
            },
            statistics: Some(ExportStatistics {
                total_locations: n,
                total_routes: n * n.saturating_sub(1),
                average_distance: average_distance_km(self.matrix),
            }),
        }
    }

    pub fn to_json(&self, created: DateTime<Utc>) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.project_export(created))?)
    }

    /// Two sheets: the matrix grid, then the location listing.
    pub fn to_workbook(&self) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();

        let matrix_sheet = workbook.add_worksheet();
        matrix_sheet.set_name(MATRIX_SHEET)?;
        for (r, row) in self.grid().iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                matrix_sheet.write_string(row_num(r)?, col_num(c)?, cell)?;
            }
        }

        let locations_sheet = workbook.add_worksheet();
        locations_sheet.set_name(LOCATIONS_SHEET)?;
        for (c, header) in LOCATION_HEADERS.iter().enumerate() {
            locations_sheet.write_string(0, col_num(c)?, *header)?;
        }
        for (i, loc) in self.locations.iter().enumerate() {
            let r = row_num(i + 1)?;
            locations_sheet.write_string(r, 0, &loc.name)?;
            locations_sheet.write_number(r, 1, loc.lat)?;
            locations_sheet.write_number(r, 2, loc.lng)?;
            locations_sheet.write_string(r, 3, loc.address.as_deref().unwrap_or_default())?;
        }

        Ok(workbook.save_to_buffer()?)
    }

    pub fn export(&self, format: ExportFormat, now: DateTime<Utc>) -> Result<ExportPayload> {
        let bytes = match format {
            ExportFormat::Csv => self.to_csv()?.into_bytes(),
            ExportFormat::Json => self.to_json(now)?.into_bytes(),
            ExportFormat::Workbook => self.to_workbook()?,
        };
        tracing::info!(%format, locations = self.locations.len(), "export generated");
        Ok(ExportPayload {
            file_name: format.file_name(now),
            mime_type: format.mime_type(),
            bytes,
        })
    }
}

/// Snapshot of the session for later reuse. The matrix may still be absent.
pub fn saved_project(
    locations: &[Location],
    matrix: Option<&DistanceMatrix>,
    now: DateTime<Utc>,
) -> Result<SavedProject> {
    if locations.is_empty() {
        return Err(RouteBuddyError::NoData);
    }
    if let Some(matrix) = matrix {
        ensure_shape(locations, matrix)?;
    }
    Ok(SavedProject {
        name: format!("{PROJECT_NAME} {}", iso_date(now)),
        locations: locations.to_vec(),
        distance_matrix: matrix.cloned(),
        saved: iso_timestamp(now),
    })
}

pub fn saved_project_payload(
    locations: &[Location],
    matrix: Option<&DistanceMatrix>,
    now: DateTime<Utc>,
) -> Result<ExportPayload> {
    let project = saved_project(locations, matrix, now)?;
    Ok(ExportPayload {
        file_name: format!("route_buddy_saved_{}.json", iso_date(now)),
        mime_type: ExportFormat::Json.mime_type(),
        bytes: serde_json::to_vec_pretty(&project)?,
    })
}

fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn iso_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn row_num(index: usize) -> Result<RowNum> {
    RowNum::try_from(index).map_err(|_| XlsxError::RowColumnLimitError.into())
}

fn col_num(index: usize) -> Result<ColNum> {
    ColNum::try_from(index).map_err(|_| XlsxError::RowColumnLimitError.into())
}

//! Location import from CSV, JSON and spreadsheets.
//!
//! Every path funnels through [`location_from_fields`], so the same
//! validation applies regardless of the source. Invalid rows are skipped and
//! recorded; an import only fails when nothing valid remains.

use std::{
    fs::{self, File},
    io::{BufReader, Cursor, Read},
    path::Path,
};

use calamine::{open_workbook_auto_from_rs, Reader};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{Result, RouteBuddyError, ValidationError},
    models::Location,
};

/// A row that did not make it into the import, with its 1-based position in
/// the source (header rows included). For CSV this is the line the record
/// starts on; for JSON it is the entry's position in the `locations` array.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: ValidationError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub locations: Vec<Location>,
    pub skipped: Vec<SkippedRow>,
}

impl ImportReport {
    pub fn failure_count(&self) -> usize {
        self.skipped.len()
    }

    fn push(&mut self, row: usize, parsed: std::result::Result<Location, ValidationError>) {
        match parsed {
            Ok(location) => self.locations.push(location),
            Err(reason) => {
                tracing::warn!(row, %reason, "skipping import row");
                self.skipped.push(SkippedRow { row, reason });
            }
        }
    }

    fn finish(self, source: &str) -> Result<Self> {
        if self.locations.is_empty() {
            return Err(RouteBuddyError::Parse(format!(
                "no valid location found in {source} ({} rows skipped)",
                self.skipped.len()
            )));
        }
        tracing::info!(
            source,
            imported = self.locations.len(),
            skipped = self.skipped.len(),
            "locations imported"
        );
        Ok(self)
    }
}

/// Check an already-built location against the coordinate contract.
pub fn validate(location: &Location) -> std::result::Result<(), ValidationError> {
    if location.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if !(-90.0..=90.0).contains(&location.lat) {
        return Err(ValidationError::LatitudeOutOfRange(location.lat));
    }
    if !(-180.0..=180.0).contains(&location.lng) {
        return Err(ValidationError::LongitudeOutOfRange(location.lng));
    }
    Ok(())
}

/// Parse a number, accepting a decimal comma in place of the decimal point.
pub fn parse_decimal(field: &'static str, raw: &str) -> std::result::Result<f64, ValidationError> {
    let trimmed = raw.trim();
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ValidationError::NotANumber {
            field,
            value: trimmed.to_string(),
        })
}

/// Split a combined `"lat, lng"` cell.
///
/// Separators are tried in order: `;`, then comma followed by whitespace
/// (so `"48,85, 2,35"` keeps its decimal commas), then a single bare comma.
pub fn split_combined(raw: &str) -> Option<(&str, &str)> {
    let raw = raw.trim();
    if let Some(parts) = raw.split_once(';') {
        return Some(parts);
    }
    let spaced = raw
        .match_indices(',')
        .map(|(idx, _)| idx)
        .find(|&idx| raw[idx + 1..].starts_with(char::is_whitespace));
    if let Some(idx) = spaced {
        return Some((&raw[..idx], &raw[idx + 1..]));
    }
    match raw.matches(',').count() {
        1 => raw.split_once(','),
        _ => None,
    }
}

pub fn location_from_fields(
    name: &str,
    lat: &str,
    lng: &str,
    address: Option<&str>,
) -> std::result::Result<Location, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let location = Location {
        name: name.to_string(),
        lat: parse_decimal("latitude", lat)?,
        lng: parse_decimal("longitude", lng)?,
        address: address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string),
    };
    validate(&location)?;
    Ok(location)
}

/// CSV with a header row, then `name, lat, lng[, address]`.
pub fn import_csv(reader: impl Read) -> Result<ImportReport> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut report = ImportReport::default();
    for (index, record) in reader.records().enumerate() {
        // Quoted fields may span lines, so the record index is not the line.
        let (row, parsed) = match record {
            Ok(record) => {
                let line = record.position().map(|pos| pos.line() as usize);
                let cells: Vec<&str> = record.iter().collect();
                (line, separate_columns(&cells))
            }
            Err(err) => {
                let line = err.position().map(|pos| pos.line() as usize);
                (line, Err(ValidationError::Malformed(err.to_string())))
            }
        };
        report.push(row.unwrap_or(index + 2), parsed);
    }
    report.finish("csv")
}

/// Entries stay untyped so one badly typed entry only skips that entry.
#[derive(Debug, Deserialize)]
struct RawLocationsFile {
    locations: Vec<Value>,
}

/// `{ "locations": [{ "name", "lat", "lng", "address"? }] }`. Coordinates may
/// be numbers or numeric strings.
pub fn import_json(reader: impl Read) -> Result<ImportReport> {
    let file: RawLocationsFile = serde_json::from_reader(reader)
        .map_err(|err| RouteBuddyError::Parse(err.to_string()))?;

    let mut report = ImportReport::default();
    for (index, entry) in file.locations.iter().enumerate() {
        report.push(index + 1, json_location(entry));
    }
    report.finish("json")
}

fn json_location(entry: &Value) -> std::result::Result<Location, ValidationError> {
    let Value::Object(fields) = entry else {
        return Err(ValidationError::Malformed(format!(
            "expected an object, got {entry}"
        )));
    };
    let name = match fields.get("name") {
        Some(Value::String(name)) => name.as_str(),
        None | Some(Value::Null) => return Err(ValidationError::EmptyName),
        Some(other) => {
            return Err(ValidationError::Malformed(format!(
                "name must be a string, got {other}"
            )))
        }
    };
    let address = match fields.get("address") {
        Some(Value::String(address)) => Some(address.as_str()),
        None | Some(Value::Null) => None,
        Some(other) => {
            return Err(ValidationError::Malformed(format!(
                "address must be a string, got {other}"
            )))
        }
    };
    let lat = json_number("latitude", fields.get("lat").unwrap_or(&Value::Null))?;
    let lng = json_number("longitude", fields.get("lng").unwrap_or(&Value::Null))?;
    location_from_fields(name, &lat, &lng, address)
}

fn json_number(field: &'static str, value: &Value) -> std::result::Result<String, ValidationError> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Null => Err(ValidationError::MissingColumn(field)),
        other => Err(ValidationError::NotANumber {
            field,
            value: other.to_string(),
        }),
    }
}

/// Spreadsheet rows as text cells, first row being the header.
///
/// Each data row is either `name, lat, lng[, address]` or
/// `name, "lat, lng"`; the layout is detected per row.
pub fn import_sheet_rows<R, S>(rows: &[R]) -> Result<ImportReport>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut report = ImportReport::default();
    for (index, row) in rows.iter().enumerate().skip(1) {
        let cells: Vec<&str> = row
            .as_ref()
            .iter()
            .map(|cell| AsRef::<str>::as_ref(cell))
            .collect();
        let has_separate_lng = cells.get(2).is_some_and(|cell| !cell.trim().is_empty());
        let parsed = if has_separate_lng {
            separate_columns(&cells)
        } else {
            combined_column(&cells)
        };
        report.push(index + 1, parsed);
    }
    report.finish("spreadsheet")
}

/// First worksheet of an `.xlsx`, `.xlsm`, `.xls` or `.ods` workbook, read
/// through [`import_sheet_rows`].
pub fn import_workbook(bytes: Vec<u8>) -> Result<ImportReport> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| RouteBuddyError::Parse("workbook has no worksheet".to_string()))??;
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    import_sheet_rows(&rows)
}

/// Import by file extension (`.csv`, `.json`, or a spreadsheet).
pub fn import_file(path: impl AsRef<Path>) -> Result<ImportReport> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => import_csv(BufReader::new(File::open(path)?)),
        Some("json") => import_json(BufReader::new(File::open(path)?)),
        Some("xlsx" | "xlsm" | "xls" | "ods") => import_workbook(fs::read(path)?),
        _ => Err(RouteBuddyError::Parse(format!(
            "unsupported import file {}",
            path.display()
        ))),
    }
}

fn separate_columns(cells: &[&str]) -> std::result::Result<Location, ValidationError> {
    let name = cells.first().copied().unwrap_or_default();
    let lat = cells.get(1).ok_or(ValidationError::MissingColumn("latitude"))?;
    let lng = cells.get(2).ok_or(ValidationError::MissingColumn("longitude"))?;
    location_from_fields(name, lat, lng, cells.get(3).copied())
}

fn combined_column(cells: &[&str]) -> std::result::Result<Location, ValidationError> {
    let name = cells.first().copied().unwrap_or_default();
    let raw = cells
        .get(1)
        .filter(|cell| !cell.trim().is_empty())
        .ok_or(ValidationError::MissingColumn("coordinates"))?;
    let (lat, lng) = split_combined(raw).ok_or_else(|| ValidationError::NotANumber {
        field: "coordinates",
        value: raw.trim().to_string(),
    })?;
    location_from_fields(name, lat, lng, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_comma_is_accepted() {
        assert_eq!(parse_decimal("latitude", " 48,8566 "), Ok(48.8566));
        assert_eq!(parse_decimal("latitude", "-2.5"), Ok(-2.5));
    }

    #[test]
    fn non_numbers_are_rejected() {
        for raw in ["", "north", "NaN", "inf", "1.2.3"] {
            assert!(
                matches!(parse_decimal("latitude", raw), Err(ValidationError::NotANumber { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert_eq!(
            location_from_fields("A", "200", "0", None),
            Err(ValidationError::LatitudeOutOfRange(200.0))
        );
        assert_eq!(
            location_from_fields("A", "0", "-180.5", None),
            Err(ValidationError::LongitudeOutOfRange(-180.5))
        );
        assert!(location_from_fields("Pole", "90", "-180", None).is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(
            location_from_fields("   ", "1", "2", None),
            Err(ValidationError::EmptyName)
        );
    }

    #[test]
    fn combined_cell_variants() {
        assert_eq!(split_combined("48.85, 2.35"), Some(("48.85", " 2.35")));
        assert_eq!(split_combined("48.85,2.35"), Some(("48.85", "2.35")));
        assert_eq!(split_combined("48,85, 2,35"), Some(("48,85", " 2,35")));
        assert_eq!(split_combined("48,85;2,35"), Some(("48,85", "2,35")));
        assert_eq!(split_combined("48,85,2,35"), None);
        assert_eq!(split_combined("48.85"), None);
    }

    #[test]
    fn csv_skips_invalid_rows() {
        let input = "name,lat,lng,address\nParis,48.8566,2.3522,Hotel de Ville\nNowhere,200,0\nLyon,45.764,4.8357\n";
        let report = import_csv(input.as_bytes()).unwrap();
        assert_eq!(report.locations.len(), 2);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.skipped[0].row, 3);
        assert_eq!(
            report.skipped[0].reason,
            ValidationError::LatitudeOutOfRange(200.0)
        );
        assert_eq!(
            report.locations[0].address.as_deref(),
            Some("Hotel de Ville")
        );
        assert_eq!(report.locations[1].address, None);
    }

    #[test]
    fn csv_rows_report_their_source_line() {
        let input = "name,lat,lng,address\n\
                     Paris,48.8566,2.3522,\"Place de l'Hotel de Ville\n75004 Paris\"\n\
                     Nowhere,200,0\n\
                     Lyon,45.764,4.8357\n";
        let report = import_csv(input.as_bytes()).unwrap();
        assert_eq!(report.locations.len(), 2);
        assert_eq!(
            report.locations[0].address.as_deref(),
            Some("Place de l'Hotel de Ville\n75004 Paris")
        );
        assert_eq!(
            report.skipped,
            vec![SkippedRow {
                row: 4,
                reason: ValidationError::LatitudeOutOfRange(200.0),
            }]
        );
    }

    #[test]
    fn csv_accepts_quoted_decimal_commas() {
        let input = "name,lat,lng\n\"Marseille\",\"43,2965\",\"5,3698\"\n";
        let report = import_csv(input.as_bytes()).unwrap();
        assert_eq!(report.locations, vec![Location::new("Marseille", 43.2965, 5.3698)]);
    }

    #[test]
    fn csv_without_valid_rows_fails() {
        let input = "name,lat,lng\n,1,2\nA,x,y\n";
        let err = import_csv(input.as_bytes()).unwrap_err();
        assert!(matches!(err, RouteBuddyError::Parse(msg) if msg.contains("2 rows skipped")));
    }

    #[test]
    fn json_reads_numbers_and_strings() {
        let input = r#"{"locations": [
            {"name": "A", "lat": 1.5, "lng": 2.5},
            {"name": "B", "lat": "3,5", "lng": "-4", "address": "Somewhere"},
            {"name": "C", "lat": true, "lng": 0},
            {"name": "D", "lng": 0}
        ]}"#;
        let report = import_json(input.as_bytes()).unwrap();
        assert_eq!(
            report.locations,
            vec![
                Location::new("A", 1.5, 2.5),
                Location::new("B", 3.5, -4.0).with_address("Somewhere"),
            ]
        );
        assert_eq!(report.failure_count(), 2);
        assert_eq!(
            report.skipped[1].reason,
            ValidationError::MissingColumn("latitude")
        );
    }

    #[test]
    fn json_skips_badly_typed_entries() {
        let input = r#"{"locations": [
            {"name": "A", "lat": 1.5, "lng": 2.5},
            {"name": 5, "lat": 1, "lng": 2},
            {"name": "B", "lat": 1, "lng": 2, "address": 12},
            null,
            {"name": "C", "lat": 3.5, "lng": 4.5}
        ]}"#;
        let report = import_json(input.as_bytes()).unwrap();
        assert_eq!(
            report.locations,
            vec![Location::new("A", 1.5, 2.5), Location::new("C", 3.5, 4.5)]
        );
        let rows: Vec<usize> = report.skipped.iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
        assert!(report
            .skipped
            .iter()
            .all(|s| matches!(s.reason, ValidationError::Malformed(_))));
    }

    #[test]
    fn json_accepts_serialized_locations_file() {
        let file = crate::models::LocationsFile {
            locations: vec![
                Location::new("Nice", 43.7102, 7.262).with_address("Promenade"),
                Location::new("Brest", 48.3904, -4.4861),
            ],
        };
        let json = serde_json::to_vec(&file).unwrap();
        let report = import_json(json.as_slice()).unwrap();
        assert_eq!(report.locations, file.locations);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = import_json("{ not json".as_bytes()).unwrap_err();
        assert!(matches!(err, RouteBuddyError::Parse(_)));
    }

    #[test]
    fn sheet_rows_support_both_layouts() {
        let rows = vec![
            vec!["Location Name", "Coordinates", ""],
            vec!["Paris", "48,8566, 2,3522", ""],
            vec!["Lyon", "45.764", "4.8357"],
            vec!["Broken", "", ""],
        ];
        let report = import_sheet_rows(&rows).unwrap();
        assert_eq!(
            report.locations,
            vec![
                Location::new("Paris", 48.8566, 2.3522),
                Location::new("Lyon", 45.764, 4.8357),
            ]
        );
        assert_eq!(
            report.skipped,
            vec![SkippedRow {
                row: 4,
                reason: ValidationError::MissingColumn("coordinates"),
            }]
        );
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.txt");
        std::fs::write(&path, "A,1,2").unwrap();
        assert!(matches!(import_file(&path), Err(RouteBuddyError::Parse(_))));
    }

    #[test]
    fn xlsx_file_is_imported_from_first_sheet() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Location Name").unwrap();
        sheet.write_string(0, 1, "Latitude").unwrap();
        sheet.write_string(0, 2, "Longitude").unwrap();
        sheet.write_string(1, 0, "Paris").unwrap();
        sheet.write_number(1, 1, 48.8566).unwrap();
        sheet.write_number(1, 2, 2.3522).unwrap();
        sheet.write_string(2, 0, "Lyon").unwrap();
        sheet.write_string(2, 1, "45,764, 4,8357").unwrap();
        sheet.write_string(3, 0, "Nowhere").unwrap();
        sheet.write_number(3, 1, 200.0).unwrap();
        sheet.write_number(3, 2, 0.0).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.xlsx");
        std::fs::write(&path, workbook.save_to_buffer().unwrap()).unwrap();

        let report = import_file(&path).unwrap();
        assert_eq!(
            report.locations,
            vec![
                Location::new("Paris", 48.8566, 2.3522),
                Location::new("Lyon", 45.764, 4.8357),
            ]
        );
        assert_eq!(
            report.skipped,
            vec![SkippedRow {
                row: 4,
                reason: ValidationError::LatitudeOutOfRange(200.0),
            }]
        );
    }

    #[test]
    fn corrupt_workbook_is_a_spreadsheet_error() {
        let err = import_workbook(b"not a workbook".to_vec()).unwrap_err();
        assert!(matches!(err, RouteBuddyError::Spreadsheet(_)));
    }
}

use crate::{
    error::Result,
    geo::{leg_distances_km, path_distance_km},
    models::{DistanceMatrix, Location},
    stats::{ensure_shape, Statistics},
};

const CORNER: &str = "To \\ From";
const DIAGONAL: &str = "-";

/// Two-decimal rendering of a distance, rounding exact ties away from zero.
///
/// `{:.2}` breaks ties to even, so `0.125` would print as `0.12`; displays
/// and exports print `0.13` instead.
pub fn format_km(distance: f64) -> String {
    // Only multiples of 1/8 with an odd numerator land exactly on a half cent.
    let eighths = distance * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        let cents = (distance.abs() * 100.0 + 0.5).floor();
        let sign = if distance < 0.0 { "-" } else { "" };
        return format!("{sign}{:.2}", cents / 100.0);
    }
    format!("{distance:.2}")
}

/// Display grid with origins as columns and destinations as rows.
///
/// Rows run in reverse location order; the cell in row `r`, column `c`
/// holds the distance from `c` to `r`.
pub fn render_table(locations: &[Location], matrix: &DistanceMatrix) -> Result<Vec<Vec<String>>> {
    ensure_shape(locations, matrix)?;

    let mut table = Vec::with_capacity(locations.len() + 1);
    table.push(
        std::iter::once(CORNER.to_string())
            .chain(locations.iter().map(|loc| loc.name.clone()))
            .collect(),
    );

    for (to, destination) in locations.iter().enumerate().rev() {
        let mut row = Vec::with_capacity(locations.len() + 1);
        row.push(destination.name.clone());
        for from in 0..locations.len() {
            if from == to {
                row.push(DIAGONAL.to_string());
            } else {
                row.push(format_km(matrix.rows()[from][to]));
            }
        }
        table.push(row);
    }

    Ok(table)
}

/// Left-aligned plain-text rendering of a grid, columns padded to fit.
pub fn format_grid(grid: &[Vec<String>]) -> String {
    let columns = grid.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            grid.iter()
                .filter_map(|row| row.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    grid.iter()
        .map(|row| {
            row.iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable summary lines for the statistics panel.
pub fn format_statistics(locations: &[Location], stats: &Statistics) -> Vec<String> {
    let name = |index: usize| {
        locations
            .get(index)
            .map(|loc| loc.name.as_str())
            .unwrap_or("?")
    };
    let mut lines = vec![
        format!(
            "Minimum distance: {} km ({} -> {})",
            format_km(stats.min.distance_km),
            name(stats.min.from),
            name(stats.min.to)
        ),
        format!(
            "Maximum distance: {} km ({} -> {})",
            format_km(stats.max.distance_km),
            name(stats.max.from),
            name(stats.max.to)
        ),
        format!(
            "Average distance: {} km over {} routes",
            format_km(stats.mean_km),
            stats.count
        ),
        format!("Total distance: {} km", format_km(stats.total_km)),
    ];
    lines.extend(
        stats
            .histogram
            .buckets()
            .map(|(label, count)| format!("  {label}: {count}")),
    );
    lines
}

/// Straight-line legs visiting the locations in list order, then the total.
pub fn format_route(locations: &[Location]) -> Vec<String> {
    let path: Vec<_> = locations.iter().map(Location::coordinate).collect();
    let mut lines = vec!["Path in list order:".to_string()];
    lines.extend(
        locations
            .iter()
            .zip(leg_distances_km(&path))
            .enumerate()
            .map(|(i, (loc, leg))| format!("  {}. {} (+{} km)", i + 1, loc.name, format_km(leg))),
    );
    lines.push(format!(
        "Total path distance: {} km",
        format_km(path_distance_km(&path))
    ));
    lines
}

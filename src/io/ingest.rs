//! CSV ingest of per-mass fit results.
//!
//! This module turns the external fitter's result table into a `GridTable`.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **No interpolation logic here**

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{GridRecord, GridTable, ParamKey, RecordTarget, ScanKey, parse_mass_label};
use crate::error::AppError;

const REQUIRED_COLUMNS: [&str; 6] = ["region", "shift", "h", "a", "param", "value"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: grouped grid + row errors.
#[derive(Debug, Clone)]
pub struct IngestedGrid {
    pub table: GridTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a grid CSV from disk.
pub fn load_grid_csv(path: &Path) -> Result<IngestedGrid, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let out = read_grid_csv(file)?;
    debug!(
        path = %path.display(),
        rows_read = out.rows_read,
        rows_used = out.rows_used,
        keys = out.table.len(),
        "grid CSV loaded"
    );
    Ok(out)
}

/// Parse grid CSV from any reader.
pub fn read_grid_csv<R: Read>(input: R) -> Result<IngestedGrid, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for col in REQUIRED_COLUMNS {
        if !header_map.contains_key(col) {
            return Err(AppError::new(2, format!("Missing required column: `{col}`")));
        }
    }

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, &header_map));
        match parsed {
            Ok(r) => records.push(r),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for e in &row_errors {
        warn!(line = e.line, "skipping row: {}", e.message);
    }

    let rows_used = records.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows in grid CSV."));
    }

    let table = GridTable::from_records(&records)?;
    Ok(IngestedGrid {
        table,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<GridRecord, String> {
    let region = get_required(record, header_map, "region")?.to_string();
    let shift = get_optional(record, header_map, "shift").unwrap_or("").to_string();
    let h_raw = get_required(record, header_map, "h")?;
    let h: u32 = h_raw
        .parse()
        .map_err(|_| format!("Invalid heavy mass '{h_raw}' (expected a positive integer)."))?;
    let a = parse_mass_label(get_required(record, header_map, "a")?)?;

    let param = get_required(record, header_map, "param")?;
    let target = if param.eq_ignore_ascii_case("integral") {
        RecordTarget::Integral
    } else {
        RecordTarget::Param(param.to_ascii_lowercase().parse::<ParamKey>()?)
    };

    let value_raw = get_required(record, header_map, "value")?;
    let value = parse_f64(value_raw).ok_or_else(|| format!("Invalid value '{value_raw}'."))?;

    // Missing or unparsable uncertainties are left to the uncertainty policy.
    let error = get_optional(record, header_map, "error").and_then(parse_f64);

    Ok(GridRecord {
        key: ScanKey::new(region, shift, h),
        a,
        target,
        value,
        error,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

//! CSV ingest of compensation records.
//!
//! This module is responsible for turning a population CSV into a clean set of
//! `CompensationRecord`s that are safe to train on.
//!
//! Design goals:
//! - **Strict schema** for required fields (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (rows keep file order, which fixes vocabulary order)

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{CompensationRecord, Profile};
use crate::error::{Error, Result};

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: usable records plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedPopulation {
    pub records: Vec<CompensationRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a population CSV file.
///
/// Required column: `compensation`. Optional: `location`, `years_xp`
/// (or `total_xp`). Header names are case-insensitive.
pub fn load_population_csv(path: &Path) -> Result<IngestedPopulation> {
    let file = File::open(path)
        .map_err(|e| Error::Config(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_population_csv(file)
}

/// Same as [`load_population_csv`] over any reader.
pub fn read_population_csv<R: Read>(input: R) -> Result<IngestedPopulation> {
    let (records, row_errors, rows_read) = read_rows(input, parse_row)?;
    Ok(IngestedPopulation {
        records,
        row_errors,
        rows_read,
    })
}

/// Load profiles to score in bulk.
///
/// Same columns as the population file plus an optional `email`
/// (or `identity_token`) column used for attribution.
pub fn load_profiles_csv(path: &Path) -> Result<(Vec<Profile>, Vec<RowError>)> {
    let file = File::open(path)
        .map_err(|e| Error::Config(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_profiles_csv(file)
}

pub fn read_profiles_csv<R: Read>(input: R) -> Result<(Vec<Profile>, Vec<RowError>)> {
    let (profiles, row_errors, _) = read_rows(input, |record, header_map| {
        let r = parse_row(record, header_map)?;
        let identity = get_optional(record, header_map, "email")
            .or_else(|| get_optional(record, header_map, "identity_token"))
            .map(str::to_string);
        Ok(Profile {
            location: r.location,
            years_xp: r.years_xp,
            compensation: r.compensation,
            identity_token: identity,
        })
    })?;
    Ok((profiles, row_errors))
}

type RowParser<T> = fn(&StringRecord, &HashMap<String, usize>) -> std::result::Result<T, String>;

fn read_rows<R: Read, T>(input: R, parse: RowParser<T>) -> Result<(Vec<T>, Vec<RowError>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| Error::Config(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    if !header_map.contains_key("compensation") {
        return Err(Error::Config("Missing required column: `compensation`".to_string()));
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse(&record, &header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    Ok((rows, row_errors, rows_read))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> std::result::Result<CompensationRecord, String> {
    let raw = get_optional(record, header_map, "compensation").ok_or("Missing compensation value")?;
    let compensation: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid compensation '{raw}'"))?;
    if !(compensation.is_finite() && compensation >= 0.0) {
        return Err(format!("Compensation must be a non-negative number, got '{raw}'"));
    }

    let xp_raw = get_optional(record, header_map, "years_xp").or_else(|| get_optional(record, header_map, "total_xp"));
    let years_xp = match xp_raw {
        None => None,
        Some(s) => {
            let v: f64 = s.parse().map_err(|_| format!("Invalid years of experience '{s}'"))?;
            if !(v.is_finite() && v >= 0.0) {
                return Err(format!("Years of experience must be non-negative, got '{s}'"));
            }
            Some(v)
        }
    };

    let location = get_optional(record, header_map, "location").unwrap_or("").to_string();
    Ok(CompensationRecord::new(location, years_xp, compensation))
}

/// Non-empty trimmed cell for `name`, if the column exists.
fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = *header_map.get(name)?;
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_and_skips_bad_ones() {
        let csv = "\u{feff}Location,Total_XP,Compensation\n\
                   Paris,3,52000\n\
                   ,,41000\n\
                   Lyon,abc,40000\n\
                   Lyon,2,-5\n\
                   Nantes,1.5,38000\n";
        let out = read_population_csv(csv.as_bytes()).unwrap();
        assert_eq!(out.rows_read, 5);
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.records[0], CompensationRecord::new("Paris", Some(3.0), 52_000.0));
        assert_eq!(out.records[1], CompensationRecord::new("", None, 41_000.0));
        assert_eq!(out.records[2].years_xp, Some(1.5));

        let lines: Vec<usize> = out.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4, 5]);
    }

    #[test]
    fn missing_compensation_column_is_a_config_error() {
        let err = read_population_csv("location,years_xp\nParis,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn profiles_carry_identity_tokens() {
        let csv = "location,years_xp,compensation,email\nParis,3,52000,a@b.c\nLyon,,41000,\n";
        let (profiles, errors) = read_profiles_csv(csv.as_bytes()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(profiles[0].identity_token.as_deref(), Some("a@b.c"));
        assert_eq!(profiles[1].identity_token, None);
        assert_eq!(profiles[1].years_xp, None);
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = load_population_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}

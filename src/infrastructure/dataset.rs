//! Generated dataset files.
//!
//! A dataset is a CSV file whose header row holds `symbol (unit)` labels,
//! dependent variable first, and whose rows hold the matching numbers.

use std::fs::{self, OpenOptions};
use std::path::Path;

use csv::{ReaderBuilder, Terminator, WriterBuilder};
use tracing::debug;

use super::errors::{StoreError, StoreResult};

/// Rows of numbers under a header of `symbol (unit)` labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Dataset {
    /// Symbols of the independent columns: each header up to its first space.
    pub fn independent_symbols(&self) -> Vec<String> {
        self.headers
            .iter()
            .skip(1)
            .map(|header| header.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    /// First value of each row; rows without values are skipped.
    pub fn dependent_values(&self) -> Vec<f64> {
        self.rows.iter().filter_map(|row| row.first().copied()).collect()
    }
}

pub struct DatasetFile;

impl DatasetFile {
    /// Appends `rows` to the dataset at `path`.
    ///
    /// A new or empty file gets `headers` first. An existing file keeps its
    /// rows and must carry the same header.
    pub fn append(path: &Path, headers: &[String], rows: &[Vec<f64>]) -> StoreResult<()> {
        if let Some(row) = rows.iter().find(|row| row.len() != headers.len()) {
            return Err(StoreError::malformed(
                path,
                format!("row has {} values for {} columns", row.len(), headers.len()),
            ));
        }

        let existing_headers = match fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => Some(Self::read_headers(path)?),
            _ => None,
        };

        if let Some(existing) = &existing_headers {
            if existing != headers {
                return Err(StoreError::malformed(
                    path,
                    format!("header {:?} does not match {:?}", existing, headers),
                ));
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::io(path, e))?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::CRLF)
            .from_writer(file);

        if existing_headers.is_none() {
            writer
                .write_record(headers)
                .map_err(|e| StoreError::csv(path, e))?;
        }
        for row in rows {
            writer
                .write_record(row.iter().map(|value| value.to_string()))
                .map_err(|e| StoreError::csv(path, e))?;
        }
        writer.flush().map_err(|e| StoreError::io(path, e))?;

        debug!(path = %path.display(), rows = rows.len(), "appended dataset rows");
        Ok(())
    }

    pub fn read(path: &Path) -> StoreResult<Dataset> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| StoreError::csv(path, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| StoreError::csv(path, e))?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.is_empty() {
            return Err(StoreError::malformed(path, "missing header row"));
        }

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| StoreError::csv(path, e))?;
            let row = record
                .iter()
                .map(|field| {
                    field.parse::<f64>().map_err(|_| {
                        // Line 1 is the header
                        StoreError::malformed(
                            path,
                            format!("line {}: {:?} is not a number", index + 2, field),
                        )
                    })
                })
                .collect::<StoreResult<Vec<f64>>>()?;
            rows.push(row);
        }

        Ok(Dataset { headers, rows })
    }

    fn read_headers(path: &Path) -> StoreResult<Vec<String>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| StoreError::csv(path, e))?;
        let headers = reader.headers().map_err(|e| StoreError::csv(path, e))?;
        Ok(headers.iter().map(str::to_string).collect())
    }
}

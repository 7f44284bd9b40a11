use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::errors::{StoreError, StoreResult};
use crate::domain::Formula;

/// Formula definitions persisted as a JSON array, keyed by name.
///
/// Adding is define-once: a formula equal to a stored one (same name and
/// equation) is ignored rather than replacing it.
#[derive(Debug)]
pub struct FormulaStore {
    path: PathBuf,
    formulas: Vec<Formula>,
}

impl FormulaStore {
    /// Opens the store at `path`, loading whatever it already holds.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let formulas = Self::load(&path)?;
        Ok(Self { path, formulas })
    }

    /// Reads every formula in the file; a missing or blank file yields none.
    pub fn load(path: &Path) -> StoreResult<Vec<Formula>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "formula file absent, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let formulas: Vec<Formula> =
            serde_json::from_str(&content).map_err(|source| StoreError::Format {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), count = formulas.len(), "loaded formulas");
        Ok(formulas)
    }

    /// Writes `formulas` through a temporary file renamed over `path`.
    pub fn save_all(path: &Path, formulas: &[Formula]) -> StoreResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let mut json = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut json, PrettyFormatter::with_indent(b"    "));
        formulas
            .serialize(&mut serializer)
            .map_err(|source| StoreError::Format {
                path: path.to_path_buf(),
                source,
            })?;

        let mut file = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        file.write_all(&json)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| StoreError::io(file.path(), e))?;
        file.persist(path)
            .map_err(|e| StoreError::io(path, e.error))?;

        debug!(path = %path.display(), count = formulas.len(), "saved formulas");
        Ok(())
    }

    pub fn save(&self) -> StoreResult<()> {
        Self::save_all(&self.path, &self.formulas)
    }

    /// Appends and persists `formula` unless an equal one is already stored.
    ///
    /// Returns whether the formula was added.
    pub fn add(&mut self, formula: Formula) -> StoreResult<bool> {
        if self.formulas.contains(&formula) {
            warn!(name = %formula.name, "formula already stored, skipping");
            return Ok(false);
        }

        self.formulas.push(formula);
        if let Err(e) = self.save() {
            self.formulas.pop();
            return Err(e);
        }
        Ok(true)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Formula> {
        self.formulas.iter().find(|formula| formula.name == name)
    }

    pub fn formulas(&self) -> &[Formula] {
        &self.formulas
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

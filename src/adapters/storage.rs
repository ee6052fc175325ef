use crate::domain::meal_log::MealLogRow;
use crate::domain::ports::MealLogStore;
use crate::utils::error::Result;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Appends meal rows to a CSV file, writing the header on first use.
#[derive(Debug, Clone)]
pub struct CsvMealLog {
    path: PathBuf,
}

impl CsvMealLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MealLogStore for CsvMealLog {
    async fn append(&self, rows: &[MealLogRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let needs_header = fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::debug!("Appended {} row(s) to {}", rows.len(), self.path.display());
        Ok(())
    }
}

//! CSV dataset loading.
//!
//! This module reads the three input tables into typed raw records.
//! Numeric columns stay as text here; coercion happens in the join.
//! Any failure is fatal: there is no partial dashboard.

use crate::error::LoadError;
use crate::models::{School, StudentRecord, TeacherAssignment};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Columns `Student_Records.csv` must provide.
pub const STUDENT_COLUMNS: &[&str] = &["School_ID", "Attendance_Rate", "Dropout_Status"];

/// Columns `School_Info.csv` must provide.
pub const SCHOOL_COLUMNS: &[&str] = &["School_ID", "District", "Infrastructure_Score"];

/// Columns `Teacher_Deployment.csv` must provide.
pub const TEACHER_COLUMNS: &[&str] = &["School_ID", "Years_of_Experience"];

/// Resolved locations of the three input files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    pub students: PathBuf,
    pub schools: PathBuf,
    pub teachers: PathBuf,
}

impl From<&crate::config::DataConfig> for DatasetPaths {
    fn from(config: &crate::config::DataConfig) -> Self {
        let dir = Path::new(&config.data_dir);
        Self {
            students: dir.join(&config.students),
            schools: dir.join(&config.schools),
            teachers: dir.join(&config.teachers),
        }
    }
}

impl DatasetPaths {
    /// Paths that do not exist on disk.
    pub fn missing(&self) -> Vec<&Path> {
        [&self.students, &self.schools, &self.teachers]
            .into_iter()
            .filter(|p| !p.exists())
            .map(PathBuf::as_path)
            .collect()
    }
}

/// The three raw tables, in file order.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub students: Vec<StudentRecord>,
    pub schools: Vec<School>,
    pub teachers: Vec<TeacherAssignment>,
}

/// Read `Student_Records.csv`.
pub fn load_students(path: &Path) -> Result<Vec<StudentRecord>, LoadError> {
    read_table(path, STUDENT_COLUMNS)
}

/// Read `School_Info.csv`.
pub fn load_schools(path: &Path) -> Result<Vec<School>, LoadError> {
    read_table(path, SCHOOL_COLUMNS)
}

/// Read `Teacher_Deployment.csv`.
pub fn load_teachers(path: &Path) -> Result<Vec<TeacherAssignment>, LoadError> {
    read_table(path, TEACHER_COLUMNS)
}

/// Load all three datasets.
///
/// The files are independent, so each one is read on the blocking pool and
/// the first error wins. Row order within each table is preserved.
pub async fn load_datasets(paths: &DatasetPaths, show_progress: bool) -> Result<Datasets, LoadError> {
    info!("Loading datasets");

    let progress = if show_progress {
        let pb = ProgressBar::new(3);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("datasets");
        Some(pb)
    } else {
        None
    };

    let (students, schools, teachers) = tokio::try_join!(
        spawn_load("students", paths.students.clone(), load_students, progress.clone()),
        spawn_load("schools", paths.schools.clone(), load_schools, progress.clone()),
        spawn_load("teachers", paths.teachers.clone(), load_teachers, progress.clone()),
    )?;

    if let Some(pb) = progress {
        pb.finish_with_message("datasets loaded");
    }

    info!(
        "Loaded {} students, {} schools, {} teacher assignments",
        students.len(),
        schools.len(),
        teachers.len()
    );

    Ok(Datasets {
        students,
        schools,
        teachers,
    })
}

async fn spawn_load<T, F>(
    dataset: &'static str,
    path: PathBuf,
    load: F,
    progress: Option<ProgressBar>,
) -> Result<Vec<T>, LoadError>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> Result<Vec<T>, LoadError> + Send + 'static,
{
    let rows = tokio::task::spawn_blocking(move || load(&path))
        .await
        .map_err(|e| LoadError::Task {
            dataset,
            reason: e.to_string(),
        })??;

    if let Some(pb) = progress {
        pb.inc(1);
    }

    Ok(rows)
}

/// Read a CSV file after checking its header against `required`.
fn read_table<T: DeserializeOwned>(
    path: &Path,
    required: &'static [&'static str],
) -> Result<Vec<T>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    if let Some(column) = required
        .iter()
        .copied()
        .find(|column| !headers.iter().any(|h| h == *column))
    {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column,
        });
    }

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: T = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

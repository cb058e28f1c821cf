//! Data models for the dropout dashboard.
//!
//! This module contains the raw dataset records, the joined working table,
//! aggregate results, and the dashboard document that gets rendered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dropout status of a single student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropoutStatus {
    /// Still enrolled (`N` in the source data)
    Retained,
    /// Dropped out (`Y` in the source data)
    Dropped,
}

impl fmt::Display for DropoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl DropoutStatus {
    /// Parse the raw `Dropout_Status` cell. Anything other than Y/N is missing.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "Y" => Some(DropoutStatus::Dropped),
            "N" => Some(DropoutStatus::Retained),
            _ => None,
        }
    }

    /// The single-letter code used in the datasets.
    pub fn code(&self) -> &'static str {
        match self {
            DropoutStatus::Dropped => "Y",
            DropoutStatus::Retained => "N",
        }
    }

    /// Human-readable label for charts.
    pub fn label(&self) -> &'static str {
        match self {
            DropoutStatus::Dropped => "Dropped Out",
            DropoutStatus::Retained => "No Dropout",
        }
    }
}

/// One row of `Student_Records.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "School_ID")]
    pub school_id: String,
    /// Kept as text; coerced during the join.
    #[serde(rename = "Attendance_Rate", default)]
    pub attendance_rate: String,
    #[serde(rename = "Dropout_Status", default)]
    pub dropout_status: String,
}

/// One row of `School_Info.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct School {
    #[serde(rename = "School_ID")]
    pub school_id: String,
    #[serde(rename = "District", default)]
    pub district: String,
    #[serde(rename = "Infrastructure_Score", default)]
    pub infrastructure_score: String,
}

/// One row of `Teacher_Deployment.csv`: a teacher assigned to a school.
#[derive(Debug, Clone, Deserialize)]
pub struct TeacherAssignment {
    #[serde(rename = "School_ID")]
    pub school_id: String,
    #[serde(rename = "Years_of_Experience", default)]
    pub years_of_experience: String,
}

/// Numeric columns of the working table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericColumn {
    AttendanceRate,
    InfrastructureScore,
    AvgTeacherExperience,
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericColumn::AttendanceRate => write!(f, "Attendance_Rate"),
            NumericColumn::InfrastructureScore => write!(f, "Infrastructure_Score"),
            NumericColumn::AvgTeacherExperience => write!(f, "Avg_Teacher_Experience"),
        }
    }
}

/// Categorical columns the working table can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupColumn {
    DropoutStatus,
    District,
}

impl fmt::Display for GroupColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupColumn::DropoutStatus => write!(f, "Dropout_Status"),
            GroupColumn::District => write!(f, "District"),
        }
    }
}

/// A student row after joining school and teacher data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkingRow {
    pub school_id: String,
    pub attendance_rate: Option<f64>,
    pub dropout_status: Option<DropoutStatus>,
    pub district: Option<String>,
    pub infrastructure_score: Option<f64>,
    pub avg_teacher_experience: Option<f64>,
}

impl WorkingRow {
    /// Value of a numeric column, `None` when missing.
    pub fn numeric(&self, column: NumericColumn) -> Option<f64> {
        match column {
            NumericColumn::AttendanceRate => self.attendance_rate,
            NumericColumn::InfrastructureScore => self.infrastructure_score,
            NumericColumn::AvgTeacherExperience => self.avg_teacher_experience,
        }
    }

    /// Grouping key for a categorical column, `None` when missing.
    pub fn group_key(&self, column: GroupColumn) -> Option<&str> {
        match column {
            GroupColumn::DropoutStatus => self.dropout_status.map(|s| s.code()),
            GroupColumn::District => self.district.as_deref(),
        }
    }

    pub fn is_dropped(&self) -> bool {
        self.dropout_status == Some(DropoutStatus::Dropped)
    }
}

/// Bookkeeping collected while building the working table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinStats {
    /// Rows read from each input.
    pub students: usize,
    pub schools: usize,
    pub teacher_assignments: usize,
    /// Extra school rows ignored because their id was already seen.
    pub duplicate_schools: usize,
    /// Students whose school id has no school row.
    pub unmatched_school: usize,
    /// Students whose school id has no teacher average.
    pub unmatched_teacher: usize,
    /// Non-empty cells that failed numeric coercion.
    pub invalid_attendance: usize,
    pub invalid_infrastructure: usize,
    pub invalid_experience: usize,
}

/// The joined table every statistic is computed from.
#[derive(Debug, Clone, Default)]
pub struct WorkingTable {
    pub rows: Vec<WorkingRow>,
    pub join_stats: JoinStats,
}

impl WorkingTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkingRow> {
        self.rows.iter()
    }
}

/// Mean, count, spread and CI95 of one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub mean: f64,
    pub count: usize,
    /// Sample standard deviation; `None` below two observations.
    pub std: Option<f64>,
    /// Half-width of the 95% normal-approximation interval.
    pub ci95: f64,
}

/// Five-number summary plus mean and standard deviation for a box plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSummary {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Most extreme points within 1.5 IQR of the box.
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub mean: f64,
    pub std: Option<f64>,
}

/// Headline numbers. `None` marks a statistic that was undefined for the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_students: usize,
    pub dropout_count: usize,
    pub overall_dropout_rate: Option<f64>,
    pub avg_attendance: Option<f64>,
    pub avg_teacher_experience: Option<f64>,
    pub avg_infrastructure: Option<f64>,
}

/// Output format of the rendered dashboard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Self-contained HTML page (default)
    #[default]
    Html,
    /// JSON document
    Json,
    /// Markdown report
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// A headline number shown above the charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCard {
    pub label: String,
    /// Formatted value, or `n/a` when undefined.
    pub display: String,
    pub value: Option<f64>,
}

/// One side of a box-plot comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSeries {
    pub name: String,
    pub color: String,
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<BoxSummary>,
}

/// Data behind a chart, one variant per chart kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartData {
    Donut {
        labels: Vec<String>,
        values: Vec<usize>,
        colors: Vec<String>,
        hole: f64,
    },
    LineWithErrors {
        x: Vec<String>,
        y: Vec<f64>,
        error: Vec<f64>,
        counts: Vec<usize>,
        x_title: String,
        y_title: String,
        y_range: Option<(f64, f64)>,
    },
    BoxComparison {
        series: Vec<BoxSeries>,
        y_title: String,
        p_value: Option<f64>,
    },
    Bar {
        x: Vec<String>,
        y: Vec<f64>,
        x_title: String,
        y_title: String,
    },
}

/// A single chart of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    /// Stable DOM id, also used as a Markdown anchor.
    pub id: String,
    /// Section heading shown above the chart.
    pub heading: String,
    /// Title drawn inside the figure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub data: ChartData,
    /// Explanation shown when the chart could not be fully computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Where the inputs came from and how the join went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardMetadata {
    pub generated_at: DateTime<Utc>,
    pub students_path: String,
    pub schools_path: String,
    pub teachers_path: String,
    pub join_stats: JoinStats,
    pub duration_seconds: f64,
}

/// The complete dashboard document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub title: String,
    pub subtitle: String,
    pub metadata: DashboardMetadata,
    pub kpis: Kpis,
    pub cards: Vec<MetricCard>,
    /// Chart rows; the first holds three charts, the second two.
    pub rows: Vec<Vec<Chart>>,
}

impl Dashboard {
    /// All charts in layout order.
    pub fn charts(&self) -> impl Iterator<Item = &Chart> {
        self.rows.iter().flatten()
    }
}

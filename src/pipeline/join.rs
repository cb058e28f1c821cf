//! Joining students with school metadata and teacher experience.
//!
//! The join is a left join on `School_ID`: every student row survives exactly
//! once, in input order, and unmatched rows keep missing values.

use crate::models::{
    DropoutStatus, JoinStats, School, StudentRecord, TeacherAssignment, WorkingRow, WorkingTable,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Coerce a text cell to a finite float.
///
/// Blank, non-numeric and non-finite values all become `None`.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce and record whether a non-blank cell was rejected.
fn coerce_counted(raw: &str, invalid: &mut usize) -> Option<f64> {
    let value = coerce_numeric(raw);
    if value.is_none() && !raw.trim().is_empty() {
        *invalid += 1;
    }
    value
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Per-school teacher averages plus the number of rejected experience cells.
#[derive(Debug, Clone, Default)]
pub struct TeacherAverages {
    pub by_school: HashMap<String, f64>,
    pub invalid_experience: usize,
}

impl TeacherAverages {
    pub fn get(&self, school_id: &str) -> Option<f64> {
        self.by_school.get(school_id).copied()
    }
}

/// Mean years of experience per school.
///
/// Invalid experience cells are skipped; a school with no valid cells has
/// no average.
pub fn teacher_averages(teachers: &[TeacherAssignment]) -> TeacherAverages {
    let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
    let mut invalid_experience = 0;

    for teacher in teachers {
        if let Some(years) = coerce_counted(&teacher.years_of_experience, &mut invalid_experience)
        {
            let entry = sums.entry(teacher.school_id.trim().to_string()).or_default();
            entry.0 += years;
            entry.1 += 1;
        }
    }

    let by_school = sums
        .into_iter()
        .map(|(school, (sum, count))| (school, sum / count as f64))
        .collect();

    TeacherAverages {
        by_school,
        invalid_experience,
    }
}

/// Left-join students to schools and teacher averages.
pub fn join(
    students: &[StudentRecord],
    schools: &[School],
    teacher_averages: &TeacherAverages,
) -> WorkingTable {
    let mut stats = JoinStats {
        students: students.len(),
        schools: schools.len(),
        invalid_experience: teacher_averages.invalid_experience,
        ..JoinStats::default()
    };

    // First row wins so duplicate ids never fan out student rows.
    let mut school_index: HashMap<&str, (Option<String>, Option<f64>)> = HashMap::new();
    for school in schools {
        let id = school.school_id.trim();
        if school_index.contains_key(id) {
            stats.duplicate_schools += 1;
            warn!("Duplicate School_ID '{}' in school table, keeping first row", id);
            continue;
        }
        let score = coerce_counted(&school.infrastructure_score, &mut stats.invalid_infrastructure);
        school_index.insert(id, (non_empty(&school.district), score));
    }

    let rows: Vec<WorkingRow> = students
        .iter()
        .map(|student| {
            let id = student.school_id.trim();
            let (district, infrastructure_score) = match school_index.get(id) {
                Some((district, score)) => (district.clone(), *score),
                None => {
                    stats.unmatched_school += 1;
                    (None, None)
                }
            };

            let avg_teacher_experience = teacher_averages.get(id);
            if avg_teacher_experience.is_none() {
                stats.unmatched_teacher += 1;
            }

            WorkingRow {
                school_id: id.to_string(),
                attendance_rate: coerce_counted(
                    &student.attendance_rate,
                    &mut stats.invalid_attendance,
                ),
                dropout_status: DropoutStatus::parse(&student.dropout_status),
                district,
                infrastructure_score,
                avg_teacher_experience,
            }
        })
        .collect();

    debug!(
        "Joined {} rows ({} without school, {} without teachers, {} invalid attendance values)",
        rows.len(),
        stats.unmatched_school,
        stats.unmatched_teacher,
        stats.invalid_attendance
    );

    WorkingTable {
        rows,
        join_stats: stats,
    }
}

/// Build the working table from the three raw tables.
pub fn build_working_table(
    students: &[StudentRecord],
    schools: &[School],
    teachers: &[TeacherAssignment],
) -> WorkingTable {
    let averages = teacher_averages(teachers);
    let mut table = join(students, schools, &averages);
    table.join_stats.teacher_assignments = teachers.len();
    table
}

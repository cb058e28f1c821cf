//! Aggregates over the working table.
//!
//! Every function here is pure: it reads the table and returns a scalar or a
//! small grouped result. Missing values are skipped, never treated as zero.

use crate::analysis::stats::{ci95, mean, rank_sum_test, sample_std};
use crate::error::StatsError;
use crate::models::{DropoutStatus, GroupColumn, GroupStats, Kpis, NumericColumn, WorkingTable};
use std::collections::BTreeMap;
use tracing::debug;

/// Number of students with status `Dropped`.
pub fn dropout_count(table: &WorkingTable) -> usize {
    table.iter().filter(|r| r.is_dropped()).count()
}

/// Percentage of all students who dropped out.
///
/// Rows with an unknown status count toward the total but not as dropouts.
pub fn dropout_rate(table: &WorkingTable) -> Result<f64, StatsError> {
    if table.is_empty() {
        return Err(StatsError::EmptyTable);
    }
    Ok(dropout_count(table) as f64 / table.len() as f64 * 100.0)
}

/// Non-missing values of a column, in table order.
pub fn column_values(table: &WorkingTable, column: NumericColumn) -> Vec<f64> {
    table.iter().filter_map(|r| r.numeric(column)).collect()
}

/// Mean of a numeric column, ignoring missing values.
pub fn mean_of(table: &WorkingTable, column: NumericColumn) -> Result<f64, StatsError> {
    mean(&column_values(table, column))
}

/// Mean, count, standard deviation and CI95 of `value` per `group`.
///
/// Groups come back in sorted label order. Rows without a group key are
/// skipped, and a group with no valid values is left out.
pub fn grouped_mean_std_ci(
    table: &WorkingTable,
    group: GroupColumn,
    value: NumericColumn,
) -> BTreeMap<String, GroupStats> {
    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for row in table.iter() {
        let Some(key) = row.group_key(group) else {
            continue;
        };
        let sample = samples.entry(key.to_string()).or_default();
        if let Some(v) = row.numeric(value) {
            sample.push(v);
        }
    }

    samples
        .into_iter()
        .filter_map(|(key, values)| {
            let m = mean(&values).ok()?;
            let std = sample_std(&values);
            let count = values.len();
            Some((
                key,
                GroupStats {
                    mean: m,
                    count,
                    std,
                    ci95: ci95(std, count),
                },
            ))
        })
        .collect()
}

/// Dropout rate (percent) per group, highest first.
///
/// Ties keep sorted label order.
pub fn grouped_dropout_rate(table: &WorkingTable, group: GroupColumn) -> Vec<(String, f64)> {
    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    for row in table.iter() {
        if let Some(key) = row.group_key(group) {
            let entry = counts.entry(key.to_string()).or_default();
            entry.1 += 1;
            if row.is_dropped() {
                entry.0 += 1;
            }
        }
    }

    let mut rates: Vec<(String, f64)> = counts
        .into_iter()
        .map(|(key, (dropped, total))| (key, dropped as f64 / total as f64 * 100.0))
        .collect();

    // `sort_by` is stable, so equal rates keep label order.
    rates.sort_by(|a, b| b.1.total_cmp(&a.1));
    rates
}

/// Values of `column` for students with the given status, in table order.
pub fn sample_by_status(
    table: &WorkingTable,
    column: NumericColumn,
    status: DropoutStatus,
) -> Vec<f64> {
    table
        .iter()
        .filter(|r| r.dropout_status == Some(status))
        .filter_map(|r| r.numeric(column))
        .collect()
}

/// Samples of one column split by dropout status, with the rank-sum p-value.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusComparison {
    pub retained: Vec<f64>,
    pub dropped: Vec<f64>,
    pub p_value: Result<f64, StatsError>,
}

/// Compare `column` between students who stayed and students who left.
pub fn compare_by_status(table: &WorkingTable, column: NumericColumn) -> StatusComparison {
    let retained = sample_by_status(table, column, DropoutStatus::Retained);
    let dropped = sample_by_status(table, column, DropoutStatus::Dropped);
    let p_value = rank_sum_test(&dropped, &retained);

    debug!(
        "{}: {} retained vs {} dropped, p = {:?}",
        column,
        retained.len(),
        dropped.len(),
        p_value
    );

    StatusComparison {
        retained,
        dropped,
        p_value,
    }
}

/// Compute the four headline numbers.
pub fn compute_kpis(table: &WorkingTable) -> Kpis {
    Kpis {
        total_students: table.len(),
        dropout_count: dropout_count(table),
        overall_dropout_rate: dropout_rate(table).ok(),
        avg_attendance: mean_of(table, NumericColumn::AttendanceRate).ok(),
        avg_teacher_experience: mean_of(table, NumericColumn::AvgTeacherExperience).ok(),
        avg_infrastructure: mean_of(table, NumericColumn::InfrastructureScore).ok(),
    }
}

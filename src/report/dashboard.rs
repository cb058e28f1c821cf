//! Dashboard assembly.
//!
//! Turns aggregator output into metric cards and chart descriptors. Each
//! chart is built from its own aggregate only; nothing is shared between
//! charts. Formatting is the only work done here.

use crate::analysis::stats::box_summary;
use crate::analysis::{
    compare_by_status, compute_kpis, grouped_dropout_rate, grouped_mean_std_ci, StatusComparison,
};
use crate::config::ReportConfig;
use crate::error::StatsError;
use crate::loader::DatasetPaths;
use crate::models::{
    BoxSeries, Chart, ChartData, Dashboard, DashboardMetadata, DropoutStatus, GroupColumn,
    GroupStats, Kpis, MetricCard, NumericColumn, WorkingTable,
};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Placeholder for a value that could not be computed.
pub const NOT_AVAILABLE: &str = "n/a";

pub const DROPPED_COLOR: &str = "#D32F2F";

/// Format a percentage with two decimals, e.g. `50.00%`.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Format a plain number with two decimals.
pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Format a p-value with three decimals.
pub fn format_p_value(p: Option<f64>) -> String {
    match p {
        Some(v) => format!("{:.3}", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// The four headline cards.
pub fn metric_cards(kpis: &Kpis) -> Vec<MetricCard> {
    vec![
        MetricCard {
            label: "Overall Dropout Rate".to_string(),
            display: format_percent(kpis.overall_dropout_rate),
            value: kpis.overall_dropout_rate,
        },
        MetricCard {
            label: "Average Attendance Rate".to_string(),
            display: format_percent(kpis.avg_attendance),
            value: kpis.avg_attendance,
        },
        MetricCard {
            label: "Average Teacher Experience (years)".to_string(),
            display: format_number(kpis.avg_teacher_experience),
            value: kpis.avg_teacher_experience,
        },
        MetricCard {
            label: "Average Infrastructure Score".to_string(),
            display: match kpis.avg_infrastructure {
                Some(v) => format!("{:.2} / 5", v),
                None => NOT_AVAILABLE.to_string(),
            },
            value: kpis.avg_infrastructure,
        },
    ]
}

/// Donut of dropped vs not dropped students.
pub fn dropout_donut(total: usize, dropped: usize) -> Chart {
    let note = (total == 0).then(|| "No student records were loaded.".to_string());

    Chart {
        id: "overall-dropout".to_string(),
        heading: "Overall Dropout Rate".to_string(),
        title: None,
        data: ChartData::Donut {
            labels: vec!["Dropped Out".to_string(), "Not Dropped Out".to_string()],
            values: vec![dropped, total.saturating_sub(dropped)],
            colors: vec!["#636EFA".to_string(), "#B0BEC5".to_string()],
            hole: 0.5,
        },
        note,
    }
}

/// Mean infrastructure score per dropout status with CI95 error bars.
pub fn infrastructure_line(stats: &BTreeMap<String, GroupStats>) -> Chart {
    let note = stats
        .is_empty()
        .then(|| "No infrastructure scores matched students with a known status.".to_string());

    Chart {
        id: "infrastructure-by-status".to_string(),
        heading: "Infrastructure Score by Dropout Status".to_string(),
        title: None,
        data: ChartData::LineWithErrors {
            x: stats.keys().cloned().collect(),
            y: stats.values().map(|s| s.mean).collect(),
            error: stats.values().map(|s| s.ci95).collect(),
            counts: stats.values().map(|s| s.count).collect(),
            x_title: "Dropout Status".to_string(),
            y_title: "Infrastructure Score".to_string(),
            y_range: Some((1.0, 5.0)),
        },
        note,
    }
}

/// Box plots of one measure for retained vs dropped students.
pub fn status_box_chart(
    id: &str,
    heading: &str,
    y_title: &str,
    retained_color: &str,
    comparison: &StatusComparison,
) -> Chart {
    let p_value = comparison.p_value.ok();
    let note = match comparison.p_value {
        Ok(_) => None,
        Err(StatsError::EmptySample) => Some(
            "Rank-sum test needs observations from both groups; p-value not computed.".to_string(),
        ),
        Err(e) => Some(format!("p-value not computed: {}", e)),
    };

    let series = vec![
        BoxSeries {
            name: DropoutStatus::Retained.label().to_string(),
            color: retained_color.to_string(),
            values: comparison.retained.clone(),
            summary: box_summary(&comparison.retained).ok(),
        },
        BoxSeries {
            name: DropoutStatus::Dropped.label().to_string(),
            color: DROPPED_COLOR.to_string(),
            values: comparison.dropped.clone(),
            summary: box_summary(&comparison.dropped).ok(),
        },
    ];

    Chart {
        id: id.to_string(),
        heading: heading.to_string(),
        title: Some(format!("{} (p={})", heading, format_p_value(p_value))),
        data: ChartData::BoxComparison {
            series,
            y_title: y_title.to_string(),
            p_value,
        },
        note,
    }
}

/// Dropout rate per district, highest first.
pub fn district_bar(rates: &[(String, f64)]) -> Chart {
    let note = rates
        .is_empty()
        .then(|| "No students could be matched to a district.".to_string());

    Chart {
        id: "dropout-by-district".to_string(),
        heading: "Dropout Rate by District".to_string(),
        title: None,
        data: ChartData::Bar {
            x: rates.iter().map(|(d, _)| d.clone()).collect(),
            y: rates.iter().map(|(_, r)| *r).collect(),
            x_title: "District".to_string(),
            y_title: "Dropout Rate (%)".to_string(),
        },
        note,
    }
}

/// Build the whole dashboard from the working table.
pub fn build_dashboard(
    table: &WorkingTable,
    report: &ReportConfig,
    paths: &DatasetPaths,
    duration_seconds: f64,
) -> Dashboard {
    let kpis = compute_kpis(table);
    debug!("KPIs: {:?}", kpis);

    if kpis.overall_dropout_rate.is_none() {
        warn!("Working table is empty; KPIs will show {}", NOT_AVAILABLE);
    }

    let infra_stats = grouped_mean_std_ci(
        table,
        GroupColumn::DropoutStatus,
        NumericColumn::InfrastructureScore,
    );
    let attendance = compare_by_status(table, NumericColumn::AttendanceRate);
    let experience = compare_by_status(table, NumericColumn::AvgTeacherExperience);
    let district_rates = grouped_dropout_rate(table, GroupColumn::District);

    let first_row = vec![
        dropout_donut(kpis.total_students, kpis.dropout_count),
        infrastructure_line(&infra_stats),
        status_box_chart(
            "attendance-by-status",
            "Attendance Rate by Dropout Status",
            "Attendance Rate (%)",
            "#1E88E5",
            &attendance,
        ),
    ];
    let second_row = vec![
        status_box_chart(
            "teacher-experience-by-status",
            "Teacher Experience by Dropout Status",
            "Avg Teacher Experience (years)",
            "#3949AB",
            &experience,
        ),
        district_bar(&district_rates),
    ];

    Dashboard {
        title: report.title.clone(),
        subtitle: report.subtitle.clone(),
        metadata: DashboardMetadata {
            generated_at: Utc::now(),
            students_path: paths.students.display().to_string(),
            schools_path: paths.schools.display().to_string(),
            teachers_path: paths.teachers.display().to_string(),
            join_stats: table.join_stats.clone(),
            duration_seconds,
        },
        cards: metric_cards(&kpis),
        kpis,
        rows: vec![first_row, second_row],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::models::{School, StudentRecord, TeacherAssignment};
    use crate::pipeline::build_working_table;

    fn scenario_table() -> WorkingTable {
        let students = vec![
            StudentRecord {
                school_id: "S1".to_string(),
                attendance_rate: "95".to_string(),
                dropout_status: "N".to_string(),
            },
            StudentRecord {
                school_id: "S1".to_string(),
                attendance_rate: "70".to_string(),
                dropout_status: "Y".to_string(),
            },
            StudentRecord {
                school_id: "S2".to_string(),
                attendance_rate: "bad".to_string(),
                dropout_status: "N".to_string(),
            },
            StudentRecord {
                school_id: "S2".to_string(),
                attendance_rate: "60".to_string(),
                dropout_status: "Y".to_string(),
            },
        ];
        let schools = vec![
            School {
                school_id: "S1".to_string(),
                district: "A".to_string(),
                infrastructure_score: "3".to_string(),
            },
            School {
                school_id: "S2".to_string(),
                district: "B".to_string(),
                infrastructure_score: "5".to_string(),
            },
        ];
        let teachers = vec![TeacherAssignment {
            school_id: "S1".to_string(),
            years_of_experience: "5".to_string(),
        }];
        build_working_table(&students, &schools, &teachers)
    }

    fn paths() -> DatasetPaths {
        DatasetPaths::from(&DataConfig::default())
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_percent(Some(50.0)), "50.00%");
        assert_eq!(format_percent(None), "n/a");
        assert_eq!(format_number(Some(7.456)), "7.46");
        assert_eq!(format_p_value(Some(0.11111)), "0.111");
        assert_eq!(format_p_value(None), "n/a");
    }

    #[test]
    fn test_layout_is_three_then_two() {
        let dashboard = build_dashboard(&scenario_table(), &ReportConfig::default(), &paths(), 0.0);

        assert_eq!(dashboard.cards.len(), 4);
        assert_eq!(dashboard.rows.len(), 2);
        assert_eq!(dashboard.rows[0].len(), 3);
        assert_eq!(dashboard.rows[1].len(), 2);

        let ids: Vec<_> = dashboard.charts().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "overall-dropout",
                "infrastructure-by-status",
                "attendance-by-status",
                "teacher-experience-by-status",
                "dropout-by-district",
            ]
        );
    }

    #[test]
    fn test_cards_for_scenario() {
        let dashboard = build_dashboard(&scenario_table(), &ReportConfig::default(), &paths(), 0.0);

        assert_eq!(dashboard.cards[0].display, "50.00%");
        assert_eq!(dashboard.cards[1].display, "75.00%");
        assert_eq!(dashboard.cards[2].display, "5.00");
        assert_eq!(dashboard.cards[3].display, "4.00 / 5");
    }

    #[test]
    fn test_empty_table_renders_placeholders() {
        let dashboard =
            build_dashboard(&WorkingTable::default(), &ReportConfig::default(), &paths(), 0.0);

        assert!(dashboard.cards.iter().all(|c| c.display == NOT_AVAILABLE));
        assert!(dashboard.charts().all(|c| c.note.is_some()));
    }

    #[test]
    fn test_box_chart_title_carries_p_value() {
        let table = scenario_table();
        let comparison = compare_by_status(&table, NumericColumn::AttendanceRate);
        let chart = status_box_chart("a", "Attendance", "Rate", "#000000", &comparison);

        let p = comparison.p_value.unwrap();
        assert_eq!(
            chart.title.as_deref(),
            Some(format!("Attendance (p={:.3})", p).as_str())
        );
        assert!(chart.note.is_none());
    }

    #[test]
    fn test_box_chart_one_sided_sample() {
        let comparison = StatusComparison {
            retained: vec![1.0, 2.0],
            dropped: vec![],
            p_value: Err(StatsError::EmptySample),
        };
        let chart = status_box_chart("a", "Attendance", "Rate", "#000000", &comparison);

        assert_eq!(chart.title.as_deref(), Some("Attendance (p=n/a)"));
        assert!(chart.note.is_some());
        match chart.data {
            ChartData::BoxComparison { series, .. } => {
                assert!(series[0].summary.is_some());
                assert!(series[1].summary.is_none());
            }
            other => panic!("unexpected chart data: {other:?}"),
        }
    }

    #[test]
    fn test_chart_data_is_reproducible() {
        let first = build_dashboard(&scenario_table(), &ReportConfig::default(), &paths(), 0.0);
        let second = build_dashboard(&scenario_table(), &ReportConfig::default(), &paths(), 0.0);

        assert_eq!(first.kpis, second.kpis);
        assert_eq!(first.cards, second.cards);
        assert_eq!(first.rows, second.rows);
    }
}

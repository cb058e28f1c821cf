//! Dashboard document generation.
//!
//! This module renders a `Dashboard` as a self-contained HTML page, a JSON
//! document, or a Markdown report.

use crate::models::{BoxSeries, Chart, ChartData, Dashboard, DashboardMetadata, OutputFormat};
use crate::report::dashboard::{format_number, format_p_value, format_percent};
use crate::report::plotly::figure;
use anyhow::{Context, Result};
use std::path::Path;

/// Render the dashboard in the requested format.
pub fn render(dashboard: &Dashboard, format: OutputFormat, plotly_cdn: &str) -> Result<String> {
    match format {
        OutputFormat::Html => generate_html_dashboard(dashboard, plotly_cdn),
        OutputFormat::Json => generate_json_dashboard(dashboard),
        OutputFormat::Markdown => Ok(generate_markdown_dashboard(dashboard)),
    }
}

/// Write rendered output to disk.
pub fn write_dashboard(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write dashboard to {}", path.display()))
}

/// Generate a JSON dashboard.
pub fn generate_json_dashboard(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Serialize JSON for embedding inside a `<script>` element.
///
/// `<` only occurs inside JSON strings, where `\u003c` decodes to the same text.
fn script_json(value: &serde_json::Value) -> Result<String> {
    let raw = serde_json::to_string(value)?;
    Ok(raw.replace('<', "\\u003c"))
}

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; margin: 24px; color: #263238; background: #FAFAFA; }
h1 { margin-bottom: 4px; }
.subtitle { color: #607D8B; margin-top: 0; }
.cards { display: grid; grid-template-columns: repeat(4, 1fr); gap: 16px; margin: 16px 0; }
.card { background: white; border-radius: 8px; padding: 16px; box-shadow: 0 1px 3px rgba(0,0,0,.12); }
.card .label { font-size: 0.9em; color: #607D8B; }
.card .value { font-size: 1.8em; font-weight: bold; margin-top: 6px; }
.row { display: grid; gap: 16px; margin-bottom: 16px; }
.row-3 { grid-template-columns: repeat(3, 1fr); }
.row-2 { grid-template-columns: repeat(2, 1fr); }
.panel { background: white; border-radius: 8px; padding: 12px; box-shadow: 0 1px 3px rgba(0,0,0,.12); }
.chart { height: 360px; }
.note { color: #B71C1C; font-size: 0.85em; }
footer { color: #90A4AE; font-size: 0.8em; margin-top: 24px; }
"#;

/// Generate the HTML page with one Plotly figure per chart.
pub fn generate_html_dashboard(dashboard: &Dashboard, plotly_cdn: &str) -> Result<String> {
    let mut output = String::new();

    output.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    output.push_str("<meta charset=\"utf-8\">\n");
    output.push_str(&format!("<title>{}</title>\n", escape_html(&dashboard.title)));
    output.push_str(&format!(
        "<script src=\"{}\"></script>\n",
        escape_html(plotly_cdn)
    ));
    output.push_str(&format!("<style>{}</style>\n", STYLE));
    output.push_str("</head>\n<body>\n");

    output.push_str(&format!("<h1>{}</h1>\n", escape_html(&dashboard.title)));
    output.push_str(&format!(
        "<p class=\"subtitle\">{}</p>\n",
        escape_html(&dashboard.subtitle)
    ));

    // KPI cards
    output.push_str("<div class=\"cards\">\n");
    for card in &dashboard.cards {
        output.push_str(&format!(
            "  <div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>\n",
            escape_html(&card.label),
            escape_html(&card.display)
        ));
    }
    output.push_str("</div>\n<hr>\n");

    // Chart grid
    let mut scripts = String::new();
    for row in &dashboard.rows {
        output.push_str(&format!("<div class=\"row row-{}\">\n", row.len()));
        for chart in row {
            output.push_str(&html_panel(chart));
            let fig = figure(chart);
            scripts.push_str(&format!(
                "Plotly.newPlot(\"{}\", {}, {}, {{\"responsive\": true}});\n",
                chart.id,
                script_json(&fig["data"])?,
                script_json(&fig["layout"])?
            ));
        }
        output.push_str("</div>\n");
    }

    output.push_str(&html_footer(&dashboard.metadata));
    output.push_str("<script>\n");
    output.push_str(&scripts);
    output.push_str("</script>\n</body>\n</html>\n");

    Ok(output)
}

fn html_panel(chart: &Chart) -> String {
    let mut panel = String::new();
    panel.push_str("  <section class=\"panel\">\n");
    panel.push_str(&format!("    <h3>{}</h3>\n", escape_html(&chart.heading)));
    panel.push_str(&format!(
        "    <div id=\"{}\" class=\"chart\"></div>\n",
        chart.id
    ));
    if let Some(ref note) = chart.note {
        panel.push_str(&format!("    <p class=\"note\">{}</p>\n", escape_html(note)));
    }
    panel.push_str("  </section>\n");
    panel
}

fn html_footer(metadata: &DashboardMetadata) -> String {
    let stats = &metadata.join_stats;
    format!(
        "<footer>Generated {} from {} students, {} schools and {} teacher assignments \
         ({} students without school data, {} without teacher data).</footer>\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        stats.students,
        stats.schools,
        stats.teacher_assignments,
        stats.unmatched_school,
        stats.unmatched_teacher
    )
}

/// Generate a Markdown report of the dashboard.
pub fn generate_markdown_dashboard(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# {}\n\n", dashboard.title));
    output.push_str(&format!("{}\n\n", dashboard.subtitle));

    output.push_str(&generate_metadata_section(&dashboard.metadata));
    output.push_str(&generate_kpi_section(dashboard));

    for chart in dashboard.charts() {
        output.push_str(&generate_chart_section(chart));
    }

    output.push_str("---\n\n*Report generated by DropDash*\n");
    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &DashboardMetadata) -> String {
    let stats = &metadata.join_stats;
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Student Records:** `{}` ({} rows)\n",
        metadata.students_path, stats.students
    ));
    section.push_str(&format!(
        "- **School Info:** `{}` ({} rows)\n",
        metadata.schools_path, stats.schools
    ));
    section.push_str(&format!(
        "- **Teacher Deployment:** `{}` ({} rows)\n",
        metadata.teachers_path, stats.teacher_assignments
    ));
    if stats.unmatched_school > 0 {
        section.push_str(&format!(
            "- **Students Without School Data:** {}\n",
            stats.unmatched_school
        ));
    }
    if stats.unmatched_teacher > 0 {
        section.push_str(&format!(
            "- **Students Without Teacher Data:** {}\n",
            stats.unmatched_teacher
        ));
    }
    if stats.invalid_attendance > 0 {
        section.push_str(&format!(
            "- **Unparseable Attendance Values:** {}\n",
            stats.invalid_attendance
        ));
    }
    section.push_str(&format!(
        "- **Processing Time:** {:.2}s\n\n",
        metadata.duration_seconds
    ));

    section
}

/// Generate the KPI table.
fn generate_kpi_section(dashboard: &Dashboard) -> String {
    let mut section = String::new();

    section.push_str("## Key Metrics\n\n");
    section.push_str("| Metric | Value |\n");
    section.push_str("|:---|:---:|\n");
    for card in &dashboard.cards {
        section.push_str(&format!("| {} | {} |\n", card.label, card.display));
    }
    section.push_str(&format!(
        "| Total Students | {} |\n",
        dashboard.kpis.total_students
    ));
    section.push_str(&format!(
        "| Dropouts | {} |\n\n",
        dashboard.kpis.dropout_count
    ));

    section
}

/// Generate one chart's data as Markdown tables.
fn generate_chart_section(chart: &Chart) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", chart.heading));
    if let Some(ref title) = chart.title {
        section.push_str(&format!("*{}*\n\n", title));
    }

    match &chart.data {
        ChartData::Donut { labels, values, .. } => {
            let total: usize = values.iter().sum();
            section.push_str("| Status | Students | Share |\n");
            section.push_str("|:---|:---:|:---:|\n");
            for (label, value) in labels.iter().zip(values) {
                let share = (total > 0).then(|| *value as f64 / total as f64 * 100.0);
                section.push_str(&format!(
                    "| {} | {} | {} |\n",
                    label,
                    value,
                    format_percent(share)
                ));
            }
        }
        ChartData::LineWithErrors {
            x,
            y,
            error,
            counts,
            x_title,
            y_title,
            ..
        } => {
            section.push_str(&format!("| {} | Mean {} | ± CI95 | n |\n", x_title, y_title));
            section.push_str("|:---|:---:|:---:|:---:|\n");
            for (((label, mean), ci), n) in x.iter().zip(y).zip(error).zip(counts) {
                section.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    label,
                    format_number(Some(*mean)),
                    format_number(Some(*ci)),
                    n
                ));
            }
        }
        ChartData::BoxComparison {
            series, p_value, ..
        } => {
            section.push_str("| Group | n | Min | Q1 | Median | Q3 | Max | Mean | SD |\n");
            section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
            for s in series {
                section.push_str(&box_row(s));
            }
            section.push_str(&format!(
                "\nMann–Whitney U two-sided p-value: **{}**\n",
                format_p_value(*p_value)
            ));
        }
        ChartData::Bar {
            x, y, x_title, y_title, ..
        } => {
            section.push_str(&format!("| {} | {} |\n", x_title, y_title));
            section.push_str("|:---|:---:|\n");
            for (label, value) in x.iter().zip(y) {
                section.push_str(&format!("| {} | {} |\n", label, format_number(Some(*value))));
            }
        }
    }

    if let Some(ref note) = chart.note {
        section.push_str(&format!("\n> **Note:** {}\n", note));
    }
    section.push('\n');

    section
}

fn box_row(series: &BoxSeries) -> String {
    match series.summary {
        Some(s) => format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            series.name,
            s.count,
            format_number(Some(s.min)),
            format_number(Some(s.q1)),
            format_number(Some(s.median)),
            format_number(Some(s.q3)),
            format_number(Some(s.max)),
            format_number(Some(s.mean)),
            format_number(s.std)
        ),
        None => format!(
            "| {} | 0 | n/a | n/a | n/a | n/a | n/a | n/a | n/a |\n",
            series.name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, ReportConfig};
    use crate::loader::DatasetPaths;
    use crate::models::{DropoutStatus, WorkingRow, WorkingTable};
    use crate::report::dashboard::build_dashboard;
    use tempfile::TempDir;

    fn create_test_dashboard() -> Dashboard {
        let rows = vec![
            WorkingRow {
                school_id: "S1".to_string(),
                attendance_rate: Some(95.0),
                dropout_status: Some(DropoutStatus::Retained),
                district: Some("A <North>".to_string()),
                infrastructure_score: Some(3.0),
                avg_teacher_experience: Some(6.0),
            },
            WorkingRow {
                school_id: "S2".to_string(),
                attendance_rate: Some(60.0),
                dropout_status: Some(DropoutStatus::Dropped),
                district: Some("B".to_string()),
                infrastructure_score: Some(5.0),
                avg_teacher_experience: Some(2.0),
            },
        ];
        let table = WorkingTable {
            rows,
            ..WorkingTable::default()
        };
        build_dashboard(
            &table,
            &ReportConfig::default(),
            &DatasetPaths::from(&DataConfig::default()),
            0.5,
        )
    }

    #[test]
    fn test_generate_html_dashboard() {
        let dashboard = create_test_dashboard();
        let html = generate_html_dashboard(&dashboard, "https://cdn.example/plotly.js").unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("https://cdn.example/plotly.js"));
        assert!(html.contains("Dropout Prediction KPIs Dashboard"));
        assert!(html.contains("class=\"row row-3\""));
        assert!(html.contains("class=\"row row-2\""));
        assert_eq!(html.matches("Plotly.newPlot(").count(), 5);
        assert!(html.contains("50.00%"));
        // District labels are escaped in the markup.
        assert!(!html.contains("<North>"));
    }

    #[test]
    fn test_script_json_escapes_closing_tags() {
        let value = serde_json::json!({ "text": "</script><b>" });
        let embedded = script_json(&value).unwrap();
        assert!(!embedded.contains("</script>"));
    }

    #[test]
    fn test_generate_markdown_dashboard() {
        let dashboard = create_test_dashboard();
        let markdown = generate_markdown_dashboard(&dashboard);

        assert!(markdown.contains("# Dropout Prediction KPIs Dashboard"));
        assert!(markdown.contains("## Key Metrics"));
        assert!(markdown.contains("| Overall Dropout Rate | 50.00% |"));
        assert!(markdown.contains("## Dropout Rate by District"));
        assert!(markdown.contains("Mann–Whitney U two-sided p-value"));
    }

    #[test]
    fn test_generate_json_dashboard() {
        let dashboard = create_test_dashboard();
        let json = generate_json_dashboard(&dashboard).unwrap();

        assert!(json.contains("\"kpis\""));
        assert!(json.contains("\"overall_dropout_rate\": 50.0"));
        assert!(json.contains("\"kind\": \"box_comparison\""));

        let parsed: Dashboard = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kpis, dashboard.kpis);
    }

    #[test]
    fn test_render_and_write() {
        let dashboard = create_test_dashboard();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("board.md");

        let content = render(&dashboard, OutputFormat::Markdown, "").unwrap();
        write_dashboard(&content, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("## Metadata"));
    }
}

//! Plotly.js figure JSON for each chart kind.

use crate::models::{Chart, ChartData};
use serde_json::{json, Value};

const PRIMARY_COLOR: &str = "#1976D2";
const GRID_COLOR: &str = "#E5ECF6";

/// The `data` and `layout` objects passed to `Plotly.newPlot`.
pub fn figure(chart: &Chart) -> Value {
    let (data, mut layout) = match &chart.data {
        ChartData::Donut {
            labels,
            values,
            colors,
            hole,
        } => (
            json!([{
                "type": "pie",
                "labels": labels,
                "values": values,
                "hole": hole,
                "marker": { "colors": colors },
                "hoverinfo": "label+percent",
                "textinfo": "percent",
            }]),
            json!({
                "margin": { "t": 0, "b": 0, "l": 0, "r": 0 },
                "showlegend": true,
            }),
        ),
        ChartData::LineWithErrors {
            x,
            y,
            error,
            x_title,
            y_title,
            y_range,
            ..
        } => {
            let mut yaxis = json!({ "title": { "text": y_title } });
            if let Some((lo, hi)) = y_range {
                yaxis["range"] = json!([lo, hi]);
            }
            (
                json!([{
                    "type": "scatter",
                    "x": x,
                    "y": y,
                    "mode": "lines+markers",
                    "line": { "color": PRIMARY_COLOR, "width": 3 },
                    "error_y": {
                        "type": "data",
                        "array": error,
                        "visible": true,
                        "color": PRIMARY_COLOR,
                    },
                    "name": "Mean Infrastructure Score",
                }]),
                json!({
                    "margin": { "t": 20, "b": 30, "l": 40, "r": 20 },
                    "xaxis": { "title": { "text": x_title }, "type": "category" },
                    "yaxis": yaxis,
                    "showlegend": false,
                }),
            )
        }
        ChartData::BoxComparison {
            series, y_title, ..
        } => {
            let traces: Vec<Value> = series
                .iter()
                .map(|s| {
                    json!({
                        "type": "box",
                        "y": s.values,
                        "name": s.name,
                        "marker": { "color": s.color },
                        "boxmean": "sd",
                    })
                })
                .collect();
            (
                Value::Array(traces),
                json!({
                    "margin": { "t": 30, "b": 40, "l": 40, "r": 20 },
                    "yaxis": {
                        "title": { "text": y_title },
                        "showgrid": true,
                        "gridcolor": GRID_COLOR,
                    },
                    "plot_bgcolor": "white",
                    "showlegend": false,
                }),
            )
        }
        ChartData::Bar {
            x,
            y,
            x_title,
            y_title,
        } => (
            json!([{
                "type": "bar",
                "x": x,
                "y": y,
                "marker": { "color": PRIMARY_COLOR },
            }]),
            json!({
                "margin": { "t": 20, "b": 40, "l": 40, "r": 20 },
                "xaxis": { "title": { "text": x_title }, "type": "category" },
                "yaxis": {
                    "title": { "text": y_title },
                    "showgrid": true,
                    "gridcolor": GRID_COLOR,
                },
                "plot_bgcolor": "white",
            }),
        ),
    };

    if let Some(ref title) = chart.title {
        layout["title"] = json!({ "text": title, "font": { "size": 14 } });
    }

    json!({ "data": data, "layout": layout })
}

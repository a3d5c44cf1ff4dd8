// 📈 Chart Callback
// (table, selected years) → chart specification. Pure: no I/O, no shared mutation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::selection::YearSelection;
use crate::table::{Observation, ObservationTable};

// ============================================================================
// STATIC LABELS
// ============================================================================

pub const CHART_TITLE: &str = "Average variable energy prices for consumers in The Netherlands";
pub const X_AXIS_LABEL: &str = "Year";
pub const Y_AXIS_LABEL: &str = "value";
pub const LEGEND_TITLE: &str = "variable";
pub const TEMPLATE: &str = "simple_white";

pub const GAS_SERIES: &str = "Gas EUR per m3";
pub const ELECTRICITY_SERIES: &str = "Electricity EUR per kWh";

// ============================================================================
// CHART SPECIFICATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineShape {
    Linear,
    Spline,
}

/// One month on a series; `y` is `None` where the price is missing, which
/// the page draws as a gap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: NaiveDate,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub line_shape: LineShape,
    pub points: Vec<Point>,
}

impl Series {
    fn from_rows(name: &str, rows: &[&Observation], value: fn(&Observation) -> Option<f64>) -> Self {
        Series {
            name: name.to_string(),
            line_shape: LineShape::Spline,
            points: rows
                .iter()
                .map(|obs| Point {
                    x: obs.period,
                    y: value(obs),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub title: String,
}

/// ChartSpec - declarative line chart consumed by the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub template: String,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub legend_title: String,
    pub series: Vec<Series>,
}

/// Filter the table to the selected years and build the two-series line chart.
///
/// An empty selection gives both series with zero points.
pub fn build_chart(table: &ObservationTable, selection: &YearSelection) -> ChartSpec {
    let rows = table.filter_years(selection);

    ChartSpec {
        title: CHART_TITLE.to_string(),
        template: TEMPLATE.to_string(),
        x_axis: Axis {
            title: X_AXIS_LABEL.to_string(),
        },
        y_axis: Axis {
            title: Y_AXIS_LABEL.to_string(),
        },
        legend_title: LEGEND_TITLE.to_string(),
        series: vec![
            Series::from_rows(GAS_SERIES, &rows, |obs| obs.gas_price),
            Series::from_rows(ELECTRICITY_SERIES, &rows, |obs| obs.electricity_price),
        ],
    }
}

impl ChartSpec {
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    /// Plotly figure JSON (`data` + `layout`) for plotly.js
    pub fn to_plotly(&self) -> Value {
        let data: Vec<Value> = self
            .series
            .iter()
            .map(|series| {
                let x: Vec<String> = series.points.iter().map(|p| p.x.to_string()).collect();
                let y: Vec<Option<f64>> = series.points.iter().map(|p| p.y).collect();
                json!({
                    "type": "scatter",
                    "mode": "lines",
                    "name": series.name,
                    "legendgroup": series.name,
                    "x": x,
                    "y": y,
                    "line": { "shape": series.line_shape },
                    "connectgaps": false,
                })
            })
            .collect();

        json!({
            "data": data,
            "layout": {
                "title": { "text": self.title },
                "xaxis": axis_layout(&self.x_axis, Some("date")),
                "yaxis": axis_layout(&self.y_axis, None),
                "legend": { "title": { "text": self.legend_title } },
                "plot_bgcolor": "white",
                "paper_bgcolor": "white",
            },
        })
    }
}

/// Plain white axes with outside ticks and no grid, as in the "simple_white" template
fn axis_layout(axis: &Axis, kind: Option<&str>) -> Value {
    let mut layout = json!({
        "title": { "text": axis.title },
        "showgrid": false,
        "showline": true,
        "linecolor": "rgb(36,36,36)",
        "ticks": "outside",
        "zeroline": false,
    });
    if let Some(kind) = kind {
        layout["type"] = json!(kind);
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{observation, sample_table};
    use chrono::Datelike;

    #[test]
    fn test_points_fall_in_selected_years() {
        let table = sample_table();
        let selection = YearSelection::from_years([2019, 2021]);

        let chart = build_chart(&table, &selection);

        assert_eq!(chart.series.len(), 2);
        for series in &chart.series {
            assert_eq!(series.points.len(), 6);
            assert!(series.points.iter().all(|p| selection.contains(p.x.year())));
        }
    }

    #[test]
    fn test_single_year_selection() {
        let table = sample_table();
        let chart = build_chart(&table, &YearSelection::from_years([2020]));

        assert!(chart
            .series
            .iter()
            .flat_map(|s| s.points.iter())
            .all(|p| p.x.year() == 2020));
        assert_eq!(chart.point_count(), 6);
    }

    #[test]
    fn test_empty_selection_gives_empty_chart() {
        let table = sample_table();
        let chart = build_chart(&table, &YearSelection::empty());

        assert_eq!(chart.point_count(), 0);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.title, CHART_TITLE);
    }

    #[test]
    fn test_unknown_years_give_empty_chart() {
        let table = sample_table();
        let chart = build_chart(&table, &YearSelection::from_years([1999, 2042]));
        assert_eq!(chart.point_count(), 0);
    }

    #[test]
    fn test_build_chart_is_deterministic() {
        let table = sample_table();
        let selection = YearSelection::parse("2018,2020");

        let first = serde_json::to_string(&build_chart(&table, &selection)).unwrap();
        let second = serde_json::to_string(&build_chart(&table, &selection)).unwrap();
        assert_eq!(first, second);

        let first = build_chart(&table, &selection).to_plotly().to_string();
        let second = build_chart(&table, &selection).to_plotly().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_null_prices_keep_their_month() {
        let mut row = observation(2020, 2, 0.8, 0.22);
        row.gas_price = None;
        let table = ObservationTable::new(vec![
            observation(2020, 1, 0.7, 0.21),
            row,
            observation(2020, 3, 0.9, 0.23),
        ]);

        let chart = build_chart(&table, &YearSelection::from_years([2020]));

        assert_eq!(chart.series[0].name, GAS_SERIES);
        assert_eq!(chart.series[0].points.len(), 3);
        assert_eq!(chart.series[0].points[1].y, None);
        assert_eq!(chart.series[1].name, ELECTRICITY_SERIES);
        assert!(chart.series[1].points.iter().all(|p| p.y.is_some()));
    }

    #[test]
    fn test_null_month_is_a_gap_in_the_figure() {
        let mut row = observation(2020, 2, 0.8, 0.22);
        row.gas_price = None;
        let table = ObservationTable::new(vec![
            observation(2020, 1, 0.7, 0.21),
            row,
            observation(2020, 3, 0.9, 0.23),
        ]);

        let figure = build_chart(&table, &YearSelection::from_years([2020])).to_plotly();
        let gas = &figure["data"][0];

        assert_eq!(gas["x"], json!(["2020-01-01", "2020-02-01", "2020-03-01"]));
        assert_eq!(gas["y"], json!([0.7, null, 0.9]));
        assert_eq!(gas["connectgaps"], false);
    }

    #[test]
    fn test_series_are_spline() {
        let chart = build_chart(&sample_table(), &YearSelection::all_options());
        assert!(chart.series.iter().all(|s| s.line_shape == LineShape::Spline));
    }

    #[test]
    fn test_to_plotly_shape() {
        let table = ObservationTable::new(vec![observation(2021, 2, 0.9, 0.25)]);
        let figure = build_chart(&table, &YearSelection::from_years([2021])).to_plotly();

        assert_eq!(figure["data"].as_array().unwrap().len(), 2);
        assert_eq!(figure["data"][0]["name"], GAS_SERIES);
        assert_eq!(figure["data"][0]["line"]["shape"], "spline");
        assert_eq!(figure["data"][0]["x"][0], "2021-02-01");
        assert_eq!(figure["data"][1]["y"][0], 0.25);
        assert_eq!(figure["layout"]["xaxis"]["title"]["text"], X_AXIS_LABEL);
        assert_eq!(figure["layout"]["xaxis"]["type"], "date");
        assert_eq!(figure["layout"]["yaxis"]["showgrid"], false);
    }
}

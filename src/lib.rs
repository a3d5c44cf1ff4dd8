// Energy Prices Dashboard - Core Library
// Exposes the load → transform → chart pipeline for the CLI, the web server, and tests

pub mod cbs;        // Data Loader - CBS OData feed + offline snapshots
pub mod chart;      // Reactive callback - (table, years) → chart spec
pub mod config;
pub mod page;       // Page shell
pub mod selection;
pub mod table;
pub mod transform;  // VAT filter, annual rows out, derived prices

#[cfg(feature = "server")]
pub mod server;

use anyhow::{Context, Result};
use tracing::info;

// Re-export commonly used types
pub use cbs::{CbsClient, DatasetSource, FileSource};
pub use chart::{build_chart, ChartSpec, LineShape, Point, Series};
pub use config::DashboardConfig;
pub use selection::{YearSelection, YEAR_OPTIONS};
pub use table::{export_csv, Observation, ObservationTable, RawRecord, RawTable};
pub use transform::transform;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fetch a dataset and run the transform stage over it.
///
/// This is the single load of the process; any failure here is fatal to startup.
pub fn load_observation_table(source: &dyn DatasetSource, identifier: &str) -> Result<ObservationTable> {
    info!(dataset = identifier, source = %source.describe(), "loading dataset");

    let raw = source
        .fetch_dataset(identifier)
        .with_context(|| format!("Failed to fetch dataset {identifier}"))?;
    let table = transform(&raw).with_context(|| format!("Failed to transform dataset {identifier}"))?;

    info!(
        raw_rows = raw.len(),
        rows = table.len(),
        years = ?table.years(),
        "observation table ready"
    );

    Ok(table)
}

/// Initialise tracing with `RUST_LOG`, defaulting to `info`
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::tests::raw_row;

    struct FixtureSource(RawTable);

    impl DatasetSource for FixtureSource {
        fn fetch_dataset(&self, _identifier: &str) -> Result<RawTable> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "fixture".to_string()
        }
    }

    struct FailingSource;

    impl DatasetSource for FailingSource {
        fn fetch_dataset(&self, _identifier: &str) -> Result<RawTable> {
            anyhow::bail!("connection refused")
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn fixture() -> RawTable {
        let mut records = Vec::new();
        for year in 2018..=2021 {
            records.push(raw_row(&year.to_string(), "Including VAT", [0.2, 0.03, 0.3], [0.06, 0.02, 0.1]));
            for month in ["January", "February", "March"] {
                let period = format!("{year} {month}");
                records.push(raw_row(&period, "Including VAT", [0.2, 0.03, 0.3], [0.06, 0.02, 0.1]));
                records.push(raw_row(&period, "Excluding VAT", [0.17, 0.025, 0.25], [0.05, 0.017, 0.08]));
            }
        }
        RawTable::new(records)
    }

    #[test]
    fn test_load_pipeline_end_to_end() {
        let table = load_observation_table(&FixtureSource(fixture()), "84672ENG").unwrap();

        // 4 years × 3 months, annual and VAT-exclusive rows removed
        assert_eq!(table.len(), 12);
        assert!(table.rows().iter().all(|o| o.vat == "Including VAT"));

        let chart = build_chart(&table, &YearSelection::from_years([2020]));
        assert_eq!(chart.point_count(), 6);
        assert!(chart
            .series
            .iter()
            .flat_map(|s| &s.points)
            .all(|p| chrono::Datelike::year(&p.x) == 2020));
    }

    #[test]
    fn test_load_failure_propagates() {
        let err = load_observation_table(&FailingSource, "84672ENG").unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Failed to fetch dataset 84672ENG"));
        assert!(message.contains("connection refused"));
    }
}

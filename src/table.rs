// 📊 Observation Table
// Raw records as the CBS feed returns them, and the typed table derived from them

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

use crate::selection::YearSelection;

// ============================================================================
// RAW TABLE
// ============================================================================

/// One record from the feed: column name → value
pub type RawRecord = Map<String, Value>;

/// RawTable - ordered records, untouched apart from dimension labels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub records: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(records: Vec<RawRecord>) -> Self {
        RawTable { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names of the first record (CBS rows all share one shape)
    pub fn columns(&self) -> Vec<&str> {
        self.records
            .first()
            .map(|r| r.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// OBSERVATION
// ============================================================================

/// Observation - one monthly price record after the transform stage
///
/// Raw components are kept as delivered; `None` means the feed had a null.
/// Derived prices are `None` whenever any of their components is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Label as published, e.g. "2020 January"
    pub period_label: String,

    /// First day of the month the label names
    pub period: NaiveDate,

    /// VAT category, always "Including VAT" after filtering
    pub vat: String,

    // ------------------------------------------------------------------------
    // Gas components (EUR per m3)
    // ------------------------------------------------------------------------
    pub gas_variable_delivery_rate: Option<f64>,
    pub gas_ode_tax: Option<f64>,
    pub gas_energy_tax: Option<f64>,

    // ------------------------------------------------------------------------
    // Electricity components (EUR per kWh)
    // ------------------------------------------------------------------------
    pub electricity_variable_delivery_rate: Option<f64>,
    pub electricity_ode_tax: Option<f64>,
    pub electricity_energy_tax: Option<f64>,

    // ------------------------------------------------------------------------
    // Derived
    // ------------------------------------------------------------------------
    pub gas_price: Option<f64>,
    pub electricity_price: Option<f64>,
}

impl Observation {
    pub fn year(&self) -> i32 {
        self.period.year()
    }
}

// ============================================================================
// OBSERVATION TABLE
// ============================================================================

/// ObservationTable - loaded once, read-only afterwards
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObservationTable {
    rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(rows: Vec<Observation>) -> Self {
        ObservationTable { rows }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct years present, ascending
    pub fn years(&self) -> BTreeSet<i32> {
        self.rows.iter().map(Observation::year).collect()
    }

    /// Rows whose period year is in the selection, in table order
    pub fn filter_years<'a>(&'a self, selection: &YearSelection) -> Vec<&'a Observation> {
        self.rows
            .iter()
            .filter(|obs| selection.contains(obs.year()))
            .collect()
    }

    /// Most recent observation by period date
    pub fn latest(&self) -> Option<&Observation> {
        self.rows.iter().max_by_key(|obs| obs.period)
    }
}

/// Write the table as CSV, one row per observation. Returns rows written.
pub fn export_csv(table: &ObservationTable, path: &Path) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(path).context("Failed to create CSV file")?;

    for obs in table.rows() {
        wtr.serialize(obs).context("Failed to serialize observation")?;
    }
    wtr.flush().context("Failed to flush CSV file")?;

    Ok(table.len())
}

// 🔧 Transform Stage
// RawTable → ObservationTable: VAT filter, annual rows out, derived prices, period dates

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::table::{Observation, ObservationTable, RawRecord, RawTable};

// ============================================================================
// COLUMN NAMES (CBS 84672ENG)
// ============================================================================

pub const COL_VAT: &str = "VAT";
pub const COL_PERIOD: &str = "Period";

pub const COL_GAS_VARIABLE_DELIVERY_RATE: &str = "VariableDeliveryRate_3";
pub const COL_GAS_ODE_TAX: &str = "ODETaxEnvironmentalTaxesAct_4";
pub const COL_GAS_ENERGY_TAX: &str = "EnergyTax_5";

pub const COL_ELECTRICITY_VARIABLE_DELIVERY_RATE: &str = "VariableDeliveryRate_8";
pub const COL_ELECTRICITY_ODE_TAX: &str = "ODETaxEnvironmentalTaxesAct_9";
pub const COL_ELECTRICITY_ENERGY_TAX: &str = "EnergyTax_10";

/// VAT category kept by the filter
pub const INCLUDING_VAT: &str = "Including VAT";

/// Period labels of the full-year aggregate rows
pub const EXCLUDED_PERIODS: [&str; 4] = ["2018", "2019", "2020", "2021"];

/// Period label format: "2020 January"
pub const PERIOD_FORMAT: &str = "%Y %B";

// ============================================================================
// TRANSFORM
// ============================================================================

/// Run the full transform stage over a raw table.
///
/// Any malformed row fails the whole load.
pub fn transform(raw: &RawTable) -> Result<ObservationTable> {
    let mut rows = Vec::new();
    let mut skipped_vat = 0usize;
    let mut skipped_period = 0usize;

    for (index, record) in raw.records.iter().enumerate() {
        let vat = text_field(record, COL_VAT).with_context(|| format!("row {index}"))?;
        if vat != INCLUDING_VAT {
            skipped_vat += 1;
            continue;
        }

        let label = text_field(record, COL_PERIOD).with_context(|| format!("row {index}"))?;
        if is_excluded_period(label) {
            skipped_period += 1;
            continue;
        }

        let observation = build_observation(record, vat, label)
            .with_context(|| format!("row {index} (period '{label}')"))?;
        rows.push(observation);
    }

    debug!(
        kept = rows.len(),
        skipped_vat, skipped_period, "transformed observation table"
    );

    Ok(ObservationTable::new(rows))
}

pub fn is_excluded_period(label: &str) -> bool {
    EXCLUDED_PERIODS.contains(&label)
}

/// Parse "2020 January" into 2020-01-01
pub fn parse_period(label: &str) -> Result<NaiveDate> {
    // %B alone carries no day, so pin the first of the month
    let date = NaiveDate::parse_from_str(&format!("{label} 1"), &format!("{PERIOD_FORMAT} %d"))
        .with_context(|| format!("Invalid period '{label}', expected \"year month-name\""))?;

    // chrono's %B also takes "Jan"; only the full month name is accepted
    let month = label.split_whitespace().nth(1).unwrap_or_default();
    if !date.format("%B").to_string().eq_ignore_ascii_case(month) {
        bail!("Invalid period '{label}', expected a full month name");
    }

    Ok(date)
}

/// Sum of three components, `None` when any is missing
pub fn sum_components(a: Option<f64>, b: Option<f64>, c: Option<f64>) -> Option<f64> {
    Some(a? + b? + c?)
}

fn build_observation(record: &RawRecord, vat: &str, label: &str) -> Result<Observation> {
    let period = parse_period(label)?;

    let gas_variable_delivery_rate = number_field(record, COL_GAS_VARIABLE_DELIVERY_RATE)?;
    let gas_ode_tax = number_field(record, COL_GAS_ODE_TAX)?;
    let gas_energy_tax = number_field(record, COL_GAS_ENERGY_TAX)?;

    let electricity_variable_delivery_rate =
        number_field(record, COL_ELECTRICITY_VARIABLE_DELIVERY_RATE)?;
    let electricity_ode_tax = number_field(record, COL_ELECTRICITY_ODE_TAX)?;
    let electricity_energy_tax = number_field(record, COL_ELECTRICITY_ENERGY_TAX)?;

    Ok(Observation {
        period_label: label.to_string(),
        period,
        vat: vat.to_string(),
        gas_variable_delivery_rate,
        gas_ode_tax,
        gas_energy_tax,
        electricity_variable_delivery_rate,
        electricity_ode_tax,
        electricity_energy_tax,
        gas_price: sum_components(gas_variable_delivery_rate, gas_ode_tax, gas_energy_tax),
        electricity_price: sum_components(
            electricity_variable_delivery_rate,
            electricity_ode_tax,
            electricity_energy_tax,
        ),
    })
}

fn text_field<'a>(record: &'a RawRecord, column: &str) -> Result<&'a str> {
    match record.get(column) {
        Some(Value::String(s)) => Ok(s.trim()),
        Some(other) => bail!("Column '{column}' is not text: {other}"),
        None => bail!("Missing column '{column}'"),
    }
}

/// Numeric column; null becomes `None`, numeric strings are accepted
fn number_field(record: &RawRecord, column: &str) -> Result<Option<f64>> {
    match record.get(column) {
        None => bail!("Missing column '{column}'"),
        Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| anyhow!("Column '{column}' is out of range: {n}")),
        Some(Value::String(s)) if s.trim().is_empty() || s.trim() == "." => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .with_context(|| format!("Column '{column}' is not numeric: '{s}'")),
        Some(other) => bail!("Column '{column}' is not numeric: {other}"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn raw_row(period: &str, vat: &str, gas: [f64; 3], electricity: [f64; 3]) -> RawRecord {
        let value = json!({
            "ID": 0,
            "VAT": vat,
            "Period": period,
            "VariableDeliveryRate_3": gas[0],
            "ODETaxEnvironmentalTaxesAct_4": gas[1],
            "EnergyTax_5": gas[2],
            "VariableDeliveryRate_8": electricity[0],
            "ODETaxEnvironmentalTaxesAct_9": electricity[1],
            "EnergyTax_10": electricity[2],
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_period() {
        let date = parse_period("2020 January").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());

        let date = parse_period("2019 September").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2019, 9, 1).unwrap());
    }

    #[test]
    fn test_parse_period_rejects_malformed() {
        assert!(parse_period("2020").is_err());
        assert!(parse_period("January 2020").is_err());
        assert!(parse_period("2020 Smarch").is_err());
        assert!(parse_period("2020 jan").is_err());
        assert!(parse_period("2020 Sep").is_err());
    }

    #[test]
    fn test_parse_period_full_month_name_any_case() {
        let date = parse_period("2021 march").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
    }

    #[test]
    fn test_transform_filters_vat_and_annual_rows() {
        let raw = RawTable::new(vec![
            raw_row("2020 January", "Including VAT", [0.2, 0.3, 0.3], [0.05, 0.02, 0.1]),
            raw_row("2020 January", "Excluding VAT", [0.1, 0.2, 0.2], [0.04, 0.01, 0.08]),
            raw_row("2020", "Including VAT", [0.2, 0.3, 0.3], [0.05, 0.02, 0.1]),
            raw_row("2021 March", "Including VAT", [0.25, 0.3, 0.35], [0.06, 0.03, 0.1]),
        ]);

        let table = transform(&raw).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.rows().iter().all(|o| o.vat == INCLUDING_VAT));
        assert!(table
            .rows()
            .iter()
            .all(|o| !EXCLUDED_PERIODS.contains(&o.period_label.as_str())));
    }

    #[test]
    fn test_derived_prices_equal_component_sums() {
        let raw = RawTable::new(vec![
            raw_row("2019 May", "Including VAT", [0.21, 0.04, 0.35], [0.07, 0.03, 0.12]),
            raw_row("2019 June", "Including VAT", [0.19, 0.04, 0.35], [0.06, 0.03, 0.12]),
        ]);

        let table = transform(&raw).unwrap();

        for obs in table.rows() {
            let gas = obs.gas_variable_delivery_rate.unwrap()
                + obs.gas_ode_tax.unwrap()
                + obs.gas_energy_tax.unwrap();
            let electricity = obs.electricity_variable_delivery_rate.unwrap()
                + obs.electricity_ode_tax.unwrap()
                + obs.electricity_energy_tax.unwrap();
            assert_eq!(obs.gas_price, Some(gas));
            assert_eq!(obs.electricity_price, Some(electricity));
        }
    }

    #[test]
    fn test_null_component_gives_null_price() {
        let mut row = raw_row("2018 July", "Including VAT", [0.2, 0.3, 0.3], [0.05, 0.02, 0.1]);
        row.insert(COL_GAS_ENERGY_TAX.to_string(), Value::Null);

        let table = transform(&RawTable::new(vec![row])).unwrap();
        let obs = &table.rows()[0];

        assert_eq!(obs.gas_price, None);
        assert!(obs.electricity_price.is_some());
    }

    #[test]
    fn test_malformed_period_fails_whole_load() {
        let raw = RawTable::new(vec![
            raw_row("2020 January", "Including VAT", [0.2, 0.3, 0.3], [0.05, 0.02, 0.1]),
            raw_row("2020 Q1", "Including VAT", [0.2, 0.3, 0.3], [0.05, 0.02, 0.1]),
        ]);

        let err = transform(&raw).unwrap_err();
        assert!(format!("{err:#}").contains("2020 Q1"));
    }

    #[test]
    fn test_missing_column_fails() {
        let mut row = raw_row("2020 January", "Including VAT", [0.2, 0.3, 0.3], [0.05, 0.02, 0.1]);
        row.remove(COL_ELECTRICITY_ODE_TAX);

        let err = transform(&RawTable::new(vec![row])).unwrap_err();
        assert!(format!("{err:#}").contains(COL_ELECTRICITY_ODE_TAX));
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let mut row = raw_row("2020 January", "Including VAT", [0.2, 0.3, 0.3], [0.05, 0.02, 0.1]);
        row.insert(COL_GAS_ODE_TAX.to_string(), Value::from(" 0.5 "));

        let table = transform(&RawTable::new(vec![row])).unwrap();
        assert_eq!(table.rows()[0].gas_ode_tax, Some(0.5));
    }

    #[test]
    fn test_empty_raw_table() {
        let table = transform(&RawTable::default()).unwrap();
        assert!(table.is_empty());
    }
}

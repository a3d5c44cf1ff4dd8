use anyhow::{bail, Result};
use std::env;
use std::path::Path;

// Use library instead of local modules
use energy_prices::{
    build_chart, export_csv, init_tracing, load_observation_table, DashboardConfig, ObservationTable,
    YearSelection,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    init_tracing();

    let command = args.get(1).map(String::as_str).unwrap_or("summary");

    match command {
        "summary" => run_summary(),
        "export" => match args.get(2) {
            Some(path) => run_export(Path::new(path)),
            None => bail!("Usage: energy-prices export <file.csv>"),
        },
        "chart" => {
            let selection = args
                .get(2)
                .map(|raw| YearSelection::parse(raw))
                .unwrap_or_else(YearSelection::all_options);
            run_chart(&selection)
        }
        other => bail!("Unknown command '{other}'. Expected: summary | export <file.csv> | chart [years]"),
    }
}

fn load() -> Result<ObservationTable> {
    let cfg = DashboardConfig::from_env();
    let source = cfg.dataset_source()?;
    load_observation_table(source.as_ref(), &cfg.dataset)
}

fn run_summary() -> Result<()> {
    println!("⚡ Energy prices for consumers - CBS StatLine");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading dataset...");
    let table = load()?;
    println!("✓ Loaded {} monthly observations", table.len());

    let years = table.years();
    match (years.first(), years.last()) {
        (Some(first), Some(last)) => println!("✓ Years covered: {first} - {last}"),
        _ => println!("⚠️  No observations left after filtering"),
    }

    if let Some(latest) = table.latest() {
        println!("\n📊 Latest period: {}", latest.period_label);
        println!("   Gas:         {}", format_price(latest.gas_price, "EUR per m3"));
        println!("   Electricity: {}", format_price(latest.electricity_price, "EUR per kWh"));
    }

    Ok(())
}

fn run_export(path: &Path) -> Result<()> {
    println!("📂 Loading dataset...");
    let table = load()?;

    println!("💾 Writing {:?}...", path);
    let written = export_csv(&table, path)?;
    println!("✓ Exported {written} observations");

    Ok(())
}

fn run_chart(selection: &YearSelection) -> Result<()> {
    let table = load()?;
    let chart = build_chart(&table, selection);
    println!("{}", serde_json::to_string_pretty(&chart)?);
    Ok(())
}

fn format_price(price: Option<f64>, unit: &str) -> String {
    match price {
        Some(value) => format!("{value:.4} {unit}"),
        None => "n/a".to_string(),
    }
}

use demand_forecast::generate::{generate_store, write_store_csv, GeneratorConfig};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let output = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("data/product_demand.csv");

    println!("Synthetic Demand Data Generator");
    println!("===============================");

    let config = GeneratorConfig::default();
    let store = generate_store(&config)?;
    write_store_csv(&store, output)?;

    println!(
        "Wrote {} rows for {} products ({} to {}) to {}",
        store.len(),
        config.n_products,
        config.start_date,
        config.end_date,
        output
    );

    Ok(())
}

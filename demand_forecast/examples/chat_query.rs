use chrono::NaiveDate;
use demand_forecast::features::build_feature_table;
use demand_forecast::forecast::DemandForecaster;
use demand_forecast::generate::{generate_store, GeneratorConfig};
use demand_forecast::models::{train_model, GbdtParams};
use demand_forecast::query::{format_reply, parse_request};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Demand Forecast: Chat Query Example");
    println!("===================================\n");

    let config = GeneratorConfig {
        end_date: NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
        n_products: 5,
        ..GeneratorConfig::default()
    };
    let store = generate_store(&config)?;
    let table = build_feature_table(&store);
    let (train, validation) = table.split_by_days(30)?;

    println!("Training a small model on {} rows...\n", train.len());
    let params = GbdtParams {
        n_estimators: 60,
        early_stopping_rounds: 15,
        ..GbdtParams::default()
    };
    let artifact = train_model(&train, Some(&validation), params)?;

    let catalog = store.catalog();
    let forecaster = DemandForecaster::new(artifact, store);

    let queries = [
        "How much Coffee_Beans_Arabica will we need over the next 2 weeks?",
        "forecast p003 for 10 days",
        "what about chai latte mix?",
        "demand for the next 3 months of P002",
        "how many widgets tomorrow?",
    ];

    for query in queries {
        println!("You: {}", query);
        match parse_request(query, &catalog) {
            Some(request) => {
                let entries = forecaster.predict_for_product(&request.product_id, request.days)?;
                let name = catalog
                    .get(&request.product_id)
                    .cloned()
                    .unwrap_or_else(|| request.product_id.clone());
                println!("{}\n", format_reply(&name, request.days, &entries));
            }
            None => {
                println!("Sorry, I couldn't identify the product. Try the id (e.g. P001) or name.\n")
            }
        }
    }

    Ok(())
}

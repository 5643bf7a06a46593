use chrono::NaiveDate;
use demand_forecast::forecast::ForecastEntry;
use demand_forecast::query::{
    display_name, format_reply, parse_horizon, parse_request, DEFAULT_QUERY_DAYS,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::BTreeMap;

fn catalog() -> BTreeMap<String, String> {
    let mut catalog = BTreeMap::new();
    catalog.insert("P001".to_string(), "Coffee_Beans_Arabica".to_string());
    catalog.insert("P002".to_string(), "Chai_Latte_Mix".to_string());
    catalog.insert("P005".to_string(), "Syrup_Vanilla_SugarFree".to_string());
    catalog
}

#[rstest]
#[case("forecast 2 weeks", 14)]
#[case("next 1 month", 30)]
#[case("10 days of coffee", 10)]
#[case("45 day outlook", 45)]
#[case("6 months", 90)]
#[case("20 weeks", 90)]
#[case("no horizon here", DEFAULT_QUERY_DAYS)]
#[case("how much Chai_Latte_Mix for 3days", 3)]
fn test_parse_horizon(#[case] query: &str, #[case] expected: usize) {
    assert_eq!(parse_horizon(query), expected);
}

#[test]
fn test_request_matches_product_id() {
    let request = parse_request("p005 for 3 days", &catalog()).unwrap();
    assert_eq!(request.product_id, "P005");
    assert_eq!(request.days, 3);
}

#[test]
fn test_request_matches_spaced_name() {
    let request = parse_request("how much chai latte mix please", &catalog()).unwrap();
    assert_eq!(request.product_id, "P002");
    assert_eq!(request.days, DEFAULT_QUERY_DAYS);
}

#[test]
fn test_request_matches_underscored_name() {
    let request = parse_request("forecast Chai_Latte_Mix 2 weeks", &catalog()).unwrap();
    assert_eq!(request.product_id, "P002");
    assert_eq!(request.days, 14);
}

#[test]
fn test_request_first_match_wins() {
    let query = "coffee beans arabica then chai latte mix";
    let request = parse_request(query, &catalog()).unwrap();
    assert_eq!(request.product_id, "P001");
}

#[test]
fn test_unknown_product_yields_none() {
    assert_eq!(parse_request("how many widgets tomorrow?", &catalog()), None);
}

#[test]
fn test_single_product_catalog_is_assumed() {
    let mut catalog = BTreeMap::new();
    catalog.insert("P001".to_string(), "Coffee_Beans_Arabica".to_string());

    let request = parse_request("what does next week look like?", &catalog).unwrap();
    assert_eq!(request.product_id, "P001");
    assert_eq!(request.days, 7);
}

#[rstest]
#[case("Chai_Latte_Mix", "Chai Latte Mix")]
#[case("Honey_Local_12oz", "Honey Local 12Oz")]
#[case("Syrup_Vanilla_SugarFree", "Syrup Vanilla Sugarfree")]
#[case("coffee", "Coffee")]
fn test_display_name(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(display_name(raw), expected);
}

#[test]
fn test_format_reply_layout() {
    let entries = vec![
        ForecastEntry {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            predicted_demand: 10.0,
            price: 4.5,
        },
        ForecastEntry {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            predicted_demand: 12.0,
            price: 4.5,
        },
    ];

    let reply = format_reply("Chai_Latte_Mix", 2, &entries);
    let expected = [
        "Forecast for Chai Latte Mix over the next 2 days:",
        "  > Total Predicted Demand: 22 units.",
        "  > Daily Breakdown:",
        "    - 2024-01-01: 10 units.",
        "    - 2024-01-02: 12 units.",
    ]
    .join("\n");
    assert_eq!(reply, expected);
}

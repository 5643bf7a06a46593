//! Rule-based parsing for chat-style forecast requests
//!
//! Turns free text like "how much Chai_Latte_Mix will we sell over 2
//! weeks" into a product id and a horizon, and renders a forecast
//! sequence as a plain-text reply. The interactive surface itself lives
//! with the caller; this module is just the parsing and formatting seam.

use crate::forecast::ForecastEntry;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Longest horizon a query may request
pub const MAX_QUERY_DAYS: usize = 90;

/// Horizon used when a query names no timespan
pub const DEFAULT_QUERY_DAYS: usize = 7;

/// A parsed forecast request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRequest {
    pub product_id: String,
    pub days: usize,
}

/// Extract a product and horizon from free text.
///
/// Matching is case-insensitive. A product matches when the query
/// contains its id, its stored name, or its name with underscores read
/// as spaces; the first catalog entry that matches wins. A catalog with
/// a single product matches any query. Returns `None` when no product
/// can be identified.
pub fn parse_request(query: &str, catalog: &BTreeMap<String, String>) -> Option<ForecastRequest> {
    let lowered = query.to_lowercase();
    let days = parse_horizon(&lowered);

    let mut product_id = None;
    for (id, name) in catalog {
        let name_lower = name.to_lowercase();
        let name_spaced = name_lower.replace('_', " ");
        if lowered.contains(&name_lower)
            || lowered.contains(&name_spaced)
            || lowered.contains(&id.to_lowercase())
        {
            product_id = Some(id.clone());
            break;
        }
    }
    if product_id.is_none() && catalog.len() == 1 {
        product_id = catalog.keys().next().cloned();
    }

    product_id.map(|product_id| ForecastRequest { product_id, days })
}

fn horizon_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)\s*(day|week|month)").unwrap())
}

/// Horizon in days from phrases like "10 days", "2 weeks", "1 month".
///
/// Weeks count as 7 days and months as 30. A matched phrase is capped at
/// [`MAX_QUERY_DAYS`]; text without one falls back to [`DEFAULT_QUERY_DAYS`].
pub fn parse_horizon(query: &str) -> usize {
    let lowered = query.to_lowercase();
    let captures = match horizon_pattern().captures(&lowered) {
        Some(captures) => captures,
        None => return DEFAULT_QUERY_DAYS,
    };
    let number: u64 = match captures[1].parse() {
        Ok(number) => number,
        Err(_) => return DEFAULT_QUERY_DAYS,
    };
    let days = match &captures[2] {
        "week" => number.saturating_mul(7),
        "month" => number.saturating_mul(30),
        _ => number,
    };
    days.min(MAX_QUERY_DAYS as u64) as usize
}

/// Human-readable product name: title case with underscores as spaces
pub fn display_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut boundary = true;
    for ch in raw.chars() {
        if ch == '_' {
            out.push(' ');
            boundary = true;
        } else if ch.is_alphabetic() {
            if boundary {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            boundary = false;
        } else {
            out.push(ch);
            boundary = true;
        }
    }
    out
}

/// Plain-text reply for a forecast sequence: a header, the summed total,
/// and a per-day breakdown
pub fn format_reply(product_name: &str, days: usize, entries: &[ForecastEntry]) -> String {
    let total: f64 = entries.iter().map(|e| e.predicted_demand).sum();
    let mut lines = vec![
        format!(
            "Forecast for {} over the next {} days:",
            display_name(product_name),
            days
        ),
        format!("  > Total Predicted Demand: {:.0} units.", total),
        "  > Daily Breakdown:".to_string(),
    ];
    for entry in entries {
        lines.push(format!(
            "    - {}: {:.0} units.",
            entry.date, entry.predicted_demand
        ));
    }
    lines.join("\n")
}

//! Produce analytics over the ledger
//!
//! Aggregates per crop, per farmer and per block. Quantities and prices are
//! free text on the ledger, so they are parsed leniently: the longest numeric
//! prefix counts and anything unparseable is zero.

use crate::blockchain::{Block, TIMESTAMP_FORMAT};
use serde::Serialize;
use std::collections::HashMap;

/// Integer prefix of `raw` (`"100kg"` is 100, `"abc"` is 0).
pub fn parse_quantity(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

/// Decimal prefix of `raw` (`"20.5/kg"` is 20.5, `"n/a"` is 0).
pub fn parse_price(raw: &str) -> f64 {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return 0.0;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Quantity times price for one block.
pub fn block_value(block: &Block) -> f64 {
    parse_quantity(&block.quantity) as f64 * parse_price(&block.price)
}

/// Date part of a ledger timestamp, or the raw string when it is not one of
/// the known layouts.
pub fn date_label(timestamp: &str) -> String {
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT) {
        return dt.format("%-m/%-d/%Y").to_string();
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(timestamp) {
        return dt.format("%-m/%-d/%Y").to_string();
    }
    timestamp.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropSummary {
    pub name: String,
    pub quantity: i64,
    pub value: f64,
    pub blocks: usize,
    pub avg_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerSummary {
    pub name: String,
    pub total_quantity: i64,
    pub total_value: f64,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePoint {
    pub block_index: usize,
    pub quantity: i64,
    pub price: f64,
    pub value: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_blocks: usize,
    pub total_quantity: i64,
    pub total_value: f64,
    pub unique_crops: usize,
    pub unique_farmers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub summary: Summary,
    pub crop_analytics: Vec<CropSummary>,
    pub farmer_analytics: Vec<FarmerSummary>,
    pub time_series_data: Vec<TimePoint>,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analytics {
    pub crops: Vec<CropSummary>,
    pub farmers: Vec<FarmerSummary>,
    pub time_series: Vec<TimePoint>,
}

impl Analytics {
    /// Aggregate `blocks`. Crops and farmers keep first-seen order; quantity
    /// totals saturate at `i64::MAX`.
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut crops: Vec<CropSummary> = Vec::new();
        let mut crop_index: HashMap<&str, usize> = HashMap::new();
        let mut farmers: Vec<FarmerSummary> = Vec::new();
        let mut farmer_index: HashMap<&str, usize> = HashMap::new();
        let mut time_series = Vec::with_capacity(blocks.len());

        for (position, block) in blocks.iter().enumerate() {
            let quantity = parse_quantity(&block.quantity);
            let price = parse_price(&block.price);
            let value = quantity as f64 * price;

            let slot = *crop_index.entry(block.crop.as_str()).or_insert_with(|| {
                crops.push(CropSummary {
                    name: block.crop.clone(),
                    quantity: 0,
                    value: 0.0,
                    blocks: 0,
                    avg_price: 0.0,
                });
                crops.len() - 1
            });
            let crop = &mut crops[slot];
            crop.quantity = crop.quantity.saturating_add(quantity);
            crop.value += value;
            crop.blocks += 1;

            let slot = *farmer_index.entry(block.farmer.as_str()).or_insert_with(|| {
                farmers.push(FarmerSummary {
                    name: block.farmer.clone(),
                    total_quantity: 0,
                    total_value: 0.0,
                    transactions: 0,
                });
                farmers.len() - 1
            });
            let farmer = &mut farmers[slot];
            farmer.total_quantity = farmer.total_quantity.saturating_add(quantity);
            farmer.total_value += value;
            farmer.transactions += 1;

            time_series.push(TimePoint {
                block_index: position,
                quantity,
                price,
                value,
                timestamp: date_label(&block.timestamp),
            });
        }

        for crop in &mut crops {
            crop.avg_price = if crop.quantity > 0 {
                (crop.value / crop.quantity as f64 * 100.0).round() / 100.0
            } else {
                0.0
            };
        }

        Analytics {
            crops,
            farmers,
            time_series,
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            total_blocks: self.time_series.len(),
            total_quantity: self
                .crops
                .iter()
                .fold(0i64, |acc, c| acc.saturating_add(c.quantity)),
            total_value: self.crops.iter().map(|c| c.value).sum(),
            unique_crops: self.crops.len(),
            unique_farmers: self.farmers.len(),
        }
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            summary: self.summary(),
            crop_analytics: self.crops.clone(),
            farmer_analytics: self.farmers.clone(),
            time_series_data: self.time_series.clone(),
            generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{BlockFields, DigestPolicy, Ledger};

    fn sample() -> Ledger {
        let mut ledger = Ledger::new(DigestPolicy::Sha256);
        for (farmer, crop, qty, price) in [
            ("Ravi", "Wheat", "100", "20"),
            ("Asha", "Rice", "50", "30.5"),
            ("Ravi", "Wheat", "25kg", "22"),
            ("Meena", "Rice", "lots", "40"),
        ] {
            ledger
                .append_with_timestamp(
                    BlockFields::new(farmer, crop, qty, price),
                    "10/16/2026, 9:15:00 AM",
                )
                .unwrap();
        }
        ledger
    }

    #[test]
    fn test_parse_quantity_prefix_semantics() {
        assert_eq!(parse_quantity("100"), 100);
        assert_eq!(parse_quantity("  42 crates"), 42);
        assert_eq!(parse_quantity("12.9"), 12);
        assert_eq!(parse_quantity("-7"), -7);
        assert_eq!(parse_quantity("abc"), 0);
        assert_eq!(parse_quantity(""), 0);
    }

    #[test]
    fn test_parse_price_prefix_semantics() {
        assert_eq!(parse_price("20"), 20.0);
        assert_eq!(parse_price("30.5/kg"), 30.5);
        assert_eq!(parse_price(".5"), 0.5);
        assert_eq!(parse_price("1e2"), 100.0);
        assert_eq!(parse_price("2e"), 2.0);
        assert_eq!(parse_price("n/a"), 0.0);
        assert_eq!(parse_price("-"), 0.0);
    }

    #[test]
    fn test_crop_aggregation() {
        let analytics = Analytics::from_blocks(sample().blocks());
        let names: Vec<&str> = analytics.crops.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Wheat", "Rice"]);

        let wheat = &analytics.crops[0];
        assert_eq!(wheat.quantity, 125);
        assert_eq!(wheat.value, 2550.0);
        assert_eq!(wheat.blocks, 2);
        assert_eq!(wheat.avg_price, 20.4);

        let rice = &analytics.crops[1];
        assert_eq!(rice.quantity, 50);
        assert_eq!(rice.value, 1525.0);
        assert_eq!(rice.blocks, 2);
    }

    #[test]
    fn test_farmer_aggregation() {
        let analytics = Analytics::from_blocks(sample().blocks());
        assert_eq!(analytics.farmers.len(), 3);
        let ravi = &analytics.farmers[0];
        assert_eq!(ravi.name, "Ravi");
        assert_eq!(ravi.total_quantity, 125);
        assert_eq!(ravi.transactions, 2);
        let meena = &analytics.farmers[2];
        assert_eq!(meena.total_value, 0.0);
    }

    #[test]
    fn test_summary_and_time_series() {
        let analytics = Analytics::from_blocks(sample().blocks());
        let summary = analytics.summary();
        assert_eq!(summary.total_blocks, 4);
        assert_eq!(summary.total_quantity, 175);
        assert_eq!(summary.total_value, 4075.0);
        assert_eq!(summary.unique_crops, 2);
        assert_eq!(summary.unique_farmers, 3);

        assert_eq!(analytics.time_series[1].block_index, 1);
        assert_eq!(analytics.time_series[1].timestamp, "10/16/2026");
    }

    #[test]
    fn test_snapshot_keys() {
        let snapshot = Analytics::from_blocks(sample().blocks()).snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();
        for key in ["summary", "cropAnalytics", "farmerAnalytics", "timeSeriesData", "generatedAt"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["summary"]["uniqueFarmers"], 3);
        assert_eq!(json["cropAnalytics"][0]["avgPrice"], 20.4);
    }

    #[test]
    fn test_huge_quantities_saturate() {
        let mut ledger = Ledger::new(DigestPolicy::Sha256);
        for (crop, qty) in [("Wheat", "9223372036854775807"), ("Wheat", "1"), ("Rice", "5")] {
            ledger
                .append(BlockFields::new("Ravi", crop, qty, "1"))
                .unwrap();
        }

        let analytics = Analytics::from_blocks(ledger.blocks());
        assert_eq!(analytics.crops[0].quantity, i64::MAX);
        assert_eq!(analytics.farmers[0].total_quantity, i64::MAX);
        assert_eq!(analytics.summary().total_quantity, i64::MAX);
    }

    #[test]
    fn test_empty_ledger() {
        let analytics = Analytics::from_blocks(&[]);
        assert_eq!(analytics.summary().total_blocks, 0);
        assert!(analytics.crops.is_empty());
    }

    #[test]
    fn test_date_label_fallback() {
        assert_eq!(date_label("2026-10-16T09:00:00Z"), "10/16/2026");
        assert_eq!(date_label("yesterday"), "yesterday");
    }
}

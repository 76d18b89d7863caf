//! Ledger and analytics export
//!
//! Exports are pure: they read a block slice and return a string.

use crate::analytics::{block_value, Analytics};
use crate::blockchain::Block;
use crate::error::ChainError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "₹";

/// How CSV fields are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvMode {
    /// RFC 4180: fields holding a comma, quote, CR or LF are quoted.
    #[default]
    Standard,
    /// Fields joined verbatim, byte-compatible with the browser export.
    Legacy,
}

impl std::str::FromStr for CsvMode {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(CsvMode::Standard),
            "legacy" => Ok(CsvMode::Legacy),
            other => Err(ChainError::ConfigError(format!(
                "Unknown CSV mode '{}' (expected 'standard' or 'legacy')",
                other
            ))),
        }
    }
}

/// Pretty-printed JSON array of blocks.
pub fn ledger_json(blocks: &[Block]) -> Result<String, ChainError> {
    Ok(serde_json::to_string_pretty(blocks)?)
}

/// Pretty-printed analytics snapshot.
pub fn analytics_json(blocks: &[Block]) -> Result<String, ChainError> {
    let snapshot = Analytics::from_blocks(blocks).snapshot();
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

fn csv_field(raw: &str, mode: CsvMode) -> String {
    match mode {
        CsvMode::Legacy => raw.to_string(),
        CsvMode::Standard => {
            if raw.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
                format!("\"{}\"", raw.replace('"', "\"\""))
            } else {
                raw.to_string()
            }
        }
    }
}

/// One header row plus one row per block, rows separated by `\n`.
pub fn ledger_csv(blocks: &[Block], mode: CsvMode, currency: &str) -> String {
    let header = [
        "Block Index".to_string(),
        "Farmer".to_string(),
        "Crop".to_string(),
        "Quantity (kg)".to_string(),
        format!("Price ({}/kg)", currency),
        format!("Total Value ({})", currency),
        "Timestamp".to_string(),
    ];

    let mut rows = Vec::with_capacity(blocks.len() + 1);
    rows.push(
        header
            .iter()
            .map(|h| csv_field(h, mode))
            .collect::<Vec<_>>()
            .join(","),
    );

    for (position, block) in blocks.iter().enumerate() {
        let fields = [
            position.to_string(),
            block.farmer.clone(),
            block.crop.clone(),
            block.quantity.clone(),
            block.price.clone(),
            block_value(block).to_string(),
            block.timestamp.clone(),
        ];
        rows.push(
            fields
                .iter()
                .map(|f| csv_field(f, mode))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    rows.join("\n")
}

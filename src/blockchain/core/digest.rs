//! Block content fingerprints.
//!
//! Both policies digest the same canonical serialization: compact JSON with
//! the keys `farmer, crop, quantity, price, notes, index, timestamp,
//! prevHash, hash` in that order and `hash` set to the empty string.
//!
//! Neither policy is tamper-proof. `Legacy` reproduces the browser ledger's
//! fingerprint (base64 truncated to 20 characters), which only covers the
//! first 15 bytes of the JSON. `Sha256` covers the whole body.
//!
//! The browser encodes one byte per character, so `Legacy` does the same for
//! bodies made only of Latin-1 characters. A body with anything above U+00FF
//! never came from the browser and is encoded as UTF-8 instead.

use crate::blockchain::core::chain::Block;
use crate::error::ChainError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Cow;

/// Number of base64 characters kept by the legacy fingerprint.
pub const LEGACY_DIGEST_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestPolicy {
    Legacy,
    #[default]
    Sha256,
}

impl DigestPolicy {
    pub fn digest(&self, content: &str) -> String {
        match self {
            DigestPolicy::Legacy => {
                let mut encoded = STANDARD.encode(latin1_bytes(content));
                encoded.truncate(LEGACY_DIGEST_LEN);
                encoded
            }
            DigestPolicy::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(content.as_bytes());
                hex::encode(hasher.finalize())
            }
        }
    }

    /// Digest a block's canonical body, ignoring whatever is stored in `hash`.
    pub fn block_hash(&self, block: &Block) -> String {
        self.digest(&canonical_body(block))
    }
}

impl std::str::FromStr for DigestPolicy {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(DigestPolicy::Legacy),
            "sha256" => Ok(DigestPolicy::Sha256),
            other => Err(ChainError::ConfigError(format!(
                "Unknown digest policy '{}' (expected 'legacy' or 'sha256')",
                other
            ))),
        }
    }
}

fn latin1_bytes(content: &str) -> Cow<'_, [u8]> {
    if content.chars().all(|c| (c as u32) <= 0xFF) {
        Cow::Owned(content.chars().map(|c| c as u8).collect())
    } else {
        Cow::Borrowed(content.as_bytes())
    }
}

#[derive(Serialize)]
struct CanonicalBody<'a> {
    farmer: &'a str,
    crop: &'a str,
    quantity: &'a str,
    price: &'a str,
    notes: &'a str,
    index: u64,
    timestamp: &'a str,
    #[serde(rename = "prevHash")]
    prev_hash: &'a str,
    hash: &'a str,
}

/// Compact JSON of the block with `hash` cleared.
pub fn canonical_body(block: &Block) -> String {
    let body = CanonicalBody {
        farmer: &block.farmer,
        crop: &block.crop,
        quantity: &block.quantity,
        price: &block.price,
        notes: &block.notes,
        index: block.index,
        timestamp: &block.timestamp,
        prev_hash: &block.prev_hash,
        hash: "",
    };
    // A struct of strings and an integer always serializes.
    serde_json::to_string(&body).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ravi_block() -> Block {
        Block {
            index: 0,
            timestamp: "10/16/2026, 9:00:00 AM".to_string(),
            farmer: "Ravi".to_string(),
            crop: "Wheat".to_string(),
            quantity: "100".to_string(),
            price: "20".to_string(),
            notes: String::new(),
            prev_hash: "0".to_string(),
            hash: "whatever".to_string(),
        }
    }

    #[test]
    fn test_canonical_body_layout() {
        assert_eq!(
            canonical_body(&ravi_block()),
            r#"{"farmer":"Ravi","crop":"Wheat","quantity":"100","price":"20","notes":"","index":0,"timestamp":"10/16/2026, 9:00:00 AM","prevHash":"0","hash":""}"#
        );
    }

    #[test]
    fn test_legacy_known_answer() {
        let hash = DigestPolicy::Legacy.block_hash(&ravi_block());
        assert_eq!(hash, "eyJmYXJtZXIiOiJSYXZp");
        assert_eq!(hash.len(), LEGACY_DIGEST_LEN);
    }

    #[test]
    fn test_legacy_encodes_latin1_as_single_bytes() {
        let mut block = ravi_block();
        block.farmer = "José".to_string();
        assert_eq!(DigestPolicy::Legacy.block_hash(&block), "eyJmYXJtZXIiOiJKb3Pp");

        block.farmer = "Müller".to_string();
        assert_eq!(DigestPolicy::Legacy.block_hash(&block), "eyJmYXJtZXIiOiJN/Gxs");
    }

    #[test]
    fn test_legacy_falls_back_to_utf8_above_latin1() {
        let mut block = ravi_block();
        block.farmer = "राम".to_string();
        assert_eq!(DigestPolicy::Legacy.block_hash(&block), "eyJmYXJtZXIiOiLgpLDg");
    }

    #[test]
    fn test_sha256_known_answer() {
        assert_eq!(
            DigestPolicy::Sha256.block_hash(&ravi_block()),
            "424e1b7535a2d23c44a90dc49068d7b6f3753fe7490d8c85d74d90c81ecf60a5"
        );
    }

    #[test]
    fn test_stored_hash_is_ignored() {
        let mut block = ravi_block();
        let before = DigestPolicy::Sha256.block_hash(&block);
        block.hash = "tampered".to_string();
        assert_eq!(before, DigestPolicy::Sha256.block_hash(&block));
    }

    #[test]
    fn test_legacy_only_sees_leading_bytes() {
        let mut other = ravi_block();
        other.crop = "Rice".to_string();
        other.quantity = "5".to_string();
        assert_eq!(
            DigestPolicy::Legacy.block_hash(&ravi_block()),
            DigestPolicy::Legacy.block_hash(&other)
        );
        assert_ne!(
            DigestPolicy::Sha256.block_hash(&ravi_block()),
            DigestPolicy::Sha256.block_hash(&other)
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("legacy".parse::<DigestPolicy>(), Ok(DigestPolicy::Legacy));
        assert_eq!(" SHA256 ".parse::<DigestPolicy>(), Ok(DigestPolicy::Sha256));
        assert!("md5".parse::<DigestPolicy>().is_err());
    }
}

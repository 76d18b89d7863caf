use crate::blockchain::core::digest::DigestPolicy;
use crate::blockchain::core::validation::{verify_block, verify_chain, BlockVerification, ChainReport};
use crate::error::ChainError;
use crate::export::{self, CsvMode};
use crate::persistence::{InMemoryPersistence, Persistence};
use serde::{Deserialize, Serialize};

/// Storage key the browser ledger used; kept so exported state stays compatible.
pub const DEFAULT_STORAGE_KEY: &str = "agrichain";

/// `prevHash` of the first block.
pub const GENESIS_PREV_HASH: &str = "0";

/// Timestamp layout matching `Date::toLocaleString()` in an en-US locale.
pub const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: String,
    pub farmer: String,
    pub crop: String,
    pub quantity: String,
    pub price: String,
    pub notes: String,
    #[serde(rename = "prevHash")]
    pub prev_hash: String,
    pub hash: String,
}

impl Block {
    /// First 8 characters of the hash, for display.
    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(8)
            .map_or(self.hash.len(), |(i, _)| i);
        &self.hash[..end]
    }
}

/// The user-supplied part of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFields {
    pub farmer: String,
    pub crop: String,
    pub quantity: String,
    pub price: String,
    #[serde(default)]
    pub notes: String,
}

impl BlockFields {
    pub fn new(
        farmer: impl Into<String>,
        crop: impl Into<String>,
        quantity: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        BlockFields {
            farmer: farmer.into(),
            crop: crop.into(),
            quantity: quantity.into(),
            price: price.into(),
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Reject records with a blank farmer, crop, quantity or price.
    pub fn validate_required(&self) -> Result<(), ChainError> {
        let missing: Vec<&str> = [
            ("farmer", &self.farmer),
            ("crop", &self.crop),
            ("quantity", &self.quantity),
            ("price", &self.price),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ChainError::InvalidInput(format!(
                "Missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

/// Append-only produce ledger backed by a single storage entry.
pub struct Ledger {
    blocks: Vec<Block>,
    policy: DigestPolicy,
    storage_key: String,
    persistence: Box<dyn Persistence>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("blocks", &self.blocks.len())
            .field("policy", &self.policy)
            .field("storage_key", &self.storage_key)
            .finish()
    }
}

impl Ledger {
    /// Create an empty ledger using an in-memory persistence backend.
    pub fn new(policy: DigestPolicy) -> Self {
        Ledger {
            blocks: Vec::new(),
            policy,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            persistence: Box::new(InMemoryPersistence::new()),
        }
    }

    /// Restore the ledger from `persistence` under the default key.
    pub fn load(persistence: Box<dyn Persistence>, policy: DigestPolicy) -> Result<Self, ChainError> {
        Self::load_with_key(persistence, policy, DEFAULT_STORAGE_KEY)
    }

    /// Restore the ledger stored under `key`.
    ///
    /// Missing or unparseable state yields an empty ledger. Only a failing
    /// backend is reported as an error.
    pub fn load_with_key(
        persistence: Box<dyn Persistence>,
        policy: DigestPolicy,
        key: &str,
    ) -> Result<Self, ChainError> {
        let blocks = match persistence.read(key)? {
            None => {
                log::debug!("no persisted ledger under '{}', starting empty", key);
                Vec::new()
            }
            Some(raw) => match serde_json::from_str::<Vec<Block>>(&raw) {
                Ok(blocks) => {
                    log::debug!("restored {} block(s) from '{}'", blocks.len(), key);
                    blocks
                }
                Err(e) => {
                    log::warn!("Error parsing stored ledger under '{}': {}; starting empty", key, e);
                    Vec::new()
                }
            },
        };

        Ok(Ledger {
            blocks,
            policy,
            storage_key: key.to_string(),
            persistence,
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn digest_policy(&self) -> DigestPolicy {
        self.policy
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Append a new block stamped with the current local time.
    pub fn append(&mut self, fields: BlockFields) -> Result<Block, ChainError> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.append_with_timestamp(fields, timestamp)
    }

    /// Append a new block with a caller-supplied timestamp.
    ///
    /// The full ledger is persisted before the in-memory list grows, so a
    /// storage failure leaves the ledger unchanged.
    pub fn append_with_timestamp(
        &mut self,
        fields: BlockFields,
        timestamp: impl Into<String>,
    ) -> Result<Block, ChainError> {
        let prev_hash = self
            .blocks
            .last()
            .map(|b| b.hash.clone())
            .unwrap_or_else(|| GENESIS_PREV_HASH.to_string());

        let mut block = Block {
            index: self.blocks.len() as u64,
            timestamp: timestamp.into(),
            farmer: fields.farmer,
            crop: fields.crop,
            quantity: fields.quantity,
            price: fields.price,
            notes: fields.notes,
            prev_hash,
            hash: String::new(),
        };
        block.hash = self.policy.block_hash(&block);

        let mut updated = Vec::with_capacity(self.blocks.len() + 1);
        updated.extend_from_slice(&self.blocks);
        updated.push(block.clone());
        self.persist(&updated)?;
        self.blocks = updated;

        log::debug!("appended block #{} ({})", block.index, block.hash);
        Ok(block)
    }

    /// Drop every block and remove the persisted entry.
    pub fn clear(&mut self) -> Result<(), ChainError> {
        self.persistence.remove(&self.storage_key)?;
        let dropped = self.blocks.len();
        self.blocks.clear();
        log::debug!("cleared ledger ({} block(s) removed)", dropped);
        Ok(())
    }

    pub fn verify(&self) -> ChainReport {
        verify_chain(&self.blocks, self.policy)
    }

    pub fn verify_block(
        &self,
        index: usize,
        expected_hash: Option<&str>,
    ) -> Result<BlockVerification, ChainError> {
        verify_block(&self.blocks, index, expected_hash, self.policy)
    }

    /// Pretty-printed JSON array of every block.
    pub fn export_json(&self) -> Result<String, ChainError> {
        export::ledger_json(&self.blocks)
    }

    pub fn export_csv(&self, mode: CsvMode, currency: &str) -> String {
        export::ledger_csv(&self.blocks, mode, currency)
    }

    fn persist(&self, blocks: &[Block]) -> Result<(), ChainError> {
        let json = serde_json::to_string(blocks)?;
        self.persistence.write(&self.storage_key, &json)
    }
}

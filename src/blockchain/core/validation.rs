use crate::blockchain::core::chain::{Block, GENESIS_PREV_HASH};
use crate::blockchain::core::digest::DigestPolicy;
use crate::error::ChainError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReport {
    pub index: usize,
    pub hash_valid: bool,
    pub prev_hash_valid: bool,
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    /// Nothing to verify.
    Empty,
    Valid,
    Compromised,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    pub valid: bool,
    pub per_block: Vec<BlockReport>,
}

impl ChainReport {
    pub fn status(&self) -> ChainStatus {
        if self.per_block.is_empty() {
            ChainStatus::Empty
        } else if self.valid {
            ChainStatus::Valid
        } else {
            ChainStatus::Compromised
        }
    }

    pub fn invalid_blocks(&self) -> Vec<usize> {
        self.per_block
            .iter()
            .filter(|r| !r.valid)
            .map(|r| r.index)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockVerification {
    pub index: usize,
    pub hash_valid: bool,
    pub prev_hash_valid: bool,
    /// `None` when no expected hash was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_match: Option<bool>,
    pub valid: bool,
}

fn expected_prev_hash(blocks: &[Block], index: usize) -> &str {
    if index == 0 {
        GENESIS_PREV_HASH
    } else {
        &blocks[index - 1].hash
    }
}

fn check(blocks: &[Block], index: usize, policy: DigestPolicy) -> (bool, bool) {
    let block = &blocks[index];
    let hash_valid = policy.block_hash(block) == block.hash;
    let prev_hash_valid = block.prev_hash == expected_prev_hash(blocks, index);
    (hash_valid, prev_hash_valid)
}

/// Recompute every digest and link. Never fails; an empty slice reports
/// `valid` with `ChainStatus::Empty`.
pub fn verify_chain(blocks: &[Block], policy: DigestPolicy) -> ChainReport {
    let per_block: Vec<BlockReport> = (0..blocks.len())
        .map(|index| {
            let (hash_valid, prev_hash_valid) = check(blocks, index, policy);
            BlockReport {
                index,
                hash_valid,
                prev_hash_valid,
                valid: hash_valid && prev_hash_valid,
            }
        })
        .collect();

    let valid = per_block.iter().all(|r| r.valid);
    if !valid {
        log::warn!(
            "ledger verification failed for {} of {} block(s)",
            per_block.iter().filter(|r| !r.valid).count(),
            per_block.len()
        );
    }

    ChainReport { valid, per_block }
}

/// Verify the block at `index`, optionally against a hash the caller expects.
pub fn verify_block(
    blocks: &[Block],
    index: usize,
    expected_hash: Option<&str>,
    policy: DigestPolicy,
) -> Result<BlockVerification, ChainError> {
    if index >= blocks.len() {
        return Err(ChainError::InvalidIndex {
            index,
            len: blocks.len(),
        });
    }

    let (hash_valid, prev_hash_valid) = check(blocks, index, policy);
    let expected_match = expected_hash
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| blocks[index].hash == h);

    Ok(BlockVerification {
        index,
        hash_valid,
        prev_hash_valid,
        expected_match,
        valid: hash_valid && prev_hash_valid && expected_match.unwrap_or(true),
    })
}

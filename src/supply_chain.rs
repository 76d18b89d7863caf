//! Supply chain tracking events and smart contract records
//!
//! Neither lives in its own store: each event or contract state change is
//! written to the ledger as an ordinary block, and the returned record is for
//! the caller to keep.

use crate::blockchain::{Block, BlockFields, Ledger};
use crate::error::ChainError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Farmer name used for blocks written on behalf of contracts.
pub const CONTRACT_SYSTEM: &str = "Smart Contract System";

const RECORD_ID_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Short lowercase base-36 identifier for events and contracts.
pub fn new_record_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..RECORD_ID_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
    Origin,
    #[default]
    Transit,
    Storage,
    Processing,
    Delivered,
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TrackingStatus::Origin => "origin",
            TrackingStatus::Transit => "transit",
            TrackingStatus::Storage => "storage",
            TrackingStatus::Processing => "processing",
            TrackingStatus::Delivered => "delivered",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QualityGrade {
    #[default]
    A,
    B,
    C,
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            QualityGrade::A => "A",
            QualityGrade::B => "B",
            QualityGrade::C => "C",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub id: String,
    pub block_index: usize,
    pub timestamp: String,
    pub location: String,
    pub status: TrackingStatus,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub quality: QualityGrade,
    pub handler: String,
    pub notes: String,
}

impl TrackingEvent {
    fn ledger_notes(&self) -> String {
        let mut notes = format!(
            "Supply Chain Event: {} at {}. Quality: {}.",
            self.status, self.location, self.quality
        );
        if !self.notes.trim().is_empty() {
            notes.push_str(&format!(" Notes: {}", self.notes.trim()));
        }
        notes
    }
}

/// Input for [`record_tracking_event`].
#[derive(Debug, Clone, Default)]
pub struct NewTrackingEvent {
    pub block_index: usize,
    pub location: String,
    pub status: TrackingStatus,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub quality: QualityGrade,
    pub handler: String,
    pub notes: String,
}

/// Record a shipment event against the block at `event.block_index`.
///
/// The new block is attributed to the handler and repeats the referenced
/// block's quantity and price.
pub fn record_tracking_event(
    ledger: &mut Ledger,
    event: NewTrackingEvent,
) -> Result<(TrackingEvent, Block), ChainError> {
    let source = ledger
        .get(event.block_index)
        .cloned()
        .ok_or(ChainError::InvalidIndex {
            index: event.block_index,
            len: ledger.len(),
        })?;

    if event.location.trim().is_empty() || event.handler.trim().is_empty() {
        return Err(ChainError::InvalidInput(
            "Tracking events need a location and a handler".to_string(),
        ));
    }

    let record = TrackingEvent {
        id: new_record_id(&mut rand::thread_rng()),
        block_index: event.block_index,
        timestamp: chrono::Utc::now().to_rfc3339(),
        location: event.location.trim().to_string(),
        status: event.status,
        temperature: event.temperature,
        humidity: event.humidity,
        quality: event.quality,
        handler: event.handler.trim().to_string(),
        notes: event.notes,
    };

    let fields = BlockFields::new(
        record.handler.clone(),
        format!("{} - Tracking", source.crop),
        source.quantity.clone(),
        source.price.clone(),
    )
    .with_notes(record.ledger_notes());

    let block = ledger.append(fields)?;
    log::info!(
        "{} event recorded for block #{} as block #{}",
        record.status,
        record.block_index,
        block.index
    );
    Ok((record, block))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    #[default]
    SupplyChain,
    QualityAssurance,
    Payment,
    Insurance,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ContractKind::SupplyChain => "supply_chain",
            ContractKind::QualityAssurance => "quality_assurance",
            ContractKind::Payment => "payment",
            ContractKind::Insurance => "insurance",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Breached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContractKind,
    pub parties: Vec<String>,
    pub terms: String,
    pub conditions: Vec<String>,
    pub status: ContractStatus,
    pub created: String,
}

/// Input for [`create_contract`]. `parties` is comma separated and
/// `conditions` newline separated, as typed into a form.
#[derive(Debug, Clone, Default)]
pub struct NewContract {
    pub kind: ContractKind,
    pub parties: String,
    pub terms: String,
    pub conditions: String,
}

pub fn create_contract(ledger: &mut Ledger, input: NewContract) -> Result<(Contract, Block), ChainError> {
    let parties: Vec<String> = input
        .parties
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if parties.is_empty() || input.terms.trim().is_empty() {
        return Err(ChainError::InvalidInput(
            "Contracts need at least one party and terms".to_string(),
        ));
    }

    let contract = Contract {
        id: new_record_id(&mut rand::thread_rng()),
        kind: input.kind,
        parties,
        terms: input.terms.trim().to_string(),
        conditions: input
            .conditions
            .lines()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        status: ContractStatus::Pending,
        created: chrono::Utc::now().to_rfc3339(),
    };

    let fields = BlockFields::new(CONTRACT_SYSTEM, "Contract Created", "1", "0").with_notes(format!(
        "Contract ID: {} | Type: {} | Parties: {}",
        contract.id,
        contract.kind,
        contract.parties.join(", ")
    ));
    let block = ledger.append(fields)?;
    Ok((contract, block))
}

/// Mark `contract` active and record the execution on the ledger.
pub fn execute_contract(ledger: &mut Ledger, contract: &mut Contract) -> Result<Block, ChainError> {
    let block = execute_contract_by_id(ledger, &contract.id)?;
    contract.status = ContractStatus::Active;
    Ok(block)
}

/// Record the execution of a contract known only by id. The ledger must hold
/// its creation block and no earlier execution block.
pub fn execute_contract_by_id(ledger: &mut Ledger, id: &str) -> Result<Block, ChainError> {
    let created_marker = format!("Contract ID: {} |", id);
    let executed_notes = format!("Contract {} has been executed and is now active.", id);

    let mut created = false;
    let mut executed = false;
    for block in ledger.blocks().iter().filter(|b| b.farmer == CONTRACT_SYSTEM) {
        created |= block.crop == "Contract Created" && block.notes.starts_with(&created_marker);
        executed |= block.crop == "Contract Executed" && block.notes == executed_notes;
    }

    if !created {
        return Err(ChainError::InvalidInput(format!("Unknown contract '{}'", id)));
    }
    if executed {
        return Err(ChainError::InvalidInput(format!(
            "Contract '{}' has already been executed",
            id
        )));
    }

    let fields = BlockFields::new(CONTRACT_SYSTEM, "Contract Executed", "1", "0").with_notes(executed_notes);
    ledger.append(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::DigestPolicy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ledger_with_harvest() -> Ledger {
        let mut ledger = Ledger::new(DigestPolicy::Sha256);
        ledger
            .append(BlockFields::new("Ravi", "Wheat", "100", "20"))
            .unwrap();
        ledger
    }

    #[test]
    fn test_record_id_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = new_record_id(&mut rng);
        assert_eq!(id.len(), RECORD_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_tracking_event_appends_block() {
        let mut ledger = ledger_with_harvest();
        let (event, block) = record_tracking_event(
            &mut ledger,
            NewTrackingEvent {
                block_index: 0,
                location: "Pune Mandi".to_string(),
                status: TrackingStatus::Storage,
                quality: QualityGrade::B,
                handler: "ColdStore Ltd".to_string(),
                temperature: Some(4.5),
                notes: "kept dry".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(event.block_index, 0);
        assert_eq!(block.index, 1);
        assert_eq!(block.farmer, "ColdStore Ltd");
        assert_eq!(block.crop, "Wheat - Tracking");
        assert_eq!(block.quantity, "100");
        assert_eq!(block.price, "20");
        assert_eq!(
            block.notes,
            "Supply Chain Event: storage at Pune Mandi. Quality: B. Notes: kept dry"
        );
        assert!(ledger.verify().valid);
    }

    #[test]
    fn test_tracking_event_unknown_block() {
        let mut ledger = ledger_with_harvest();
        let err = record_tracking_event(
            &mut ledger,
            NewTrackingEvent {
                block_index: 3,
                location: "Depot".to_string(),
                handler: "Kiran".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err, ChainError::InvalidIndex { index: 3, len: 1 });
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_tracking_event_requires_location_and_handler() {
        let mut ledger = ledger_with_harvest();
        let result = record_tracking_event(
            &mut ledger,
            NewTrackingEvent {
                block_index: 0,
                location: " ".to_string(),
                handler: "Kiran".to_string(),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ChainError::InvalidInput(_))));
    }

    #[test]
    fn test_contract_lifecycle() {
        let mut ledger = Ledger::new(DigestPolicy::Sha256);
        let (mut contract, created) = create_contract(
            &mut ledger,
            NewContract {
                kind: ContractKind::Payment,
                parties: "Ravi, FreshMart ,".to_string(),
                terms: "Pay on delivery".to_string(),
                conditions: "Grade A\n\n  Within 3 days ".to_string(),
            },
        )
        .unwrap();

        assert_eq!(contract.parties, vec!["Ravi", "FreshMart"]);
        assert_eq!(contract.conditions, vec!["Grade A", "Within 3 days"]);
        assert_eq!(contract.status, ContractStatus::Pending);
        assert_eq!(created.farmer, CONTRACT_SYSTEM);
        assert_eq!(created.crop, "Contract Created");
        assert_eq!(
            created.notes,
            format!("Contract ID: {} | Type: payment | Parties: Ravi, FreshMart", contract.id)
        );

        let executed = execute_contract(&mut ledger, &mut contract).unwrap();
        assert_eq!(contract.status, ContractStatus::Active);
        assert_eq!(executed.crop, "Contract Executed");
        assert_eq!(executed.prev_hash, created.hash);
    }

    #[test]
    fn test_execute_by_id_checks_history() {
        let mut ledger = Ledger::new(DigestPolicy::Sha256);
        assert!(matches!(
            execute_contract_by_id(&mut ledger, "abc123xyz"),
            Err(ChainError::InvalidInput(_))
        ));

        let (contract, _) = create_contract(
            &mut ledger,
            NewContract {
                parties: "Ravi,Mill".to_string(),
                terms: "Deliver 2t".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let block = execute_contract_by_id(&mut ledger, &contract.id).unwrap();
        assert_eq!(block.index, 1);
        assert!(execute_contract_by_id(&mut ledger, &contract.id).is_err());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_contract_requires_parties_and_terms() {
        let mut ledger = Ledger::new(DigestPolicy::Sha256);
        let result = create_contract(
            &mut ledger,
            NewContract {
                parties: " , ".to_string(),
                terms: "x".to_string(),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ChainError::InvalidInput(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_contract_serializes_type_key() {
        let mut ledger = Ledger::new(DigestPolicy::Sha256);
        let (contract, _) = create_contract(
            &mut ledger,
            NewContract {
                kind: ContractKind::QualityAssurance,
                parties: "A,B".to_string(),
                terms: "t".to_string(),
                conditions: String::new(),
            },
        )
        .unwrap();
        let json = serde_json::to_value(&contract).unwrap();
        assert_eq!(json["type"], "quality_assurance");
        assert_eq!(json["status"], "pending");
    }
}

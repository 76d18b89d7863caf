//! AgriChain - A produce-tracking ledger for agricultural supply chains
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Block store, digest policies and integrity verification
//! - [`persistence`] - Key-value storage port (SQLite, JSON file, in-memory)
//!
//! ## Records & Reporting
//! - [`supply_chain`] - Tracking events and smart contracts recorded as blocks
//! - [`analytics`] - Per-crop, per-farmer and per-block aggregation
//! - [`export`] - JSON and CSV snapshots
//! - [`synthetic`] - Mock demand curves and sensor readings
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities
//!
//! The ledger's hashes are content fingerprints, not signatures. They catch
//! accidental edits; they do not stop anyone who can rewrite the storage.

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod persistence;

// ============================================================================
// Records & Reporting
// ============================================================================
pub mod analytics;
pub mod export;
pub mod supply_chain;
pub mod synthetic;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;

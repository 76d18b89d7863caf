// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// the ledger store, the digest policies and the integrity verifier.

pub mod core;
pub use core::*;

// core.rs splits the ledger into its store, digest and verifier parts.
pub mod chain;
pub mod digest;
pub mod validation;

pub use chain::*;
pub use digest::*;
pub use validation::*;

//! # CareBridge Domain
//!
//! Data types for the CareBridge offline resilience engine.
//!
//! This crate contains:
//! - Queue records (`PendingAction`) and typed CRM mutations (`CrmAction`)
//! - Status events consumed by the notification layer
//! - Sync state, drain outcomes and the persisted snapshot layout
//! - Configuration structures
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other CareBridge crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;

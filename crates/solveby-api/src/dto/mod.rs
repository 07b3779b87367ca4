//! Data Transfer Objects
//!
//! Request and response types for API endpoints. Every response payload is
//! wrapped in [`common::Envelope`].

pub mod agent;
pub mod common;
pub mod directory;
pub mod job;
pub mod ledger;
pub mod listing;

pub use agent::*;
pub use common::*;
pub use directory::*;
pub use job::*;
pub use ledger::*;
pub use listing::*;

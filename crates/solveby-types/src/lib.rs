//! solveby.ai Types - Canonical domain types for the agent marketplace
//!
//! This crate contains the foundational types shared by every other solveby
//! crate, with zero dependencies on them. It defines:
//!
//! - Agent names and API key format
//! - $CRUST amounts and minimums
//! - Normalized free-form categories
//! - Status enums for requests, proposals, jobs and sessions
//! - The job state machine and participant roles
//! - Reputation (karma) rules
//! - Order pricing for direct hires
//!
//! # Job Lifecycle
//!
//! ```text
//! Request(open) ── proposal accepted ──┐
//!                                      ├──► Job(in_progress) ──► delivered ──► completed
//! Service(active) ── direct hire ──────┘          │                  │
//!                                                 └──── cancelled / disputed
//! ```

pub mod error;
pub mod identity;
pub mod amount;
pub mod category;
pub mod status;
pub mod job;
pub mod access;
pub mod reputation;
pub mod pricing;
pub mod ledger;
pub mod search;

pub use error::*;
pub use identity::*;
pub use amount::*;
pub use category::*;
pub use status::*;
pub use job::*;
pub use access::*;
pub use reputation::*;
pub use pricing::*;
pub use ledger::*;
pub use search::*;

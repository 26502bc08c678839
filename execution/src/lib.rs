//! Lottery reduction engine.
//!
//! This crate folds ticket purchases into a chain of certificates. Each
//! certificate commits to the ticket and bank tree roots after one action and
//! carries a proof that it was derived from a valid predecessor, so the head
//! of the chain vouches for every action since `init`.
//!
//! ## Transitions
//! - [`Reducer::init`] starts a chain from externally supplied anchors.
//! - [`Reducer::add_ticket`] writes one ticket leaf and credits the round's pot.
//! - [`Reducer::cut_actions`] closes the open batch into the final state.
//!
//! ## Determinism requirements
//! - Transitions depend only on the predecessor, the input and the config.
//! - Tree and digest layouts are fixed by the tags in `lottery_types`.
//!
//! ## Minimal pipeline (example)
//! ```rust,ignore
//! use lottery_execution::{mocks::{create_reducer, create_ticket}, verify_chain, Sequencer};
//! use lottery_types::LotteryAction;
//!
//! let mut sequencer = Sequencer::new(create_reducer(1));
//! sequencer.submit(LotteryAction::new(create_ticket(1, 3), 1))?;
//! sequencer.cut()?;
//! verify_chain(sequencer.reducer().backend(), sequencer.history())?;
//! ```

mod audit;
mod config;
mod driver;
mod error;
mod proof;
mod reducer;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod scenario_tests;

pub use audit::{verify_chain, AuditError, AuditFailure};
pub use config::{ConfigError, ReductionConfig, CERTIFICATE_SUFFIX};
pub use driver::{Ledger, Sequencer};
pub use error::{DriverError, ReductionError, Tree};
pub use proof::{AttestationVerifier, Attestor, Certificate, CertificateVerifier, ProofBackend};
pub use reducer::{Phase, Reducer};

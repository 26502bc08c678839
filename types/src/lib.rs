//! Common types used by the lottery reduction engine.
//!
//! Defines tickets and actions, the sparse commitment trees they are written
//! into, the digest chains that summarize batches of actions, and the public
//! and private shapes of each reduction step.

mod action;
pub mod chain;
mod constants;
pub mod hash;
mod reduction;
mod ticket;
pub mod tree;

pub use action::LotteryAction;
pub use chain::{ActionDigestChain, BatchDigestChain, DigestChain};
pub use constants::*;
pub use reduction::{Anchors, Method, PublicOutput, ReductionInput};
pub use ticket::Ticket;
pub use tree::{amount_leaf, leaf_amount, zero_leaf, SparseTree, SparseTreeWitness, WitnessError};

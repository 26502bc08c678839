use commonware_cryptography::sha256::Digest;
use lottery_types::{Method, WitnessError};
use thiserror::Error;

/// Committed tree a witness was checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tree {
    Tickets,
    Bank,
}

impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tickets => f.write_str("tickets"),
            Self::Bank => f.write_str("bank"),
        }
    }
}

/// Reasons a transition refuses to produce a certificate.
///
/// Every variant is terminal for the attempted step: nothing is emitted and
/// the caller must rebuild its input against the current head before retrying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReductionError {
    #[error("ticket id out of sequence (round={round}, expected={expected}, got={got})")]
    Sequencing { round: u64, expected: u64, got: u64 },
    #[error("round regressed (last_processed={last}, got={got})")]
    RoundRegression { last: u64, got: u64 },
    #[error("stale {tree} witness (expected_root={expected}, got={got})")]
    StaleWitness {
        tree: Tree,
        expected: Digest,
        got: Digest,
    },
    #[error("{tree} witness round mismatch (declared={declared}, witnessed={witnessed})")]
    RoundMismatch {
        tree: Tree,
        declared: u64,
        witnessed: u64,
    },
    #[error("predecessor of {method} failed verification")]
    PredecessorInvalid { method: Method },
    #[error("bank overflow (round={round}, value={value}, amount={amount})")]
    BankOverflow { round: u64, value: u64, amount: u64 },
}

/// Failure of a driver step.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error(transparent)]
    Reduction(#[from] ReductionError),
    #[error("witness: {0}")]
    Witness(#[from] WitnessError),
}

//! Public re-verification of a certificate chain.
//!
//! Anyone holding a [CertificateVerifier] can check a published chain end to
//! end: every proof, every predecessor link, the anchors, and the fields that
//! are recomputable from public data alone (batch closure and id sequencing).
//! Tree roots written by `add_ticket` are covered by the proofs only.

use commonware_cryptography::Digestible;
use lottery_types::{ActionDigestChain, BatchDigestChain, DigestChain, Method, PublicOutput};
use thiserror::Error;

use crate::{Certificate, CertificateVerifier};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditFailure {
    Empty,
    NotInit,
    UnexpectedInit,
    MalformedInit,
    InvalidProof,
    BrokenLink,
    AnchorsChanged,
    BadClosure,
    BadSequence,
}

impl std::fmt::Display for AuditFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::Empty => "chain is empty",
            Self::NotInit => "chain does not start with init",
            Self::UnexpectedInit => "init after the first certificate",
            Self::MalformedInit => "init output is not a fresh chain",
            Self::InvalidProof => "proof failed verification",
            Self::BrokenLink => "predecessor digest does not match",
            Self::AnchorsChanged => "anchors differ from init",
            Self::BadClosure => "cut_actions output is not the batch fold",
            Self::BadSequence => "ticket id out of sequence",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("certificate {index}: {reason}")]
pub struct AuditError {
    pub index: usize,
    pub reason: AuditFailure,
}

fn fail(index: usize, reason: AuditFailure) -> AuditError {
    AuditError { index, reason }
}

fn is_fresh(output: &PublicOutput) -> bool {
    output.final_state == output.initial_state
        && output.new_ticket_root == output.initial_ticket_root
        && output.new_bank_root == output.initial_bank_root
        && output.processed_action_digest == ActionDigestChain::empty()
        && output.last_processed_round == 0
        && output.last_processed_ticket_id == 0
}

fn is_closure(previous: &PublicOutput, next: &PublicOutput) -> bool {
    next.final_state
        == BatchDigestChain::append(&previous.final_state, &previous.processed_action_digest)
        && next.processed_action_digest == ActionDigestChain::empty()
        && next.new_ticket_root == previous.new_ticket_root
        && next.new_bank_root == previous.new_bank_root
        && next.last_processed_round == previous.last_processed_round
        && next.last_processed_ticket_id == previous.last_processed_ticket_id
}

fn is_next_ticket(previous: &PublicOutput, next: &PublicOutput) -> bool {
    let expected = if next.last_processed_round > previous.last_processed_round {
        1
    } else {
        previous.last_processed_ticket_id + 1
    };
    next.last_processed_round >= previous.last_processed_round
        && next.last_processed_ticket_id == expected
        && next.final_state == previous.final_state
}

/// Check a whole chain, starting from its `init` certificate.
pub fn verify_chain<V: CertificateVerifier>(
    verifier: &V,
    chain: &[Certificate<V::Proof>],
) -> Result<(), AuditError> {
    let first = chain
        .first()
        .ok_or_else(|| fail(0, AuditFailure::Empty))?;
    if first.method() != Method::Init || first.predecessor().is_some() {
        return Err(fail(0, AuditFailure::NotInit));
    }
    if !is_fresh(first.output()) {
        return Err(fail(0, AuditFailure::MalformedInit));
    }
    if !verifier.verify(first) {
        return Err(fail(0, AuditFailure::InvalidProof));
    }
    let anchors = first.output().anchors();

    for (index, pair) in chain.windows(2).enumerate() {
        let index = index + 1;
        let (previous, next) = (&pair[0], &pair[1]);
        if !verifier.verify(next) {
            return Err(fail(index, AuditFailure::InvalidProof));
        }
        if next.predecessor() != Some(&previous.output().digest()) {
            return Err(fail(index, AuditFailure::BrokenLink));
        }
        if next.output().anchors() != anchors {
            return Err(fail(index, AuditFailure::AnchorsChanged));
        }
        match next.method() {
            Method::Init => return Err(fail(index, AuditFailure::UnexpectedInit)),
            Method::CutActions => {
                if !is_closure(previous.output(), next.output()) {
                    return Err(fail(index, AuditFailure::BadClosure));
                }
            }
            Method::AddTicket => {
                if !is_next_ticket(previous.output(), next.output()) {
                    return Err(fail(index, AuditFailure::BadSequence));
                }
            }
        }
    }
    Ok(())
}

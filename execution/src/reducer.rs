//! The reduction state machine.
//!
//! Each transition takes the previous certificate (except `init`), checks its
//! proof with the injected backend, enforces the sequencing and arithmetic
//! rules against the supplied witnesses, and emits a new certificate. No
//! certificate is produced while any rule is violated.
//!
//! ```text
//! init ──► Base ──add_ticket──► Accumulating ◄──┐
//!                                  │   └─add_ticket
//!                             cut_actions
//!                                  ▼
//!                           BetweenBatches ──add_ticket──► Accumulating
//! ```

use commonware_cryptography::{ed25519::PrivateKey, sha256::Digest, Digestible};
use lottery_types::{
    amount_leaf, zero_leaf, ActionDigestChain, Anchors, BatchDigestChain, DigestChain, Method,
    PublicOutput, ReductionInput,
};
use tracing::{debug, info, warn};

use crate::{Attestor, Certificate, ProofBackend, ReductionConfig, ReductionError, Tree};

/// Where a certificate sits in the batch lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Base,
    Accumulating,
    BetweenBatches,
}

impl Phase {
    pub fn after(method: Method) -> Self {
        match method {
            Method::Init => Self::Base,
            Method::AddTicket => Self::Accumulating,
            Method::CutActions => Self::BetweenBatches,
        }
    }
}

/// Roots of the ticket ledger before and after writing one ticket.
struct TicketWrite {
    ticket_id: u64,
    round: u64,
    old_root: Digest,
    new_root: Digest,
}

/// Roots of the bank ledger before and after crediting one round.
struct BankWrite {
    round: u64,
    old_root: Digest,
    new_root: Option<Digest>,
}

#[cfg(feature = "parallel")]
fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(a, b)
}

#[cfg(not(feature = "parallel"))]
fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA,
    B: FnOnce() -> RB,
{
    (a(), b())
}

/// Runs transitions against an injected proof backend.
pub struct Reducer<B> {
    backend: B,
    config: ReductionConfig,
}

impl Reducer<Attestor> {
    /// Reducer whose certificates are signed under `config`'s namespace.
    pub fn attested(signer: PrivateKey, config: ReductionConfig) -> Self {
        let backend = Attestor::new(signer, config.certificate_namespace());
        Self::new(backend, config)
    }
}

impl<B: ProofBackend> Reducer<B> {
    pub fn new(backend: B, config: ReductionConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    /// Pot of a round holding `bank_value` after a purchase of `amount`
    /// tickets, or `None` if it does not fit in a `u64`.
    pub fn credit(&self, bank_value: u64, amount: u64) -> Option<u64> {
        self.config
            .ticket_price
            .checked_mul(amount)
            .and_then(|credit| bank_value.checked_add(credit))
    }

    fn emit(
        &self,
        method: Method,
        output: PublicOutput,
        predecessor: Option<Digest>,
    ) -> Certificate<B::Proof> {
        let proof = self.backend.prove(method, &output, predecessor.as_ref());
        Certificate::from_parts(method, output, predecessor, proof)
    }

    fn check_predecessor(
        &self,
        method: Method,
        predecessor: &Certificate<B::Proof>,
    ) -> Result<Digest, ReductionError> {
        if !self.backend.verify(predecessor) {
            warn!(%method, "predecessor failed verification");
            return Err(ReductionError::PredecessorInvalid { method });
        }
        Ok(predecessor.output().digest())
    }

    /// Start a chain from externally supplied anchors.
    pub fn init(&self, anchors: Anchors) -> Certificate<B::Proof> {
        let output = PublicOutput {
            initial_state: anchors.initial_state,
            final_state: anchors.initial_state,
            initial_ticket_root: anchors.initial_ticket_root,
            initial_bank_root: anchors.initial_bank_root,
            new_ticket_root: anchors.initial_ticket_root,
            new_bank_root: anchors.initial_bank_root,
            processed_action_digest: ActionDigestChain::empty(),
            last_processed_round: 0,
            last_processed_ticket_id: 0,
        };
        debug!(method = %Method::Init, "started chain");
        self.emit(Method::Init, output, None)
    }

    /// Record one ticket purchase in the ticket and bank ledgers.
    pub fn add_ticket(
        &self,
        input: &ReductionInput,
        predecessor: &Certificate<B::Proof>,
    ) -> Result<Certificate<B::Proof>, ReductionError> {
        let result = self.reduce_ticket(input, predecessor);
        match &result {
            Ok(certificate) => debug!(
                method = %Method::AddTicket,
                round = certificate.output().last_processed_round,
                ticket_id = certificate.output().last_processed_ticket_id,
                "reduced ticket"
            ),
            Err(err) => warn!(method = %Method::AddTicket, round = input.action.round, ?err, "rejected ticket"),
        }
        result
    }

    fn reduce_ticket(
        &self,
        input: &ReductionInput,
        predecessor: &Certificate<B::Proof>,
    ) -> Result<Certificate<B::Proof>, ReductionError> {
        let link = self.check_predecessor(Method::AddTicket, predecessor)?;
        let previous = predecessor.output();
        let action = &input.action;

        // Ticket-side and bank-side recomputations are independent.
        let pot = self.credit(input.bank_value, action.ticket.amount);
        let (tickets, bank) = join(|| ticket_write(input), || bank_write(input, pot));

        // Sequencing
        if tickets.round < previous.last_processed_round {
            return Err(ReductionError::RoundRegression {
                last: previous.last_processed_round,
                got: tickets.round,
            });
        }
        let expected_ticket_id = if tickets.round > previous.last_processed_round {
            1
        } else {
            previous.last_processed_ticket_id + 1
        };
        if tickets.ticket_id != expected_ticket_id {
            return Err(ReductionError::Sequencing {
                round: tickets.round,
                expected: expected_ticket_id,
                got: tickets.ticket_id,
            });
        }

        // Ticket ledger
        if tickets.old_root != previous.new_ticket_root {
            return Err(ReductionError::StaleWitness {
                tree: Tree::Tickets,
                expected: previous.new_ticket_root,
                got: tickets.old_root,
            });
        }
        if tickets.round != action.round {
            return Err(ReductionError::RoundMismatch {
                tree: Tree::Tickets,
                declared: action.round,
                witnessed: tickets.round,
            });
        }

        // Bank ledger
        if bank.round != action.round {
            return Err(ReductionError::RoundMismatch {
                tree: Tree::Bank,
                declared: action.round,
                witnessed: bank.round,
            });
        }
        if bank.old_root != previous.new_bank_root {
            return Err(ReductionError::StaleWitness {
                tree: Tree::Bank,
                expected: previous.new_bank_root,
                got: bank.old_root,
            });
        }
        let new_bank_root = bank.new_root.ok_or(ReductionError::BankOverflow {
            round: action.round,
            value: input.bank_value,
            amount: action.ticket.amount,
        })?;

        let output = PublicOutput {
            initial_state: previous.initial_state,
            final_state: previous.final_state,
            initial_ticket_root: previous.initial_ticket_root,
            initial_bank_root: previous.initial_bank_root,
            new_ticket_root: tickets.new_root,
            new_bank_root,
            processed_action_digest: ActionDigestChain::append(
                &previous.processed_action_digest,
                action,
            ),
            last_processed_round: tickets.round,
            last_processed_ticket_id: expected_ticket_id,
        };
        Ok(self.emit(Method::AddTicket, output, Some(link)))
    }

    /// Close the open batch: fold its digest into the final state.
    ///
    /// Unlike [Self::add_ticket] this takes no [ReductionInput]: the fold reads
    /// only the predecessor's output.
    pub fn cut_actions(
        &self,
        predecessor: &Certificate<B::Proof>,
    ) -> Result<Certificate<B::Proof>, ReductionError> {
        let link = self.check_predecessor(Method::CutActions, predecessor)?;
        let previous = predecessor.output();
        let output = PublicOutput {
            final_state: BatchDigestChain::append(
                &previous.final_state,
                &previous.processed_action_digest,
            ),
            processed_action_digest: ActionDigestChain::empty(),
            ..previous.clone()
        };
        info!(
            method = %Method::CutActions,
            round = output.last_processed_round,
            "closed batch"
        );
        Ok(self.emit(Method::CutActions, output, Some(link)))
    }
}

fn ticket_write(input: &ReductionInput) -> TicketWrite {
    let commitment = input.action.ticket.commitment();
    let (old_tickets, ticket_id) = input
        .round_ticket_witness
        .compute_root_and_key(&zero_leaf());
    let (old_root, round) = input.round_witness.compute_root_and_key(&old_tickets);
    let (new_tickets, _) = input.round_ticket_witness.compute_root_and_key(&commitment);
    let (new_root, _) = input.round_witness.compute_root_and_key(&new_tickets);
    TicketWrite {
        ticket_id,
        round,
        old_root,
        new_root,
    }
}

fn bank_write(input: &ReductionInput, pot: Option<u64>) -> BankWrite {
    let (old_root, round) = input
        .bank_witness
        .compute_root_and_key(&amount_leaf(input.bank_value));
    let new_root = pot.map(|value| input.bank_witness.compute_root_and_key(&amount_leaf(value)).0);
    BankWrite {
        round,
        old_root,
        new_root,
    }
}

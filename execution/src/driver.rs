//! Off-chain driver.
//!
//! The [Ledger] mirrors the committed trees so it can build the witnesses for
//! the next action. The [Sequencer] owns a ledger, a reducer and the head
//! certificate: it prepares an input, runs one transition and, only if the
//! transition succeeds, applies the action to the ledger and advances the head.

use commonware_cryptography::sha256::Digest;
use lottery_types::{
    amount_leaf, tree, Anchors, BatchDigestChain, DigestChain, LotteryAction, ReductionInput,
    SparseTree, WitnessError,
};
use std::collections::BTreeMap;
use tracing::debug;

use crate::{Certificate, DriverError, ProofBackend, ReductionError, Reducer};

/// Off-chain copy of the round, ticket and bank trees.
#[derive(Clone, Debug)]
pub struct Ledger {
    rounds: SparseTree,
    tickets: BTreeMap<u64, SparseTree>,
    bank: SparseTree,
    pots: BTreeMap<u64, u64>,
    last_round: u64,
    last_ticket_id: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            rounds: SparseTree::rounds(),
            tickets: BTreeMap::new(),
            bank: SparseTree::bank(),
            pots: BTreeMap::new(),
            last_round: 0,
            last_ticket_id: 0,
        }
    }

    /// Anchors describing this ledger's current trees, with an empty batch history.
    pub fn anchors(&self) -> Anchors {
        Anchors {
            initial_state: BatchDigestChain::empty(),
            initial_ticket_root: self.ticket_root(),
            initial_bank_root: self.bank_root(),
        }
    }

    pub fn ticket_root(&self) -> Digest {
        self.rounds.root()
    }

    pub fn bank_root(&self) -> Digest {
        self.bank.root()
    }

    /// Pot total for `round` (zero for untouched rounds).
    pub fn pot(&self, round: u64) -> u64 {
        self.pots.get(&round).copied().unwrap_or(0)
    }

    /// Leaf holding `round`'s pot in the bank tree.
    pub fn bank_leaf(&self, round: u64) -> Result<Digest, WitnessError> {
        self.bank.leaf(round)
    }

    /// Commitment stored for `(round, ticket_id)`, if any ticket was written there.
    pub fn ticket(&self, round: u64, ticket_id: u64) -> Option<Digest> {
        let tickets = self.tickets.get(&round)?;
        let leaf = tickets.leaf(ticket_id).ok()?;
        (leaf != tickets.default_leaf()).then_some(leaf)
    }

    /// Id the next ticket for `round` will receive.
    pub fn next_ticket_id(&self, round: u64) -> u64 {
        if round > self.last_round {
            1
        } else {
            self.last_ticket_id + 1
        }
    }

    /// Build the private input for reducing `action` against the current trees.
    pub fn prepare(&self, action: LotteryAction) -> Result<ReductionInput, WitnessError> {
        let ticket_id = self.next_ticket_id(action.round);
        let round_ticket_witness = match self.tickets.get(&action.round) {
            Some(tickets) => tickets.witness(ticket_id)?,
            None => SparseTree::tickets().witness(ticket_id)?,
        };
        Ok(ReductionInput {
            round_witness: self.rounds.witness(action.round)?,
            round_ticket_witness,
            bank_witness: self.bank.witness(action.round)?,
            bank_value: self.pot(action.round),
            action,
        })
    }

    /// Write a reduced action into the trees.
    ///
    /// `pot` is the round's total after this action.
    pub fn apply(
        &mut self,
        action: &LotteryAction,
        ticket_id: u64,
        pot: u64,
    ) -> Result<(), WitnessError> {
        // Validate both keys up front so a failure leaves every tree untouched.
        tree::check_key(action.round)?;
        tree::check_key(ticket_id)?;

        let tickets = self
            .tickets
            .entry(action.round)
            .or_insert_with(SparseTree::tickets);
        tickets.set(ticket_id, action.ticket.commitment())?;
        let tickets_root = tickets.root();
        self.rounds.set(action.round, tickets_root)?;
        self.bank.set(action.round, amount_leaf(pot))?;
        self.pots.insert(action.round, pot);
        self.last_round = action.round;
        self.last_ticket_id = ticket_id;
        Ok(())
    }
}

/// Drives a single certificate chain.
pub struct Sequencer<B: ProofBackend> {
    reducer: Reducer<B>,
    ledger: Ledger,
    head: Certificate<B::Proof>,
    history: Vec<Certificate<B::Proof>>,
    pending: usize,
}

impl<B: ProofBackend> Sequencer<B>
where
    B::Proof: Clone,
{
    /// Start a chain over an empty ledger.
    pub fn new(reducer: Reducer<B>) -> Self {
        let ledger = Ledger::new();
        let head = reducer.init(ledger.anchors());
        Self {
            reducer,
            ledger,
            history: vec![head.clone()],
            head,
            pending: 0,
        }
    }

    pub fn head(&self) -> &Certificate<B::Proof> {
        &self.head
    }

    /// Every certificate produced so far, starting with `init`.
    pub fn history(&self) -> &[Certificate<B::Proof>] {
        &self.history
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn reducer(&self) -> &Reducer<B> {
        &self.reducer
    }

    /// Number of actions in the open batch.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Reduce one action. On failure the ledger and head are unchanged.
    pub fn submit(&mut self, action: LotteryAction) -> Result<&Certificate<B::Proof>, DriverError> {
        let input = self.ledger.prepare(action)?;
        let certificate = self.reducer.add_ticket(&input, &self.head)?;
        let ticket_id = certificate.output().last_processed_ticket_id;
        let pot = self
            .reducer
            .credit(input.bank_value, input.action.ticket.amount)
            .ok_or(ReductionError::BankOverflow {
                round: input.action.round,
                value: input.bank_value,
                amount: input.action.ticket.amount,
            })?;
        self.ledger.apply(&input.action, ticket_id, pot)?;
        self.pending += 1;
        Ok(self.advance(certificate))
    }

    /// Close the open batch.
    pub fn cut(&mut self) -> Result<&Certificate<B::Proof>, DriverError> {
        let certificate = self.reducer.cut_actions(&self.head)?;
        debug!(actions = self.pending, "folded batch");
        self.pending = 0;
        Ok(self.advance(certificate))
    }

    fn advance(&mut self, certificate: Certificate<B::Proof>) -> &Certificate<B::Proof> {
        self.history.push(certificate.clone());
        self.head = certificate;
        &self.head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{create_reducer, create_ticket};
    use lottery_types::{leaf_amount, SparseTree};

    #[test]
    fn test_prepare_uses_current_pot() {
        let mut ledger = Ledger::new();
        let action = LotteryAction::new(create_ticket(1, 3), 1);
        ledger.apply(&action, 1, 3).unwrap();

        let next = LotteryAction::new(create_ticket(2, 2), 1);
        let input = ledger.prepare(next).unwrap();
        assert_eq!(input.bank_value, 3);
        assert_eq!(input.round_ticket_witness.key(), 2);
        assert_eq!(input.round_witness.key(), 1);
        assert_eq!(input.bank_witness.key(), 1);
    }

    #[test]
    fn test_apply_updates_trees() {
        let mut ledger = Ledger::new();
        let empty_root = ledger.ticket_root();
        let action = LotteryAction::new(create_ticket(1, 3), 4);
        ledger.apply(&action, 1, 3).unwrap();

        let mut tickets = SparseTree::tickets();
        tickets.set(1, action.ticket.commitment()).unwrap();
        let mut rounds = SparseTree::rounds();
        rounds.set(4, tickets.root()).unwrap();

        assert_ne!(ledger.ticket_root(), empty_root);
        assert_eq!(ledger.ticket_root(), rounds.root());
        assert_eq!(ledger.pot(4), 3);
        assert_eq!(leaf_amount(&ledger.bank.leaf(4).unwrap()), Some(3));
        assert_eq!(ledger.ticket(4, 1), Some(action.ticket.commitment()));
        assert_eq!(ledger.ticket(4, 2), None);
        assert_eq!(ledger.next_ticket_id(4), 2);
        assert_eq!(ledger.next_ticket_id(5), 1);
    }

    #[test]
    fn test_apply_out_of_range_leaves_ledger_untouched() {
        let mut ledger = Ledger::new();
        let root = ledger.ticket_root();
        let action = LotteryAction::new(create_ticket(1, 1), lottery_types::TREE_CAPACITY);
        assert!(ledger.apply(&action, 1, 1).is_err());
        assert_eq!(ledger.ticket_root(), root);
        assert_eq!(ledger.pot(lottery_types::TREE_CAPACITY), 0);
        assert!(ledger.prepare(action).is_err());
    }

    #[test]
    fn test_sequencer_tracks_ledger() {
        let mut sequencer = Sequencer::new(create_reducer(1));
        sequencer
            .submit(LotteryAction::new(create_ticket(1, 3), 1))
            .unwrap();
        sequencer
            .submit(LotteryAction::new(create_ticket(2, 2), 1))
            .unwrap();

        let output = sequencer.head().output().clone();
        assert_eq!(output.new_ticket_root, sequencer.ledger().ticket_root());
        assert_eq!(output.new_bank_root, sequencer.ledger().bank_root());
        assert_eq!(sequencer.ledger().pot(1), 5);
        assert_eq!(sequencer.pending(), 2);
        assert_eq!(sequencer.history().len(), 3);

        sequencer.cut().unwrap();
        assert_eq!(sequencer.pending(), 0);
        assert_eq!(sequencer.history().len(), 4);
    }

    #[test]
    fn test_ledger_markers_follow_head() {
        let mut sequencer = Sequencer::new(create_reducer(1));
        for (seed, round) in [(1, 2), (2, 2), (3, 2), (4, 6), (5, 6)] {
            let head = sequencer.head().output().clone();
            let expected = if round > head.last_processed_round {
                1
            } else {
                head.last_processed_ticket_id + 1
            };
            assert_eq!(sequencer.ledger().next_ticket_id(round), expected);
            let output = sequencer
                .submit(LotteryAction::new(create_ticket(seed, 1), round))
                .unwrap()
                .output()
                .clone();
            assert_eq!(output.last_processed_ticket_id, expected);
            if seed == 3 {
                sequencer.cut().unwrap();
            }
        }
        assert_eq!(sequencer.ledger().pot(2), 3);
        assert_eq!(sequencer.ledger().pot(6), 2);
    }
}

//! End-to-end chain tests.
//!
//! These tests walk whole certificate chains through the sequencer and check
//! the chain-level properties: anchors never move, ticket ids restart per
//! round, batch closure is a pure fold, and a rejected step changes nothing.

#[cfg(test)]
mod tests {
    use crate::mocks::{create_reducer, create_sequencer, create_ticket};
    use crate::{verify_chain, DriverError, Ledger, Phase, ReductionError, Tree};
    use commonware_cryptography::sha256::Digest;
    use lottery_types::{
        amount_leaf, leaf_amount, zero_leaf, ActionDigestChain, Anchors, BatchDigestChain,
        DigestChain, LotteryAction, SparseTree,
    };
    use proptest::prelude::*;

    fn buy(seed: u64, amount: u64, round: u64) -> LotteryAction {
        LotteryAction::new(create_ticket(seed, amount), round)
    }

    #[test]
    fn test_init_echoes_anchors() {
        let reducer = create_reducer(1);
        let anchors = Anchors {
            initial_state: Digest::from([0x11; 32]),
            initial_ticket_root: Digest::from([0x22; 32]),
            initial_bank_root: Digest::from([0x33; 32]),
        };
        let init = reducer.init(anchors);
        let output = init.output();

        assert_eq!(output.final_state, anchors.initial_state);
        assert_eq!(output.new_ticket_root, anchors.initial_ticket_root);
        assert_eq!(output.new_bank_root, anchors.initial_bank_root);
        assert_eq!(output.last_processed_round, 0);
        assert_eq!(output.last_processed_ticket_id, 0);
    }

    #[test]
    fn test_batch_lifecycle() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let mut sequencer = create_sequencer(1);
        let init = sequencer.head().output().clone();

        // First ticket of round 1.
        let b = buy(1, 3, 1);
        let output = sequencer.submit(b.clone()).unwrap().output().clone();
        assert_eq!(output.last_processed_round, 1);
        assert_eq!(output.last_processed_ticket_id, 1);
        assert_eq!(sequencer.ledger().pot(1), 3);

        // Second ticket of round 1.
        let c = buy(2, 2, 1);
        let output = sequencer.submit(c.clone()).unwrap().output().clone();
        assert_eq!(output.last_processed_ticket_id, 2);
        assert_eq!(sequencer.ledger().pot(1), 5);
        assert_eq!(sequencer.ledger().ticket(1, 2), Some(c.ticket.commitment()));

        // A new round restarts the id.
        let d = buy(3, 4, 2);
        let output = sequencer.submit(d.clone()).unwrap().output().clone();
        assert_eq!(output.last_processed_round, 2);
        assert_eq!(output.last_processed_ticket_id, 1);
        assert_eq!(sequencer.ledger().pot(1), 5);
        assert_eq!(sequencer.ledger().pot(2), 4);

        // Closing the batch folds all three actions.
        let batch = ActionDigestChain::fold(ActionDigestChain::empty(), [&b, &c, &d]);
        assert_eq!(output.processed_action_digest, batch);
        let closed = sequencer.cut().unwrap().output().clone();
        assert_eq!(
            closed.final_state,
            BatchDigestChain::append(&init.final_state, &batch)
        );
        assert_eq!(closed.processed_action_digest, ActionDigestChain::empty());

        // The next action opens a fresh digest chain.
        let e = buy(4, 1, 3);
        let output = sequencer.submit(e.clone()).unwrap().output().clone();
        assert_eq!(
            output.processed_action_digest,
            ActionDigestChain::append(&ActionDigestChain::empty(), &e)
        );
        assert_eq!(output.final_state, closed.final_state);
        assert_eq!(output.last_processed_ticket_id, 1);

        verify_chain(sequencer.reducer().backend(), sequencer.history()).unwrap();
    }

    #[test]
    fn test_phases_follow_methods() {
        let mut sequencer = create_sequencer(1);
        assert_eq!(sequencer.head().phase(), Phase::Base);
        sequencer.submit(buy(1, 1, 1)).unwrap();
        assert_eq!(sequencer.head().phase(), Phase::Accumulating);
        sequencer.cut().unwrap();
        assert_eq!(sequencer.head().phase(), Phase::BetweenBatches);
        sequencer.submit(buy(2, 1, 1)).unwrap();
        assert_eq!(sequencer.head().phase(), Phase::Accumulating);
    }

    #[test]
    fn test_anchors_never_move() {
        let mut sequencer = create_sequencer(1);
        let anchors = sequencer.head().output().anchors();
        for (seed, round) in [(1, 1), (2, 1), (3, 4), (4, 4), (5, 9)] {
            sequencer.submit(buy(seed, seed, round)).unwrap();
            if seed % 2 == 0 {
                sequencer.cut().unwrap();
            }
        }
        sequencer.cut().unwrap();
        for certificate in sequencer.history() {
            assert_eq!(certificate.output().anchors(), anchors);
        }
    }

    #[test]
    fn test_repeated_cut_folds_empty_batch() {
        let mut sequencer = create_sequencer(1);
        sequencer.submit(buy(1, 2, 1)).unwrap();
        let first = sequencer.cut().unwrap().output().clone();
        let second = sequencer.cut().unwrap().output().clone();

        assert_eq!(
            second.final_state,
            BatchDigestChain::append(&first.final_state, &ActionDigestChain::empty())
        );
        assert_ne!(second.final_state, first.final_state);
        assert_eq!(second.new_ticket_root, first.new_ticket_root);
        assert_eq!(second.new_bank_root, first.new_bank_root);
        assert_eq!(second.last_processed_round, first.last_processed_round);
        assert_eq!(second.last_processed_ticket_id, first.last_processed_ticket_id);
    }

    #[test]
    fn test_write_is_local() {
        let mut sequencer = create_sequencer(1);
        sequencer.submit(buy(1, 3, 1)).unwrap();
        sequencer.submit(buy(2, 2, 5)).unwrap();

        let previous = sequencer.head().output().clone();
        let action = buy(3, 6, 5);
        let input = sequencer.ledger().prepare(action.clone()).unwrap();
        sequencer.submit(action).unwrap();

        // Putting the old leaves back reproduces the predecessor's roots.
        let (tickets, _) = input.round_ticket_witness.compute_root_and_key(&zero_leaf());
        let (ticket_root, _) = input.round_witness.compute_root_and_key(&tickets);
        assert_eq!(ticket_root, previous.new_ticket_root);
        let (bank_root, _) = input
            .bank_witness
            .compute_root_and_key(&amount_leaf(input.bank_value));
        assert_eq!(bank_root, previous.new_bank_root);
        assert_eq!(input.bank_value, 2);

        // Rounds the action did not touch keep their leaves.
        assert_eq!(sequencer.ledger().pot(1), 3);
        assert_eq!(sequencer.ledger().pot(5), 8);
    }

    #[test]
    fn test_round_regression_rejected() {
        let mut sequencer = create_sequencer(1);
        sequencer.submit(buy(1, 1, 3)).unwrap();
        assert_eq!(
            sequencer.submit(buy(2, 1, 2)).unwrap_err(),
            DriverError::Reduction(ReductionError::RoundRegression { last: 3, got: 2 })
        );
    }

    #[test]
    fn test_failed_submit_leaves_state_untouched() {
        let mut sequencer = create_sequencer(1);
        sequencer.submit(buy(1, u64::MAX, 1)).unwrap();
        let head = sequencer.head().clone();
        let ledger = sequencer.ledger().clone();
        let history = sequencer.history().len();

        assert!(matches!(
            sequencer.submit(buy(2, 1, 1)).unwrap_err(),
            DriverError::Reduction(ReductionError::BankOverflow { .. })
        ));
        assert!(matches!(
            sequencer.submit(buy(3, 1, 0)).unwrap_err(),
            DriverError::Reduction(ReductionError::RoundRegression { .. })
        ));
        assert!(matches!(
            sequencer
                .submit(buy(4, 1, lottery_types::TREE_CAPACITY))
                .unwrap_err(),
            DriverError::Witness(_)
        ));

        assert_eq!(sequencer.head(), &head);
        assert_eq!(sequencer.ledger().ticket_root(), ledger.ticket_root());
        assert_eq!(sequencer.ledger().bank_root(), ledger.bank_root());
        assert_eq!(sequencer.history().len(), history);
        assert_eq!(sequencer.pending(), 1);

        // The chain continues from the untouched head.
        sequencer.submit(buy(5, 1, 2)).unwrap();
        verify_chain(sequencer.reducer().backend(), sequencer.history()).unwrap();
    }

    #[test]
    fn test_stale_witness_rejected() {
        let reducer = create_reducer(1);
        let mut ledger = Ledger::new();
        let init = reducer.init(ledger.anchors());

        // Witnesses built before the first ticket no longer match the head.
        let first = buy(1, 1, 1);
        let stale = ledger.prepare(buy(2, 1, 2)).unwrap();
        let head = reducer
            .add_ticket(&ledger.prepare(first.clone()).unwrap(), &init)
            .unwrap();
        ledger.apply(&first, 1, 1).unwrap();

        assert!(matches!(
            reducer.add_ticket(&stale, &head).unwrap_err(),
            ReductionError::StaleWitness {
                tree: Tree::Tickets,
                ..
            }
        ));

        // Fresh ticket witnesses with a stale bank witness.
        let mut input = ledger.prepare(buy(2, 1, 2)).unwrap();
        input.bank_witness = SparseTree::bank().witness(2).unwrap();
        assert!(matches!(
            reducer.add_ticket(&input, &head).unwrap_err(),
            ReductionError::StaleWitness {
                tree: Tree::Bank,
                ..
            }
        ));

        let input = ledger.prepare(buy(2, 1, 2)).unwrap();
        assert!(reducer.add_ticket(&input, &head).is_ok());
    }

    #[test]
    fn test_chains_are_signer_bound() {
        let mut sequencer = create_sequencer(1);
        sequencer.submit(buy(1, 1, 1)).unwrap();
        sequencer.cut().unwrap();

        let other = create_reducer(2);
        assert!(verify_chain(other.backend(), sequencer.history()).is_err());
        let input = sequencer.ledger().prepare(buy(2, 1, 1)).unwrap();
        assert_eq!(
            other.add_ticket(&input, sequencer.head()).unwrap_err(),
            ReductionError::PredecessorInvalid {
                method: lottery_types::Method::AddTicket
            }
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_ids_restart_per_round(
            steps in prop::collection::vec((0u64..3, 1u64..100, any::<bool>()), 1..12)
        ) {
            let mut sequencer = create_sequencer(1);
            let mut round = 1;
            let mut expected_id = 0;
            let mut pots = std::collections::BTreeMap::new();
            for (seed, (bump, amount, cut)) in steps.into_iter().enumerate() {
                if bump > 0 {
                    round += bump;
                    expected_id = 0;
                }
                expected_id += 1;
                let output = sequencer
                    .submit(buy(seed as u64, amount, round))
                    .unwrap()
                    .output()
                    .clone();
                prop_assert_eq!(output.last_processed_round, round);
                prop_assert_eq!(output.last_processed_ticket_id, expected_id);
                *pots.entry(round).or_insert(0u64) += amount;
                if cut {
                    sequencer.cut().unwrap();
                }
            }
            for (round, pot) in pots {
                prop_assert_eq!(sequencer.ledger().pot(round), pot);
            }
            prop_assert!(verify_chain(sequencer.reducer().backend(), sequencer.history()).is_ok());
        }
    }

    #[test]
    fn test_bank_leaf_holds_pot() {
        let mut sequencer = create_sequencer(1);
        sequencer.submit(buy(1, 3, 1)).unwrap();
        sequencer.submit(buy(2, 2, 1)).unwrap();

        let input = sequencer.ledger().prepare(buy(3, 1, 1)).unwrap();
        let (root, round) = input
            .bank_witness
            .compute_root_and_key(&amount_leaf(5));
        assert_eq!(round, 1);
        assert_eq!(root, sequencer.head().output().new_bank_root);
        let leaf = sequencer.ledger().bank_leaf(1).unwrap();
        assert_eq!(leaf, amount_leaf(5));
        assert_eq!(leaf_amount(&leaf), Some(5));
        assert_eq!(
            sequencer.ledger().bank_leaf(2).unwrap(),
            amount_leaf(0)
        );
    }
}

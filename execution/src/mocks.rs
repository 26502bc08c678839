use crate::{Attestor, ReductionConfig, Reducer, Sequencer};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    sha256::Digest,
    Signer,
};
use commonware_math::algebra::Random;
use lottery_types::{PublicOutput, Ticket, TICKET_NUMBERS};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Creates an account keypair for Ed25519 signatures used by ticket owners
pub fn create_account_keypair(seed: u64) -> (PrivateKey, PublicKey) {
    let mut rng = StdRng::seed_from_u64(seed);
    let private = PrivateKey::random(&mut rng);
    let public = private.public_key();
    (private, public)
}

/// Creates a signing backend under the default certificate namespace
pub fn create_attestor(seed: u64) -> Attestor {
    let (private, _) = create_account_keypair(seed);
    Attestor::new(private, ReductionConfig::default().certificate_namespace())
}

/// Creates a reducer with the default configuration
pub fn create_reducer(seed: u64) -> Reducer<Attestor> {
    let (private, _) = create_account_keypair(seed);
    Reducer::attested(private, ReductionConfig::default())
}

/// Creates a sequencer over an empty ledger
pub fn create_sequencer(seed: u64) -> Sequencer<Attestor> {
    Sequencer::new(create_reducer(seed))
}

/// Creates a ticket with numbers drawn from `seed`
pub fn create_ticket(seed: u64, amount: u64) -> Ticket {
    let (_, owner) = create_account_keypair(seed);
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1 << 32));
    let mut numbers = [0u8; TICKET_NUMBERS];
    for number in numbers.iter_mut() {
        *number = rng.gen_range(1..=49);
    }
    Ticket::new(numbers, owner, amount)
}

/// Creates an output with distinct values in every field
pub fn sample_output() -> PublicOutput {
    PublicOutput {
        initial_state: Digest::from([1u8; 32]),
        final_state: Digest::from([2u8; 32]),
        initial_ticket_root: Digest::from([3u8; 32]),
        initial_bank_root: Digest::from([4u8; 32]),
        new_ticket_root: Digest::from([5u8; 32]),
        new_bank_root: Digest::from([6u8; 32]),
        processed_action_digest: Digest::from([7u8; 32]),
        last_processed_round: 8,
        last_processed_ticket_id: 9,
    }
}

//! Public and private shapes of the reduction transitions.

use bytes::{Buf, BufMut};
use commonware_codec::{Encode, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Digestible, Hasher,
};

use crate::{LotteryAction, SparseTreeWitness};

/// Named transitions of the reduction protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Method {
    Init = 0,
    AddTicket = 1,
    CutActions = 2,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::AddTicket => "add_ticket",
            Self::CutActions => "cut_actions",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Write for Method {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for Method {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        match value {
            0 => Ok(Self::Init),
            1 => Ok(Self::AddTicket),
            2 => Ok(Self::CutActions),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Method {
    const SIZE: usize = 1;
}

/// Fixed values a chain is started from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Anchors {
    pub initial_state: Digest,
    pub initial_ticket_root: Digest,
    pub initial_bank_root: Digest,
}

/// Private input of a single `add_ticket` step.
///
/// - `round_ticket_witness` proves the ticket slot inside the round's ticket tree.
/// - `round_witness` proves that ticket tree's slot in the round tree.
/// - `bank_witness` proves the round's slot in the bank tree.
/// - `bank_value` is the round's pot before this action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReductionInput {
    pub action: LotteryAction,
    pub round_witness: SparseTreeWitness,
    pub round_ticket_witness: SparseTreeWitness,
    pub bank_witness: SparseTreeWitness,
    pub bank_value: u64,
}

impl Write for ReductionInput {
    fn write(&self, writer: &mut impl BufMut) {
        self.action.write(writer);
        self.round_witness.write(writer);
        self.round_ticket_witness.write(writer);
        self.bank_witness.write(writer);
        self.bank_value.write(writer);
    }
}

impl Read for ReductionInput {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            action: LotteryAction::read(reader)?,
            round_witness: SparseTreeWitness::read(reader)?,
            round_ticket_witness: SparseTreeWitness::read(reader)?,
            bank_witness: SparseTreeWitness::read(reader)?,
            bank_value: u64::read(reader)?,
        })
    }
}

impl FixedSize for ReductionInput {
    const SIZE: usize = LotteryAction::SIZE + 3 * SparseTreeWitness::SIZE + u64::SIZE;
}

/// Public output carried by every certificate.
///
/// `initial_*` are the chain's anchors. `final_state` commits to every closed
/// batch, `processed_action_digest` to the actions of the open batch, and the
/// `new_*_root` fields are the current tree roots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicOutput {
    pub initial_state: Digest,
    pub final_state: Digest,
    pub initial_ticket_root: Digest,
    pub initial_bank_root: Digest,
    pub new_ticket_root: Digest,
    pub new_bank_root: Digest,
    pub processed_action_digest: Digest,
    pub last_processed_round: u64,
    pub last_processed_ticket_id: u64,
}

impl PublicOutput {
    pub fn anchors(&self) -> Anchors {
        Anchors {
            initial_state: self.initial_state,
            initial_ticket_root: self.initial_ticket_root,
            initial_bank_root: self.initial_bank_root,
        }
    }
}

impl Write for PublicOutput {
    fn write(&self, writer: &mut impl BufMut) {
        self.initial_state.write(writer);
        self.final_state.write(writer);
        self.initial_ticket_root.write(writer);
        self.initial_bank_root.write(writer);
        self.new_ticket_root.write(writer);
        self.new_bank_root.write(writer);
        self.processed_action_digest.write(writer);
        self.last_processed_round.write(writer);
        self.last_processed_ticket_id.write(writer);
    }
}

impl Read for PublicOutput {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            initial_state: Digest::read(reader)?,
            final_state: Digest::read(reader)?,
            initial_ticket_root: Digest::read(reader)?,
            initial_bank_root: Digest::read(reader)?,
            new_ticket_root: Digest::read(reader)?,
            new_bank_root: Digest::read(reader)?,
            processed_action_digest: Digest::read(reader)?,
            last_processed_round: u64::read(reader)?,
            last_processed_ticket_id: u64::read(reader)?,
        })
    }
}

impl FixedSize for PublicOutput {
    const SIZE: usize = 7 * Digest::SIZE + u64::SIZE + u64::SIZE;
}

impl Digestible for PublicOutput {
    type Digest = Digest;

    fn digest(&self) -> Digest {
        Sha256::hash(&self.encode())
    }
}

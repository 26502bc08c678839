use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};

use crate::Ticket;

/// One submitted purchase, tagged with the round it targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LotteryAction {
    pub ticket: Ticket,
    pub round: u64,
}

impl LotteryAction {
    pub fn new(ticket: Ticket, round: u64) -> Self {
        Self { ticket, round }
    }
}

impl Write for LotteryAction {
    fn write(&self, writer: &mut impl BufMut) {
        self.ticket.write(writer);
        self.round.write(writer);
    }
}

impl Read for LotteryAction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            ticket: Ticket::read(reader)?,
            round: u64::read(reader)?,
        })
    }
}

impl FixedSize for LotteryAction {
    const SIZE: usize = Ticket::SIZE + u64::SIZE;
}

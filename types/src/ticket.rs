use bytes::{Buf, BufMut};
use commonware_codec::{Encode, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::{ed25519::PublicKey, sha256::Digest};

use crate::{hash, TICKET_NUMBERS, TICKET_TAG};

/// A purchased lottery entry.
///
/// `amount` is the number of ticket units bought with these picks; the pot for
/// the round grows by `ticket_price * amount`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub numbers: [u8; TICKET_NUMBERS],
    pub owner: PublicKey,
    pub amount: u64,
}

impl Ticket {
    pub fn new(numbers: [u8; TICKET_NUMBERS], owner: PublicKey, amount: u64) -> Self {
        Self {
            numbers,
            owner,
            amount,
        }
    }

    /// Leaf value stored in the round's ticket tree.
    pub fn commitment(&self) -> Digest {
        hash::tagged(TICKET_TAG, &[self.encode().as_ref()])
    }
}

impl Write for Ticket {
    fn write(&self, writer: &mut impl BufMut) {
        for number in &self.numbers {
            number.write(writer);
        }
        self.owner.write(writer);
        self.amount.write(writer);
    }
}

impl Read for Ticket {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let mut numbers = [0u8; TICKET_NUMBERS];
        for number in numbers.iter_mut() {
            *number = u8::read(reader)?;
        }
        Ok(Self {
            numbers,
            owner: PublicKey::read(reader)?,
            amount: u64::read(reader)?,
        })
    }
}

impl FixedSize for Ticket {
    const SIZE: usize = TICKET_NUMBERS + PublicKey::SIZE + u64::SIZE;
}

//! Hash-chained accumulators.
//!
//! Two chain families exist:
//! - [ActionDigestChain] folds the actions of the open batch.
//! - [BatchDigestChain] folds closed-batch digests into the long-run final state.
//!
//! Both use the same two-level construction
//! ```text
//! append(d, item) = H(LINK, d || H(ITEM, encode(item)))
//! ```
//! with distinct tags per family, so a digest from one family can never be
//! mistaken for a digest from the other.

use commonware_codec::Encode;
use commonware_cryptography::sha256::Digest;

use crate::{
    hash, LotteryAction, ACTION_EMPTY_TAG, ACTION_ITEM_TAG, ACTION_LINK_TAG, BATCH_EMPTY_TAG,
    BATCH_ITEM_TAG, BATCH_LINK_TAG,
};

pub trait DigestChain {
    type Item: Encode;

    const EMPTY_TAG: &'static [u8];
    const ITEM_TAG: &'static [u8];
    const LINK_TAG: &'static [u8];

    /// Digest of a chain with no items.
    fn empty() -> Digest {
        hash::tagged(Self::EMPTY_TAG, &[])
    }

    fn append(digest: &Digest, item: &Self::Item) -> Digest {
        let inner = hash::tagged(Self::ITEM_TAG, &[item.encode().as_ref()]);
        hash::tagged(Self::LINK_TAG, &[digest.as_ref(), inner.as_ref()])
    }

    fn fold<'a, I>(digest: Digest, items: I) -> Digest
    where
        I: IntoIterator<Item = &'a Self::Item>,
        Self::Item: 'a,
    {
        items
            .into_iter()
            .fold(digest, |digest, item| Self::append(&digest, item))
    }
}

/// Accumulator over the actions of one open batch.
pub struct ActionDigestChain;

impl DigestChain for ActionDigestChain {
    type Item = LotteryAction;

    const EMPTY_TAG: &'static [u8] = ACTION_EMPTY_TAG;
    const ITEM_TAG: &'static [u8] = ACTION_ITEM_TAG;
    const LINK_TAG: &'static [u8] = ACTION_LINK_TAG;
}

/// Accumulator over closed-batch digests.
pub struct BatchDigestChain;

impl DigestChain for BatchDigestChain {
    type Item = Digest;

    const EMPTY_TAG: &'static [u8] = BATCH_EMPTY_TAG;
    const ITEM_TAG: &'static [u8] = BATCH_ITEM_TAG;
    const LINK_TAG: &'static [u8] = BATCH_LINK_TAG;
}

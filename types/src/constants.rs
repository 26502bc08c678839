/// Namespace shared by every domain tag in the lottery protocol.
pub const NAMESPACE: &[u8] = b"_LOTTERY";

/// Depth of every commitment tree (rounds, tickets, bank).
pub const TREE_DEPTH: usize = 20;

/// Number of addressable slots in a tree of depth [TREE_DEPTH].
pub const TREE_CAPACITY: u64 = 1 << TREE_DEPTH;

/// Number of picks on a ticket.
pub const TICKET_NUMBERS: usize = 6;

/// Price of a single ticket unit when no configuration overrides it.
pub const DEFAULT_TICKET_PRICE: u64 = 1;

// Hash domain tags. Every tag is length-prefixed when hashed, so no tag can
// alias a longer one.
pub const NODE_TAG: &[u8] = b"_LOTTERY_NODE";
pub const TICKET_TAG: &[u8] = b"_LOTTERY_TICKET";
pub const ACTION_EMPTY_TAG: &[u8] = b"_LOTTERY_ACTIONS_EMPTY";
pub const ACTION_ITEM_TAG: &[u8] = b"_LOTTERY_ACTIONS_ITEM";
pub const ACTION_LINK_TAG: &[u8] = b"_LOTTERY_ACTIONS_LINK";
pub const BATCH_EMPTY_TAG: &[u8] = b"_LOTTERY_BATCHES_EMPTY";
pub const BATCH_ITEM_TAG: &[u8] = b"_LOTTERY_BATCHES_ITEM";
pub const BATCH_LINK_TAG: &[u8] = b"_LOTTERY_BATCHES_LINK";

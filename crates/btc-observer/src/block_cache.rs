//! A bounded cache of recently fetched blocks.

use std::{collections::BTreeMap, sync::Arc};

use bitcoin::block::Header;
use parking_lot::Mutex;
use zeta_btc_primitives::rpc_types::GetBlockVerboseTxResult;

/// A block together with its raw header.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAndHeader {
    /// The raw header, relayed for header verification.
    pub header: Header,

    /// The block with its transactions.
    pub block: GetBlockVerboseTxResult,
}

/// Keeps the `capacity` highest blocks inserted, by height.
#[derive(Debug)]
pub struct BlockCache {
    capacity: usize,
    blocks: Mutex<BTreeMap<u64, Arc<BlockAndHeader>>>,
}

impl BlockCache {
    /// Creates an empty cache holding at most `capacity` blocks.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            blocks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the cached block at `height`.
    pub fn get(&self, height: u64) -> Option<Arc<BlockAndHeader>> {
        self.blocks.lock().get(&height).cloned()
    }

    /// Inserts the block at `height`, evicting the lowest heights once full.
    pub fn insert(&self, height: u64, block: Arc<BlockAndHeader>) {
        let mut blocks = self.blocks.lock();
        blocks.insert(height, block);

        while blocks.len() > self.capacity {
            blocks.pop_first();
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.blocks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use zeta_btc_test_utils::prelude::*;

    use super::*;

    fn block(height: i64) -> Arc<BlockAndHeader> {
        Arc::new(BlockAndHeader {
            header: generate_header(generate_block_hash(), 0),
            block: GetBlockVerboseTxResult {
                hash: generate_block_hash(),
                height,
                ..Default::default()
            },
        })
    }

    #[test]
    fn test_evicts_lowest_height() {
        let cache = BlockCache::new(3);
        for height in [10, 12, 11, 13] {
            cache.insert(height, block(height as i64));
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.get(10).is_none(), "lowest height must be evicted");
        assert!(
            cache.get(13).is_some_and(|b| b.block.height == 13),
            "highest block must be cached"
        );
    }
}

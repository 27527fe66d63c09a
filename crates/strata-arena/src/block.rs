//! Fixed-stride id blocks for skeleton bone groups.
//!
//! A skeleton's bones must occupy contiguous ids so the consumer can index
//! bone matrices as `first + bone_index`. [`BlockIdAllocator`] hands out
//! whole blocks of `stride` ids and recycles them as whole blocks, so the
//! contiguity survives any release order.

use strata_core::{InstanceId, SyncError};

use crate::config::CapacityConfig;
use crate::ids::IdAllocator;

/// A contiguous run of ids `first ..= first + len - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IdBlock {
    /// First id of the block.
    pub first: InstanceId,
    /// Number of ids in the block.
    pub len: u32,
}

impl IdBlock {
    /// The id of the `index`-th member, or `None` past the end.
    pub fn get(&self, index: u32) -> Option<InstanceId> {
        (index < self.len).then(|| InstanceId(self.first.0 + index))
    }

    /// Iterate over every id in the block.
    pub fn iter(&self) -> impl Iterator<Item = InstanceId> {
        let first = self.first.0;
        (first..first + self.len).map(InstanceId)
    }
}

/// Allocator of fixed-size, contiguous id blocks.
///
/// Block `n` (1-based, as issued by an inner [`IdAllocator`]) covers ids
/// `(n - 1) * stride + 1 ..= n * stride`.
#[derive(Clone, Debug)]
pub struct BlockIdAllocator {
    stride: u32,
    blocks: IdAllocator,
}

impl BlockIdAllocator {
    /// Create an allocator issuing blocks of `stride` ids.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is zero.
    pub fn new(stride: u32, config: CapacityConfig) -> Self {
        assert!(stride > 0, "block stride must be at least 1");
        let block_config = CapacityConfig {
            ceiling: config.ceiling / stride as usize,
            ..config
        };
        Self {
            stride,
            blocks: IdAllocator::new(block_config),
        }
    }

    /// Ids per block.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Issue a block, reusing the lowest released block first.
    pub fn allocate(&mut self) -> Result<IdBlock, SyncError> {
        let block = self.blocks.allocate()?;
        Ok(IdBlock {
            first: InstanceId((block.0 - 1) * self.stride + 1),
            len: self.stride,
        })
    }

    /// Return a block. The block must be exactly one previously issued.
    pub fn release(&mut self, block: IdBlock) -> Result<(), SyncError> {
        let first = block.first;
        let Some(slot) = first.slot() else {
            return Err(SyncError::InvalidId { id: first });
        };
        if block.len != self.stride || slot % self.stride as usize != 0 {
            return Err(SyncError::InvalidId { id: first });
        }
        let block_no = u32::try_from(slot / self.stride as usize + 1)
            .map_err(|_| SyncError::InvalidId { id: first })?;
        self.blocks.release(InstanceId(block_no))
    }

    /// Number of blocks currently issued.
    pub fn live_blocks(&self) -> usize {
        self.blocks.live_count()
    }
}

//! Append-only record log with cursor-paged flushing.

use strata_arena::CapacityConfig;
use strata_core::{Cycle, SyncError};

/// One page of records handed to the consumer.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch<R> {
    /// Records in append order.
    pub records: Vec<R>,
    /// Cycle the records were produced in.
    pub cycle: Cycle,
    /// Records still waiting after this page. Zero on the final page.
    pub remaining: usize,
}

impl<R> Batch<R> {
    /// Whether this page drained the log and closed its cycle.
    pub fn is_final(&self) -> bool {
        self.remaining == 0
    }

    /// Number of records in the page.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page carries no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Records accumulated during one cycle, flushed in pages.
///
/// `records[..cursor]` have been shipped and are frozen;
/// `records[cursor..]` are pending. A flush that reaches the end clears the
/// log and starts the next cycle.
#[derive(Clone, Debug)]
pub struct PagedLog<R> {
    records: Vec<R>,
    cursor: usize,
    cycle: Cycle,
    config: CapacityConfig,
}

impl<R> PagedLog<R> {
    /// Create an empty log at cycle 0.
    pub fn new(config: CapacityConfig) -> Self {
        Self {
            records: Vec::new(),
            cursor: 0,
            cycle: Cycle::default(),
            config,
        }
    }

    /// Append a record and return its position.
    pub fn push(&mut self, record: R) -> Result<usize, SyncError> {
        let position = self.records.len();
        self.config.reserve(&mut self.records, position + 1)?;
        self.records.push(record);
        Ok(position)
    }

    /// Mutable access to a pending record. Shipped positions return `None`.
    pub fn pending_mut(&mut self, position: usize) -> Option<&mut R> {
        if position < self.cursor {
            return None;
        }
        self.records.get_mut(position)
    }

    /// Whether `position` holds a record not yet shipped.
    pub fn is_pending(&self, position: usize) -> bool {
        position >= self.cursor && position < self.records.len()
    }

    /// Records waiting to be flushed.
    pub fn pending(&self) -> usize {
        self.records.len() - self.cursor
    }

    /// Records shipped so far this cycle.
    pub fn shipped(&self) -> usize {
        self.cursor
    }

    /// Whether nothing is waiting and no partial flush is in progress.
    pub fn is_drained(&self) -> bool {
        self.records.is_empty()
    }

    /// The current cycle.
    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Iterate over the pending records in append order.
    pub fn iter_pending(&self) -> impl Iterator<Item = &R> {
        self.records[self.cursor..].iter()
    }
}

impl<R: Clone> PagedLog<R> {
    /// Ship up to `max_batch_size` pending records.
    ///
    /// If everything pending fits, the log is cleared and its cycle
    /// advances. Otherwise the next `max_batch_size` records are copied out
    /// and the cursor moves past them. Draining `M` records therefore takes
    /// exactly `ceil(M / max_batch_size)` calls.
    pub fn flush(&mut self, max_batch_size: usize) -> Result<Batch<R>, SyncError> {
        if max_batch_size == 0 {
            return Err(SyncError::InvalidBatchSize);
        }
        let cycle = self.cycle;
        let pending = self.pending();
        if pending <= max_batch_size {
            let records: Vec<R> = self.records.drain(self.cursor..).collect();
            self.records.clear();
            self.cursor = 0;
            self.cycle = cycle.next();
            return Ok(Batch {
                records,
                cycle,
                remaining: 0,
            });
        }
        let end = self.cursor + max_batch_size;
        let records = self.records[self.cursor..end].to_vec();
        self.cursor = end;
        log::trace!(
            "paged flush: shipped {max_batch_size} records of cycle {cycle}, {} remaining",
            pending - max_batch_size
        );
        Ok(Batch {
            records,
            cycle,
            remaining: pending - max_batch_size,
        })
    }
}

impl<R> Default for PagedLog<R> {
    fn default() -> Self {
        Self::new(CapacityConfig::default())
    }
}

//! Atomic single-partition write batches.

use crate::backend::Backend;
use crate::client::TableClient;
use crate::codec::{self, TableRecord};
use crate::error::{BatchError, Result};
use crate::types::{Entity, MAX_BATCH_OPERATIONS};

/// A single operation within a write batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Insert-or-replace the entity.
    Put(Entity),
    /// Remove the row if present; absent rows are not an error.
    Delete { row_key: String },
}

/// Collects mutations for one partition and commits them atomically.
///
/// Either every operation becomes visible together, or none are applied.
/// Dropping the batch without calling [`commit`](WriteBatch::commit)
/// discards it.
pub struct WriteBatch<'a, B: Backend> {
    client: &'a TableClient<B>,
    partition_key: String,
    ops: Vec<BatchOp>,
}

impl<'a, B: Backend> WriteBatch<'a, B> {
    pub(crate) fn new(client: &'a TableClient<B>, partition_key: String) -> Self {
        WriteBatch {
            client,
            partition_key,
            ops: Vec::new(),
        }
    }

    /// Queue an insert-or-replace of a typed record.
    pub fn put<T: TableRecord>(&mut self, record: &T) -> Result<&mut Self> {
        let entity = codec::encode(record)?;
        Ok(self.put_entity(entity))
    }

    /// Queue an insert-or-replace of a raw entity.
    pub fn put_entity(&mut self, entity: Entity) -> &mut Self {
        self.ops.push(BatchOp::Put(entity));
        self
    }

    /// Queue a delete by row key.
    pub fn delete(&mut self, row_key: impl Into<String>) -> &mut Self {
        self.ops.push(BatchOp::Delete {
            row_key: row_key.into(),
        });
        self
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Discard all queued operations without committing.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Validate and commit all queued operations as one atomic unit.
    ///
    /// Structural violations (mixed partition keys, too many operations)
    /// are rejected before any backend call. An operation failing during
    /// application surfaces as [`BatchError::OperationFailed`] with the
    /// index and cause of the first failure, and nothing is applied.
    pub fn commit(self) -> Result<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        validate(&self.partition_key, &self.ops)?;
        self.client.backend().batch_write(
            self.client.table(),
            &self.partition_key,
            self.ops,
            self.client.config().timeout,
        )
    }
}

/// Check the structural batch preconditions: single partition key, bounded
/// operation count.
pub(crate) fn validate(partition_key: &str, ops: &[BatchOp]) -> std::result::Result<(), BatchError> {
    if ops.len() > MAX_BATCH_OPERATIONS {
        return Err(BatchError::TooManyOperations {
            max: MAX_BATCH_OPERATIONS,
            actual: ops.len(),
        });
    }
    for op in ops {
        if let BatchOp::Put(entity) = op {
            if entity.partition_key != partition_key {
                return Err(BatchError::MixedPartitionKeys {
                    expected: partition_key.to_string(),
                    found: entity.partition_key.clone(),
                });
            }
        }
    }
    Ok(())
}

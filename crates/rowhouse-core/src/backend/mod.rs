//! The storage seam: a narrow trait every backend implements.
//!
//! The crate ships one embedded implementation, [`MemoryBackend`]. Remote
//! backends (a managed table service reached over the network) implement the
//! same trait; authentication and connection management are entirely their
//! concern and never inspected here.

mod memory;

pub use memory::MemoryBackend;

use std::time::Duration;

use crate::batch::BatchOp;
use crate::error::Result;
use crate::filter::Filter;
use crate::types::{Entity, Timestamp};

/// Storage operations over named tables of `(PartitionKey, RowKey)`-addressed
/// entities.
///
/// Every method takes the caller-configured `timeout` as its final argument;
/// implementations that perform I/O must bound the call by it and fail with
/// [`TimeoutError`](crate::error::TimeoutError) once exceeded. In-process
/// implementations may ignore it.
///
/// Write timestamps are assigned by the implementation and must be
/// monotonically non-decreasing per key.
pub trait Backend: Send + Sync {
    /// Create the table if it does not exist. Existing tables are untouched.
    fn create_table_if_absent(&self, table: &str, timeout: Duration) -> Result<()>;

    /// Insert-or-replace one entity, returning the assigned write timestamp.
    fn put_entity(&self, table: &str, entity: &Entity, timeout: Duration) -> Result<Timestamp>;

    /// Point lookup by key pair.
    fn get_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        timeout: Duration,
    ) -> Result<Option<Entity>>;

    /// Remove one entity. Returns `true` iff it existed.
    fn delete_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        timeout: Duration,
    ) -> Result<bool>;

    /// Scan the whole table in storage order (partition key ascending, row
    /// key ascending), applying the filter if given. The slow path.
    fn scan(&self, table: &str, filter: Option<&Filter>, timeout: Duration)
        -> Result<Vec<Entity>>;

    /// Scan one partition, ordered by row key ascending. The fast path.
    fn scan_partition(
        &self,
        table: &str,
        partition_key: &str,
        timeout: Duration,
    ) -> Result<Vec<Entity>>;

    /// Apply all operations to one partition atomically, in order: either
    /// every operation becomes visible together or none are applied.
    fn batch_write(
        &self,
        table: &str,
        partition_key: &str,
        ops: Vec<BatchOp>,
        timeout: Duration,
    ) -> Result<()>;

    /// Drop the table and everything in it. Returns `true` iff it existed.
    fn delete_table(&self, table: &str, timeout: Duration) -> Result<bool>;
}

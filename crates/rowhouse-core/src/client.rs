//! The public client surface: a typed facade over one table.

use std::time::Duration;

use crate::backend::Backend;
use crate::batch::WriteBatch;
use crate::codec::{self, TableRecord};
use crate::error::Result;
use crate::filter::Filter;
use crate::query::{self, Order};
use crate::types::{AttrValue, Entity, Timestamp, PARTITION_KEY, ROW_KEY};

/// Default bound on a single backend call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-level policy. The timeout bounds every backend call; backends that
/// perform I/O fail with [`TimeoutError`](crate::error::TimeoutError) once it
/// is exceeded. Retrying is left entirely to the caller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A client bound to a single table.
///
/// Opening a client creates the table if it does not exist. The client holds
/// no mutable state beyond the backend handle and may be shared freely
/// across threads.
pub struct TableClient<B: Backend> {
    backend: B,
    table: String,
    config: ClientConfig,
}

impl<B: Backend> TableClient<B> {
    /// Open (and create if absent) the named table.
    pub fn open(backend: B, table: &str) -> Result<Self> {
        Self::with_config(backend, table, ClientConfig::default())
    }

    /// Open with an explicit [`ClientConfig`].
    pub fn with_config(backend: B, table: &str, config: ClientConfig) -> Result<Self> {
        let client = TableClient {
            backend,
            table: table.to_string(),
            config,
        };
        client
            .backend
            .create_table_if_absent(&client.table, client.config.timeout)?;
        Ok(client)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    /// Re-create the table if absent. Idempotent; useful after another
    /// handle deleted it.
    pub fn create_table(&self) -> Result<()> {
        self.backend
            .create_table_if_absent(&self.table, self.config.timeout)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert-or-replace a typed record, returning the assigned write
    /// timestamp. An existing entity with the same key pair is fully
    /// overwritten, never merged.
    pub fn insert<T: TableRecord>(&self, record: &T) -> Result<Timestamp> {
        let entity = codec::encode(record)?;
        self.insert_entity(entity)
    }

    /// Insert-or-replace a raw entity.
    pub fn insert_entity(&self, entity: Entity) -> Result<Timestamp> {
        self.backend
            .put_entity(&self.table, &entity, self.config.timeout)
    }

    /// Insert-or-replace several records as one atomic batch.
    ///
    /// All records must share one partition key; records spanning distinct
    /// partitions fail with
    /// [`BatchError::MixedPartitionKeys`](crate::error::BatchError) before
    /// any backend call. Splitting across partitions is the caller's job,
    /// never this facade's.
    pub fn insert_batch<T: TableRecord>(&self, records: &[T]) -> Result<()> {
        let mut entities = Vec::with_capacity(records.len());
        for record in records {
            entities.push(codec::encode(record)?);
        }
        let partition_key = match entities.first() {
            Some(first) => first.partition_key.clone(),
            None => return Ok(()),
        };
        let mut batch = self.batch(&partition_key);
        for entity in entities {
            batch.put_entity(entity);
        }
        batch.commit()
    }

    /// Start a write batch for one partition.
    pub fn batch(&self, partition_key: &str) -> WriteBatch<'_, B> {
        WriteBatch::new(self, partition_key.to_string())
    }

    /// Delete one entity. Returns `false` (not an error) if it did not
    /// exist.
    pub fn delete(&self, partition_key: &str, row_key: &str) -> Result<bool> {
        self.backend
            .delete_entity(&self.table, partition_key, row_key, self.config.timeout)
    }

    /// Drop the table and everything in it, consuming the client. Returns
    /// `false` if the table did not exist.
    pub fn delete_table(self) -> Result<bool> {
        self.backend.delete_table(&self.table, self.config.timeout)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Point lookup, decoded to a typed record.
    pub fn get<T: TableRecord>(&self, partition_key: &str, row_key: &str) -> Result<Option<T>> {
        match self.get_entity(partition_key, row_key)? {
            Some(entity) => Ok(Some(codec::decode(&entity)?)),
            None => Ok(None),
        }
    }

    /// Point lookup returning the raw entity (with its server timestamp).
    pub fn get_entity(&self, partition_key: &str, row_key: &str) -> Result<Option<Entity>> {
        self.backend
            .get_entity(&self.table, partition_key, row_key, self.config.timeout)
    }

    /// All entities with the given partition key, ordered by server
    /// timestamp descending (ties by row key ascending). The fast path:
    /// touches a single partition.
    pub fn query_by_partition_key<T: TableRecord>(&self, partition_key: &str) -> Result<Vec<T>> {
        self.query(Filter::eq(PARTITION_KEY, partition_key), Order::TimestampDesc)
    }

    /// All entities with the given row key across partitions, ordered by
    /// server timestamp descending.
    ///
    /// Slow path: no index covers row keys alone, so this scans the whole
    /// table.
    pub fn query_by_row_key<T: TableRecord>(&self, row_key: &str) -> Result<Vec<T>> {
        self.query(Filter::eq(ROW_KEY, row_key), Order::TimestampDesc)
    }

    /// All entities whose named attribute equals the given value, in storage
    /// order.
    ///
    /// Slow path: non-key attributes have no index, so this scans the whole
    /// table.
    pub fn query_by_attribute<T: TableRecord>(
        &self,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<Vec<T>> {
        self.query(Filter::eq(name, value), Order::Storage)
    }

    /// All entities matching every `(attribute, value)` pair, in storage
    /// order. Slow path unless one of the pairs is the partition key.
    pub fn query_by_attributes<T, K, V, I>(&self, pairs: I) -> Result<Vec<T>>
    where
        T: TableRecord,
        K: Into<String>,
        V: Into<AttrValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let filters: Vec<Filter> = pairs
            .into_iter()
            .map(|(name, value)| Filter::eq(name, value))
            .collect();
        self.query(Filter::and(filters), Order::Storage)
    }

    /// Run an arbitrary filter with an explicit result order, decoding each
    /// match.
    pub fn query<T: TableRecord>(&self, filter: Filter, order: Order) -> Result<Vec<T>> {
        self.query_entities(&filter, order)?
            .iter()
            .map(codec::decode::<T>)
            .collect()
    }

    /// Run an arbitrary filter, returning raw entities.
    pub fn query_entities(&self, filter: &Filter, order: Order) -> Result<Vec<Entity>> {
        query::execute(
            &self.backend,
            &self.table,
            Some(filter),
            order,
            self.config.timeout,
        )
    }

    /// Every entity in the table, in storage order.
    pub fn scan(&self) -> Result<Vec<Entity>> {
        query::execute(
            &self.backend,
            &self.table,
            None,
            Order::Storage,
            self.config.timeout,
        )
    }
}

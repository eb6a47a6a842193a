//! The embedded key index: an in-memory, partition-aware backend.
//!
//! Tables map partition keys to ordered row maps. Mutations within one
//! partition are serialized by a per-partition mutex, which is what carries
//! batch atomicity; mutations to different partitions proceed in parallel.
//! Write timestamps come from a logical clock that never repeats and never
//! runs behind the wall clock.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use super::Backend;
use crate::batch::{self, BatchOp};
use crate::error::{BatchError, Error, NotFoundError, Result, SchemaError};
use crate::filter::Filter;
use crate::types::{AttrMap, Entity, Timestamp, MAX_ENTITY_SIZE, PARTITION_KEY, ROW_KEY};

/// One stored row: the attribute map plus its server-assigned timestamp.
#[derive(Debug, Clone)]
struct StoredRow {
    attrs: AttrMap,
    timestamp: Timestamp,
}

/// Rows of one partition, ordered by row key.
type Rows = BTreeMap<String, StoredRow>;

#[derive(Default)]
struct TableData {
    /// Partitions ordered by partition key; each guarded by its own mutex.
    partitions: RwLock<BTreeMap<String, Arc<Mutex<Rows>>>>,
}

/// Issues strictly increasing timestamps, floored at the wall clock.
struct LogicalClock {
    last: AtomicI64,
}

impl LogicalClock {
    fn new() -> Self {
        LogicalClock {
            last: AtomicI64::new(0),
        }
    }

    fn next(&self) -> Timestamp {
        let wall = Timestamp::wall();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = prev.saturating_add(1).max(wall);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return Timestamp::from_micros(next),
                Err(observed) => prev = observed,
            }
        }
    }
}

struct Inner {
    tables: RwLock<HashMap<String, Arc<TableData>>>,
    clock: LogicalClock,
}

/// The embedded in-memory backend.
///
/// Cheaply clonable (`Arc`-based) and safe to share across threads.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            inner: Arc::new(Inner {
                tables: RwLock::new(HashMap::new()),
                clock: LogicalClock::new(),
            }),
        }
    }

    fn table(&self, name: &str) -> Result<Arc<TableData>> {
        self.inner
            .tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| NotFoundError::TableNotFound(name.to_string()).into())
    }

    /// Look up a partition's row map.
    fn partition(table: &TableData, partition_key: &str) -> Option<Arc<Mutex<Rows>>> {
        table.partitions.read().get(partition_key).cloned()
    }

    /// Look up a partition's row map, creating it if absent.
    fn partition_or_create(table: &TableData, partition_key: &str) -> Arc<Mutex<Rows>> {
        if let Some(rows) = table.partitions.read().get(partition_key) {
            return rows.clone();
        }
        let mut partitions = table.partitions.write();
        partitions
            .entry(partition_key.to_string())
            .or_default()
            .clone()
    }

    fn to_entity(partition_key: &str, row_key: &str, row: &StoredRow) -> Entity {
        Entity {
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
            attrs: row.attrs.clone(),
            timestamp: Some(row.timestamp),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Write-time entity validation: non-empty keys, bounded serialized size.
fn validate_entity(entity: &Entity) -> Result<()> {
    if entity.partition_key.is_empty() {
        return Err(SchemaError::EmptyKey(PARTITION_KEY.to_string()).into());
    }
    if entity.row_key.is_empty() {
        return Err(SchemaError::EmptyKey(ROW_KEY.to_string()).into());
    }
    let serialized = serde_json::to_vec(&entity.attrs)
        .map_err(|e| SchemaError::InvalidRecord(e.to_string()))?;
    if serialized.len() > MAX_ENTITY_SIZE {
        return Err(SchemaError::EntityTooLarge {
            max: MAX_ENTITY_SIZE,
            actual: serialized.len(),
        }
        .into());
    }
    Ok(())
}

impl Backend for MemoryBackend {
    fn create_table_if_absent(&self, table: &str, _timeout: Duration) -> Result<()> {
        let mut tables = self.inner.tables.write();
        tables.entry(table.to_string()).or_default();
        Ok(())
    }

    fn put_entity(&self, table: &str, entity: &Entity, _timeout: Duration) -> Result<Timestamp> {
        validate_entity(entity)?;
        let table = self.table(table)?;
        let partition = Self::partition_or_create(&table, &entity.partition_key);
        let mut rows = partition.lock();
        let timestamp = self.inner.clock.next();
        rows.insert(
            entity.row_key.clone(),
            StoredRow {
                attrs: entity.attrs.clone(),
                timestamp,
            },
        );
        Ok(timestamp)
    }

    fn get_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        _timeout: Duration,
    ) -> Result<Option<Entity>> {
        let table = self.table(table)?;
        let partition = match Self::partition(&table, partition_key) {
            Some(partition) => partition,
            None => return Ok(None),
        };
        let rows = partition.lock();
        Ok(rows
            .get(row_key)
            .map(|row| Self::to_entity(partition_key, row_key, row)))
    }

    fn delete_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        _timeout: Duration,
    ) -> Result<bool> {
        let table = self.table(table)?;
        let partition = match Self::partition(&table, partition_key) {
            Some(partition) => partition,
            None => return Ok(false),
        };
        let mut rows = partition.lock();
        Ok(rows.remove(row_key).is_some())
    }

    fn scan(
        &self,
        table: &str,
        filter: Option<&Filter>,
        _timeout: Duration,
    ) -> Result<Vec<Entity>> {
        let table = self.table(table)?;
        let handles: Vec<(String, Arc<Mutex<Rows>>)> = table
            .partitions
            .read()
            .iter()
            .map(|(pk, rows)| (pk.clone(), rows.clone()))
            .collect();

        let mut entities = Vec::new();
        for (partition_key, partition) in handles {
            let rows = partition.lock();
            for (row_key, row) in rows.iter() {
                let entity = Self::to_entity(&partition_key, row_key, row);
                if filter.map_or(true, |f| f.matches(&entity)) {
                    entities.push(entity);
                }
            }
        }
        Ok(entities)
    }

    fn scan_partition(
        &self,
        table: &str,
        partition_key: &str,
        _timeout: Duration,
    ) -> Result<Vec<Entity>> {
        let table = self.table(table)?;
        let partition = match Self::partition(&table, partition_key) {
            Some(partition) => partition,
            None => return Ok(Vec::new()),
        };
        let rows = partition.lock();
        Ok(rows
            .iter()
            .map(|(row_key, row)| Self::to_entity(partition_key, row_key, row))
            .collect())
    }

    fn batch_write(
        &self,
        table: &str,
        partition_key: &str,
        ops: Vec<BatchOp>,
        _timeout: Duration,
    ) -> Result<()> {
        batch::validate(partition_key, &ops).map_err(Error::from)?;
        let table = self.table(table)?;
        let partition = Self::partition_or_create(&table, partition_key);
        let mut rows = partition.lock();

        // Apply to a copy; swap in only on full success.
        let mut staged = rows.clone();
        for (index, op) in ops.into_iter().enumerate() {
            self.apply(&mut staged, op).map_err(|source| {
                Error::from(BatchError::OperationFailed {
                    index,
                    source: Box::new(source),
                })
            })?;
        }
        *rows = staged;
        Ok(())
    }

    fn delete_table(&self, table: &str, _timeout: Duration) -> Result<bool> {
        let mut tables = self.inner.tables.write();
        Ok(tables.remove(table).is_some())
    }
}

impl MemoryBackend {
    fn apply(&self, staged: &mut Rows, op: BatchOp) -> Result<()> {
        match op {
            BatchOp::Put(entity) => {
                validate_entity(&entity)?;
                let timestamp = self.inner.clock.next();
                staged.insert(
                    entity.row_key,
                    StoredRow {
                        attrs: entity.attrs,
                        timestamp,
                    },
                );
            }
            BatchOp::Delete { row_key } => {
                staged.remove(&row_key);
            }
        }
        Ok(())
    }
}

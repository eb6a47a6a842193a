//! Query planning and result ordering.
//!
//! A query either routes to a partition-local scan (when a conjunct pins
//! `PartitionKey` by equality) or falls back to a full-table scan with the
//! predicate pushed down to the backend. Full scans are the documented slow
//! path: no secondary index covers non-key attributes.

use std::time::Duration;

use crate::backend::Backend;
use crate::error::Result;
use crate::filter::Filter;
use crate::types::Entity;

/// Result ordering applied after retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Partition key ascending, then row key ascending.
    #[default]
    RowKeyAsc,
    /// Server timestamp descending; ties broken by row key ascending.
    TimestampDesc,
    /// Whatever order the backend returned.
    Storage,
}

/// Execute a query against one table.
///
/// When the filter pins a partition key, only that partition is scanned and
/// the remaining conjuncts narrow the candidate set in place; the full table
/// is never re-scanned per predicate.
pub(crate) fn execute<B: Backend>(
    backend: &B,
    table: &str,
    filter: Option<&Filter>,
    order: Order,
    timeout: Duration,
) -> Result<Vec<Entity>> {
    let mut entities = match filter {
        Some(f) => match f.partition_key_eq() {
            Some(pk) => {
                let pk = pk.to_string();
                let candidates = backend.scan_partition(table, &pk, timeout)?;
                match f.residual() {
                    Some(residual) => candidates
                        .into_iter()
                        .filter(|e| residual.matches(e))
                        .collect(),
                    None => candidates,
                }
            }
            None => backend.scan(table, Some(f), timeout)?,
        },
        None => backend.scan(table, None, timeout)?,
    };

    match order {
        Order::Storage => {}
        Order::RowKeyAsc => {
            entities.sort_by(|a, b| {
                a.partition_key
                    .cmp(&b.partition_key)
                    .then_with(|| a.row_key.cmp(&b.row_key))
            });
        }
        Order::TimestampDesc => sort_timestamp_desc(&mut entities),
    }

    Ok(entities)
}

/// Stable sort by server timestamp descending, ties by row key ascending.
pub(crate) fn sort_timestamp_desc(entities: &mut [Entity]) {
    entities.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.row_key.cmp(&b.row_key))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::types::{Timestamp, PARTITION_KEY, ROW_KEY};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend
            .create_table_if_absent("geo", TIMEOUT)
            .unwrap();
        for (pk, rk, continent) in [
            ("41", "30", "Europe"),
            ("41", "29", "Europe"),
            ("36", "140", "Asia"),
        ] {
            backend
                .put_entity(
                    "geo",
                    &Entity::new(pk, rk).with_attr("Continent", continent),
                    TIMEOUT,
                )
                .unwrap();
        }
        backend
    }

    fn keys(entities: &[Entity]) -> Vec<(&str, &str)> {
        entities
            .iter()
            .map(|e| (e.partition_key.as_str(), e.row_key.as_str()))
            .collect()
    }

    #[test]
    fn test_partition_scan_fast_path() {
        let backend = seeded();
        let filter = Filter::eq(PARTITION_KEY, "41");
        let result = execute(&backend, "geo", Some(&filter), Order::RowKeyAsc, TIMEOUT).unwrap();
        assert_eq!(keys(&result), vec![("41", "29"), ("41", "30")]);
    }

    #[test]
    fn test_partition_scan_with_residual() {
        let backend = seeded();
        let filter = Filter::and(vec![
            Filter::eq(PARTITION_KEY, "41"),
            Filter::eq(ROW_KEY, "30"),
        ]);
        let result = execute(&backend, "geo", Some(&filter), Order::RowKeyAsc, TIMEOUT).unwrap();
        assert_eq!(keys(&result), vec![("41", "30")]);
    }

    #[test]
    fn test_full_scan_slow_path() {
        let backend = seeded();
        let filter = Filter::eq("Continent", "Asia");
        let result = execute(&backend, "geo", Some(&filter), Order::Storage, TIMEOUT).unwrap();
        assert_eq!(keys(&result), vec![("36", "140")]);
    }

    #[test]
    fn test_no_filter_scans_everything() {
        let backend = seeded();
        let result = execute(&backend, "geo", None, Order::RowKeyAsc, TIMEOUT).unwrap();
        assert_eq!(
            keys(&result),
            vec![("36", "140"), ("41", "29"), ("41", "30")]
        );
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let backend = seeded();
        let filter = Filter::eq(PARTITION_KEY, "99");
        let result = execute(&backend, "geo", Some(&filter), Order::RowKeyAsc, TIMEOUT).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let backend = MemoryBackend::new();
        let result = execute(&backend, "nope", None, Order::Storage, TIMEOUT);
        assert!(result.is_err());
    }

    #[test]
    fn test_timestamp_desc_tie_break() {
        let mut entities = vec![
            {
                let mut e = Entity::new("41", "30");
                e.timestamp = Some(Timestamp::from_micros(100));
                e
            },
            {
                let mut e = Entity::new("41", "29");
                e.timestamp = Some(Timestamp::from_micros(100));
                e
            },
            {
                let mut e = Entity::new("41", "10");
                e.timestamp = Some(Timestamp::from_micros(50));
                e
            },
        ];
        sort_timestamp_desc(&mut entities);
        let order: Vec<&str> = entities.iter().map(|e| e.row_key.as_str()).collect();
        // Equal timestamps order by row key ascending; older entries last.
        assert_eq!(order, vec!["29", "30", "10"]);
    }

    #[test]
    fn test_timestamp_desc_orders_latest_first() {
        let backend = seeded();
        let filter = Filter::eq(PARTITION_KEY, "41");
        let result =
            execute(&backend, "geo", Some(&filter), Order::TimestampDesc, TIMEOUT).unwrap();
        // Seed order wrote ("41","30") before ("41","29"), so "29" is newest.
        assert_eq!(keys(&result), vec![("41", "29"), ("41", "30")]);
    }
}

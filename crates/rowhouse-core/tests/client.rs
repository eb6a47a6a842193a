//! End-to-end tests driving the public client surface against the embedded
//! backend.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use rowhouse_core::{
    AttrType, AttrValue, BatchError, Entity, Error, Filter, MemoryBackend, NotFoundError, Order,
    RecordSchema, TableClient, TableRecord, Timestamp, MAX_ENTITY_SIZE, PARTITION_KEY,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GeoLocation {
    latitude: String,  // partition key
    longitude: String, // row key
    continent: String,
    country: Option<String>,
    city: Option<String>,
}

impl TableRecord for GeoLocation {
    fn schema() -> RecordSchema {
        RecordSchema::new("latitude", "longitude")
            .attr("continent", AttrType::String)
            .optional_attr("country", AttrType::String)
            .optional_attr("city", AttrType::String)
    }
}

fn geo(lat: &str, lon: &str, continent: &str) -> GeoLocation {
    GeoLocation {
        latitude: lat.to_string(),
        longitude: lon.to_string(),
        continent: continent.to_string(),
        country: None,
        city: None,
    }
}

fn client() -> TableClient<MemoryBackend> {
    TableClient::open(MemoryBackend::new(), "geo-locations").unwrap()
}

fn wall_now() -> Timestamp {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_micros() as i64;
    Timestamp::from_micros(micros)
}

#[test]
fn test_insert_then_get_sees_fresh_timestamp() {
    let client = client();
    let before = wall_now();

    client.insert(&geo("41", "29", "Europe")).unwrap();

    let stored = client.get_entity("41", "29").unwrap().unwrap();
    let ts = stored.timestamp.expect("store assigns a timestamp");
    assert!(
        ts >= before,
        "write timestamp {ts:?} behind pre-insert clock {before:?}"
    );
    let record: GeoLocation = client.get("41", "29").unwrap().unwrap();
    assert_eq!(record, geo("41", "29", "Europe"));
}

#[test]
fn test_upsert_replaces_and_advances_timestamp() {
    let client = client();

    let mut first = geo("41", "29", "Europe");
    first.country = Some("Turkey".to_string());
    let ts1 = client.insert(&first).unwrap();

    // Second write carries a different attribute set; only it survives.
    let second = geo("41", "29", "Europe");
    let ts2 = client.insert(&second).unwrap();
    assert!(ts2 > ts1);

    let stored = client.get_entity("41", "29").unwrap().unwrap();
    assert!(stored.attr("country").is_none());
    assert_eq!(stored.timestamp, Some(ts2));
}

#[test]
fn test_batch_atomicity_failing_middle_op() {
    let client = client();
    client.insert(&geo("41", "50", "Europe")).unwrap();

    let mut batch = client.batch("41");
    batch.put(&geo("41", "29", "Europe")).unwrap();
    batch.put_entity(Entity::new("41", "30").with_attr("Blob", vec![0u8; MAX_ENTITY_SIZE + 1]));
    batch.delete("50");

    let err = batch.commit().unwrap_err();
    assert!(matches!(
        err,
        Error::Batch(BatchError::OperationFailed { index: 1, .. })
    ));

    // No effect from any operation in the failed batch.
    assert!(client.get_entity("41", "29").unwrap().is_none());
    assert!(client.get_entity("41", "30").unwrap().is_none());
    assert!(client.get_entity("41", "50").unwrap().is_some());
}

#[test]
fn test_batch_mixed_partitions_rejected_before_storage() {
    let client = client();
    let result = client.insert_batch(&[geo("41", "29", "Europe"), geo("36", "140", "Asia")]);
    assert!(matches!(
        result,
        Err(Error::Batch(BatchError::MixedPartitionKeys { .. }))
    ));
    assert!(client.get_entity("41", "29").unwrap().is_none());
    assert!(client.get_entity("36", "140").unwrap().is_none());
}

#[test]
fn test_partition_query_ordered_by_timestamp_desc() {
    let client = client();
    client.insert(&geo("41", "30", "Europe")).unwrap();
    client.insert(&geo("41", "29", "Europe")).unwrap();
    client.insert(&geo("36", "140", "Asia")).unwrap();

    let rows: Vec<GeoLocation> = client.query_by_partition_key("41").unwrap();
    let keys: Vec<&str> = rows.iter().map(|g| g.longitude.as_str()).collect();
    // "29" was written after "30", so it comes first.
    assert_eq!(keys, vec!["29", "30"]);
}

#[test]
fn test_partition_query_reflects_overwrite_recency() {
    let client = client();
    client.insert(&geo("41", "30", "Europe")).unwrap();
    client.insert(&geo("41", "29", "Europe")).unwrap();

    // Overwriting "30" makes it the newest entity in the partition.
    client.insert(&geo("41", "30", "Europe")).unwrap();
    let rows: Vec<GeoLocation> = client.query_by_partition_key("41").unwrap();
    let keys: Vec<&str> = rows.iter().map(|g| g.longitude.as_str()).collect();
    assert_eq!(keys, vec!["30", "29"]);
}

#[test]
fn test_delete_semantics() {
    let client = client();

    // Absent pair: false, table unchanged.
    assert!(!client.delete("41", "29").unwrap());
    assert!(client.scan().unwrap().is_empty());

    client.insert(&geo("41", "29", "Europe")).unwrap();
    assert!(client.delete("41", "29").unwrap());
    assert!(client.get_entity("41", "29").unwrap().is_none());
}

#[test]
fn test_geo_scenario() {
    let client = client();
    client.insert(&geo("41", "29", "Europe")).unwrap();
    client.insert(&geo("41", "30", "Europe")).unwrap();
    client.insert(&geo("36", "140", "Asia")).unwrap();

    let by_partition: Vec<GeoLocation> = client.query_by_partition_key("41").unwrap();
    let mut keys: Vec<&str> = by_partition.iter().map(|g| g.longitude.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["29", "30"]);

    let by_row: Vec<GeoLocation> = client.query_by_row_key("140").unwrap();
    assert_eq!(by_row.len(), 1);
    assert_eq!(by_row[0].latitude, "36");

    let europe: Vec<GeoLocation> = client.query_by_attribute("continent", "Europe").unwrap();
    let keys: Vec<(&str, &str)> = europe
        .iter()
        .map(|g| (g.latitude.as_str(), g.longitude.as_str()))
        .collect();
    // Storage order: partition key ascending, then row key ascending.
    assert_eq!(keys, vec![("41", "29"), ("41", "30")]);
}

#[test]
fn test_query_with_explicit_filter_and_order() {
    let client = client();
    client.insert(&geo("41", "30", "Europe")).unwrap();
    client.insert(&geo("41", "29", "Europe")).unwrap();

    let entities = client
        .query_entities(&Filter::eq(PARTITION_KEY, "41"), Order::RowKeyAsc)
        .unwrap();
    let keys: Vec<&str> = entities.iter().map(|e| e.row_key.as_str()).collect();
    assert_eq!(keys, vec!["29", "30"]);

    let narrowed = client
        .query_entities(
            &Filter::and(vec![
                Filter::eq(PARTITION_KEY, "41"),
                Filter::ge("Timestamp", Timestamp::from_micros(0)),
                Filter::eq("continent", "Europe"),
            ]),
            Order::TimestampDesc,
        )
        .unwrap();
    assert_eq!(narrowed.len(), 2);
    assert_eq!(narrowed[0].row_key, "29");
}

#[test]
fn test_query_on_deleted_table_is_not_found() {
    let backend = MemoryBackend::new();
    let client = TableClient::open(backend.clone(), "geo-locations").unwrap();
    client.insert(&geo("41", "29", "Europe")).unwrap();

    // Delete the table out from under a second client handle.
    let other = TableClient::open(backend.clone(), "geo-locations").unwrap();
    assert!(other.delete_table().unwrap());

    let result: rowhouse_core::Result<Vec<GeoLocation>> = client.query_by_partition_key("41");
    assert!(matches!(
        result,
        Err(Error::NotFound(NotFoundError::TableNotFound(_)))
    ));
}

#[test]
fn test_raw_entity_surface() {
    let client = client();
    client
        .insert_entity(
            Entity::new("41", "29")
                .with_attr("Continent", "Europe")
                .with_attr("Population", 15_000_000.0)
                .with_attr("Capital", false),
        )
        .unwrap();

    let entities = client
        .query_entities(
            &Filter::and(vec![
                Filter::gt("Population", 1_000_000.0),
                Filter::eq("Capital", false),
            ]),
            Order::Storage,
        )
        .unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(
        entities[0].attr("Continent"),
        Some(&AttrValue::from("Europe"))
    );
}

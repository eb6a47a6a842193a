//! # rowhouse
//!
//! A minimal key-value table store with partition/row addressing, plus a
//! typed client facade over it.
//!
//! Entities are attribute maps identified by a `(PartitionKey, RowKey)`
//! string pair. Tables are partitioned by partition key and ordered by row
//! key within a partition; the partition is the unit of scan locality and
//! of atomic batch mutation. Storage sits behind the narrow [`Backend`]
//! trait: the crate ships the embedded [`MemoryBackend`], and remote table
//! services implement the same trait.
//!
//! ## Quick Start
//!
//! ```
//! use rowhouse_core::{AttrType, MemoryBackend, RecordSchema, TableClient, TableRecord};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct GeoLocation {
//!     latitude: String,  // partition key
//!     longitude: String, // row key
//!     continent: String,
//! }
//!
//! impl TableRecord for GeoLocation {
//!     fn schema() -> RecordSchema {
//!         RecordSchema::new("latitude", "longitude").attr("continent", AttrType::String)
//!     }
//! }
//!
//! let client = TableClient::open(MemoryBackend::new(), "geo-locations").unwrap();
//!
//! client
//!     .insert(&GeoLocation {
//!         latitude: "41".to_string(),
//!         longitude: "29".to_string(),
//!         continent: "Europe".to_string(),
//!     })
//!     .unwrap();
//!
//! // Point lookup: the fast path.
//! let found: Option<GeoLocation> = client.get("41", "29").unwrap();
//! assert_eq!(found.unwrap().continent, "Europe");
//!
//! // Partition query: fast. Attribute query: a documented full scan.
//! let by_partition: Vec<GeoLocation> = client.query_by_partition_key("41").unwrap();
//! assert_eq!(by_partition.len(), 1);
//! ```

pub mod backend;
pub mod batch;
pub mod client;
pub mod codec;
pub mod error;
pub mod filter;
pub mod query;
pub mod types;

pub use backend::{Backend, MemoryBackend};
pub use batch::{BatchOp, WriteBatch};
pub use client::{ClientConfig, TableClient, DEFAULT_TIMEOUT};
pub use codec::{AttrDef, RecordSchema, TableRecord};
pub use error::{
    BackendError, BatchError, Error, NotFoundError, Result, SchemaError, TimeoutError,
};
pub use filter::Filter;
pub use query::Order;
pub use types::{
    AttrMap, AttrType, AttrValue, Entity, Timestamp, MAX_BATCH_OPERATIONS, MAX_ENTITY_SIZE,
    PARTITION_KEY, ROW_KEY, TIMESTAMP,
};

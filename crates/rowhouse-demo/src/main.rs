//! rowhouse demonstration binary.
//!
//! Walks the geo-locations scenario against the embedded backend: single
//! insert, batched inserts (including a rejected mixed-partition batch),
//! point lookup, partition / row-key / attribute queries, delete, and
//! table deletion.

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rowhouse_core::{
    AttrType, Error, MemoryBackend, RecordSchema, TableClient, TableRecord,
};

#[derive(Parser, Debug)]
#[command(name = "rowhouse-demo", version)]
struct Args {
    /// Table name to create and populate.
    #[arg(long, default_value = "geo-locations")]
    table: String,

    /// Keep the table at the end instead of deleting it.
    #[arg(long)]
    keep_table: bool,
}

/// Latitude serves as the partition key, longitude as the row key: queries
/// by latitude touch one partition, everything else scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoLocation {
    latitude: String,
    longitude: String,
    continent: String,
    country: String,
    city: String,
}

impl TableRecord for GeoLocation {
    fn schema() -> RecordSchema {
        RecordSchema::new("latitude", "longitude")
            .attr("continent", AttrType::String)
            .attr("country", AttrType::String)
            .attr("city", AttrType::String)
    }
}

fn location(
    latitude: &str,
    longitude: &str,
    continent: &str,
    country: &str,
    city: &str,
) -> GeoLocation {
    GeoLocation {
        latitude: latitude.to_string(),
        longitude: longitude.to_string(),
        continent: continent.to_string(),
        country: country.to_string(),
        city: city.to_string(),
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = TableClient::open(MemoryBackend::new(), &args.table)?;
    info!(table = %args.table, "opened table");

    // Single insert.
    let ts = client.insert(&location("41", "29", "Europe", "Turkey", "Istanbul"))?;
    info!(timestamp = ts.as_micros(), "inserted Istanbul");

    // A batch may only touch one partition; this one is rejected up front.
    let mixed = client.insert_batch(&[
        location("36", "140", "Asia", "Japan", "Tokyo"),
        location("40", "-74", "North America", "United States", "New York"),
    ]);
    match mixed {
        Err(err) => warn!(%err, "mixed-partition batch rejected as expected"),
        Ok(()) => unreachable!("mixed-partition batch must not commit"),
    }

    // One batch per partition commits fine.
    client.insert_batch(&[location("36", "140", "Asia", "Japan", "Tokyo")])?;
    client.insert_batch(&[location(
        "40", "-74", "North America", "United States", "New York",
    )])?;
    info!("batch-inserted Tokyo and New York");

    // Point lookup: the fast path.
    let istanbul: Option<GeoLocation> = client.get("41", "29")?;
    info!(?istanbul, "get by key pair");

    // Partition query: fast, single-partition scan.
    let by_latitude: Vec<GeoLocation> = client.query_by_partition_key("41")?;
    info!(count = by_latitude.len(), "query by latitude (partition key)");

    // Row-key query: full scan under the hood.
    let by_longitude: Vec<GeoLocation> = client.query_by_row_key("140")?;
    for loc in &by_longitude {
        info!(city = %loc.city, "query by longitude (row key, slow path)");
    }

    // Attribute query: full scan, storage order.
    let in_turkey: Vec<GeoLocation> = client.query_by_attribute("country", "Turkey")?;
    info!(count = in_turkey.len(), "query by country (slow path)");

    // Delete one entity, then the table.
    let removed = client.delete("40", "-74")?;
    info!(removed, "deleted New York");

    if args.keep_table {
        info!(entities = client.scan()?.len(), "keeping table");
    } else {
        let existed = client.delete_table()?;
        info!(existed, "deleted table");
    }

    Ok(())
}

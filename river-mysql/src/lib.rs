//! Source-side replication client: registers as a MySQL replica, decodes
//! the binlog stream, and discovers table schemas via `information_schema`
//! (SPEC_FULL §4.7).

pub mod client;
pub mod position;
pub mod schema;
pub mod sink;

pub use client::BinlogClient;
pub use position::BinlogPosition;
pub use schema::TableMetadataProvider;
pub use sink::RiverEventSink;

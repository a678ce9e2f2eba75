//! The binlog's own position shape, and its mapping to the crate-agnostic
//! [`river_sync::ReplicationPosition`].

use river_sync::ReplicationPosition;

/// A point in one source's binlog: the active file plus byte offset within
/// it, exactly as reported by `ROTATE_EVENT`/event headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinlogPosition {
    pub binlog_file: String,
    pub position: u32,
}

impl BinlogPosition {
    pub fn new(binlog_file: impl Into<String>, position: u32) -> Self {
        BinlogPosition {
            binlog_file: binlog_file.into(),
            position,
        }
    }
}

impl From<&BinlogPosition> for ReplicationPosition {
    fn from(value: &BinlogPosition) -> Self {
        ReplicationPosition::new(value.binlog_file.clone(), value.position)
    }
}

impl From<BinlogPosition> for ReplicationPosition {
    fn from(value: BinlogPosition) -> Self {
        ReplicationPosition::new(value.binlog_file, value.position)
    }
}

impl From<&ReplicationPosition> for BinlogPosition {
    fn from(value: &ReplicationPosition) -> Self {
        BinlogPosition::new(value.log_name.clone(), value.offset)
    }
}

impl From<ReplicationPosition> for BinlogPosition {
    fn from(value: ReplicationPosition) -> Self {
        BinlogPosition::new(value.log_name, value.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_replication_position() {
        let binlog = BinlogPosition::new("mysql-bin.000003", 451);
        let pos: ReplicationPosition = binlog.clone().into();
        let back: BinlogPosition = pos.into();
        assert_eq!(binlog, back);
    }
}

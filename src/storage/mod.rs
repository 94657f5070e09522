// Snapshot persistence: write-once dataset artifacts plus an index of them.

pub mod snapshot;
pub mod sqlite;

pub use snapshot::{load_binary, load_csv, load_raw, SnapshotPaths, SnapshotWriter};
pub use sqlite::{SnapshotIndex, SnapshotRecord};

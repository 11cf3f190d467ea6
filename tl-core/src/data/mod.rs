//! Validation and storage
//!
//! Device id checks, the JSON-lines reading store and the daily snapshot feed.

mod snapshot;
mod store;
mod validation;

pub use snapshot::{utc_day, JsonSnapshotFeed, SnapshotFeed, SnapshotFile};
pub use store::{PersistenceSink, ReadingStore, StoredReading};
pub use validation::{family_prefix, is_device_id, validate_device_id, validate_file_size};

#[cfg(test)]
pub use snapshot::MockSnapshotFeed;
#[cfg(test)]
pub use store::MockPersistenceSink;

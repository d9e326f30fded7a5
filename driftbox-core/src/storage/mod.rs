//! Storage modules for Driftbox
//!
//! Tier placement, disk-tier file storage and the blob store that ties
//! metadata, memory content and expiry together.

pub mod blob_store;
pub mod disk_store;
pub mod placement;
pub mod record;

pub use blob_store::{BlobStore, StoreStats, SweepReport};
pub use disk_store::DiskStore;
pub use placement::choose_placement;
pub use record::{BlobLocation, BlobRecord, Tier};

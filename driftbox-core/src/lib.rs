//! Driftbox Core - ephemeral tiered blob storage for upload services
//!
//! Blobs are admitted to memory while a fixed budget allows and to disk
//! otherwise, expire a fixed TTL after creation, and are reclaimed lazily on
//! read and by a background sweeper.

pub mod clock;
pub mod config;
pub mod content_type;
pub mod error;
pub mod id;
pub mod operations;
pub mod storage;
pub mod sweeper;
pub mod transform;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    DEFAULT_DISK_PATH, DEFAULT_MEMORY_BUDGET_BYTES, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL,
    StoreConfig,
};
pub use content_type::{DEFAULT_CONTENT_TYPE, resolve_content_type};
pub use error::{DriftError, Result};
pub use id::generate_id;
pub use operations::{
    DeleteBlobOperation, DeleteBlobOperationRequest, PutBlobOperation, PutBlobOperationRequest,
    PutBlobOperationResult, ReadBlobOperation, ReadBlobOperationOutcome, ReadBlobOperationRequest,
    ReadBlobOperationResult,
};
pub use storage::{
    BlobLocation, BlobRecord, BlobStore, DiskStore, StoreStats, SweepReport, Tier,
    choose_placement,
};
pub use sweeper::{Sweeper, SweeperHandle};
pub use transform::{PassthroughTransform, Transform, TransformInput, TransformOutput};

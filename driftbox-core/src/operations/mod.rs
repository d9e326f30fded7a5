pub mod delete_blob;
pub mod put_blob;
pub mod read_blob;

pub use delete_blob::{DeleteBlobOperation, DeleteBlobOperationRequest};
pub use put_blob::{PutBlobOperation, PutBlobOperationRequest, PutBlobOperationResult};
pub use read_blob::{
    ReadBlobOperation, ReadBlobOperationOutcome, ReadBlobOperationRequest, ReadBlobOperationResult,
};

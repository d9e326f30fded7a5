use crate::{BlobRecord, BlobStore, DriftError, Result};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReadBlobOperation {
    store: Arc<BlobStore>,
}

#[derive(Debug, Clone)]
pub struct ReadBlobOperationRequest {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct ReadBlobOperationResult {
    pub record: BlobRecord,
    pub body: Bytes,
}

/// Unknown and expired ids are both `NotFound`; callers cannot tell them apart.
#[derive(Debug, Clone)]
pub enum ReadBlobOperationOutcome {
    Found(ReadBlobOperationResult),
    NotFound,
}

impl ReadBlobOperation {
    pub fn new(store: Arc<BlobStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self, request: ReadBlobOperationRequest) -> Result<ReadBlobOperationOutcome> {
        match self.store.get(&request.id).await {
            Ok((record, body)) => Ok(ReadBlobOperationOutcome::Found(ReadBlobOperationResult {
                record,
                body,
            })),
            Err(DriftError::NotFound(_)) => Ok(ReadBlobOperationOutcome::NotFound),
            Err(error) => Err(error),
        }
    }
}

use crate::{BlobStore, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct DeleteBlobOperation {
    store: Arc<BlobStore>,
}

#[derive(Debug, Clone)]
pub struct DeleteBlobOperationRequest {
    pub id: String,
}

impl DeleteBlobOperation {
    pub fn new(store: Arc<BlobStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self, request: DeleteBlobOperationRequest) -> Result<()> {
        self.store.delete(&request.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreConfig;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_delete_twice() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(BlobStore::open(&StoreConfig::new(dir.path())).unwrap());
        let record = store.put(Bytes::from_static(b"abc"), "a", "").await.unwrap();
        let operation = DeleteBlobOperation::new(store.clone());

        for _ in 0..2 {
            operation
                .run(DeleteBlobOperationRequest {
                    id: record.id.clone(),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.stats().await.records, 0);
    }
}

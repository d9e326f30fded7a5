use crate::content_type::resolve_content_type;
use crate::{BlobRecord, BlobStore, Result, Transform, TransformInput};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Clone)]
pub struct PutBlobOperation {
    store: Arc<BlobStore>,
    transform: Arc<dyn Transform>,
}

#[derive(Debug, Clone)]
pub struct PutBlobOperationRequest {
    pub content: Bytes,
    pub file_name: String,
    pub content_type: Option<String>,
    pub target_format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PutBlobOperationResult {
    pub record: BlobRecord,
    pub original_name: String,
}

impl PutBlobOperation {
    pub fn new(store: Arc<BlobStore>, transform: Arc<dyn Transform>) -> Self {
        Self { store, transform }
    }

    pub async fn run(&self, request: PutBlobOperationRequest) -> Result<PutBlobOperationResult> {
        let PutBlobOperationRequest {
            content,
            file_name,
            content_type,
            target_format,
        } = request;

        let original_name = file_name.clone();
        let output = self
            .transform
            .apply(TransformInput {
                content,
                file_name,
                content_type,
                target_format,
            })
            .await?;

        let content_type =
            resolve_content_type(output.content_type.as_deref(), &output.display_name);
        let record = self
            .store
            .put(output.content, output.display_name, content_type)
            .await?;

        tracing::debug!(
            "Accepted upload {} as blob {} ({} bytes, {})",
            original_name,
            record.id,
            record.size_bytes,
            record.tier()
        );

        Ok(PutBlobOperationResult {
            record,
            original_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DriftError, PassthroughTransform, StoreConfig, Tier, TransformOutput};
    use async_trait::async_trait;

    struct RenamingTransform;

    #[async_trait]
    impl Transform for RenamingTransform {
        async fn apply(&self, input: TransformInput) -> Result<TransformOutput> {
            let mut upper = input.content.to_vec();
            upper.make_ascii_uppercase();
            Ok(TransformOutput {
                content: Bytes::from(upper),
                display_name: "converted.txt".to_string(),
                content_type: None,
            })
        }
    }

    fn store(dir: &tempfile::TempDir) -> Arc<BlobStore> {
        Arc::new(BlobStore::open(&StoreConfig::new(dir.path()).with_memory_budget(1024)).unwrap())
    }

    #[tokio::test]
    async fn test_put_stores_transform_output() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let operation = PutBlobOperation::new(store.clone(), Arc::new(RenamingTransform));

        let result = operation
            .run(PutBlobOperationRequest {
                content: Bytes::from_static(b"hello"),
                file_name: "hello.md".to_string(),
                content_type: Some("text/markdown".to_string()),
                target_format: Some("txt".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(result.original_name, "hello.md");
        assert_eq!(result.record.display_name, "converted.txt");
        assert_eq!(result.record.content_type, "text/plain");
        assert_eq!(result.record.tier(), Tier::Memory);

        let (_, body) = store.get(&result.record.id).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"HELLO"));
    }

    #[tokio::test]
    async fn test_rejected_transform_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let operation = PutBlobOperation::new(store.clone(), Arc::new(PassthroughTransform));

        let err = operation
            .run(PutBlobOperationRequest {
                content: Bytes::from_static(b"data"),
                file_name: "a.png".to_string(),
                content_type: None,
                target_format: Some("gif".to_string()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DriftError::InvalidRequest(_)));
        assert_eq!(store.stats().await.records, 0);
    }
}

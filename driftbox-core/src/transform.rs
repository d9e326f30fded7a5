//! Seam for the byte transform that runs before a blob is stored.
//!
//! The store never looks inside a transform. The service ships with a
//! passthrough; real converters plug in behind the same trait.

use crate::content_type::extension_of;
use crate::error::{DriftError, Result};
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct TransformInput {
    pub content: Bytes,
    pub file_name: String,
    pub content_type: Option<String>,
    pub target_format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub content: Bytes,
    pub display_name: String,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, input: TransformInput) -> Result<TransformOutput>;
}

/// Returns the upload unchanged. Only a target format matching the source
/// extension (or none at all) is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTransform;

#[async_trait]
impl Transform for PassthroughTransform {
    async fn apply(&self, input: TransformInput) -> Result<TransformOutput> {
        if let Some(target) = normalized_target(input.target_format.as_deref()) {
            let source = extension_of(&input.file_name).unwrap_or_default();
            if source != target {
                return Err(DriftError::InvalidRequest(format!(
                    "conversion from {} to {} is not supported",
                    if source.is_empty() { "unknown" } else { source.as_str() },
                    target
                )));
            }
        }

        Ok(TransformOutput {
            content: input.content,
            display_name: input.file_name,
            content_type: input.content_type,
        })
    }
}

fn normalized_target(target: Option<&str>) -> Option<String> {
    target
        .map(|t| t.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(file_name: &str, target: Option<&str>) -> TransformInput {
        TransformInput {
            content: Bytes::from_static(b"\x89PNG"),
            file_name: file_name.to_string(),
            content_type: Some("image/png".to_string()),
            target_format: target.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_passthrough_without_target() {
        let output = PassthroughTransform.apply(input("pic.png", None)).await.unwrap();
        assert_eq!(output.content, Bytes::from_static(b"\x89PNG"));
        assert_eq!(output.display_name, "pic.png");
        assert_eq!(output.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_passthrough_same_format() {
        let output = PassthroughTransform
            .apply(input("pic.PNG", Some(".png")))
            .await
            .unwrap();
        assert_eq!(output.display_name, "pic.PNG");
    }

    #[tokio::test]
    async fn test_passthrough_rejects_real_conversion() {
        let err = PassthroughTransform
            .apply(input("pic.png", Some("jpg")))
            .await
            .unwrap_err();
        assert!(matches!(err, DriftError::InvalidRequest(ref msg) if msg == "conversion from png to jpg is not supported"));
    }
}

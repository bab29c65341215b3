//! S3 object store implementation.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{MetadataDirective, ObjectCannedAcl, StorageClass};
use bytes::Bytes;
use tracing::debug;

use sitesync_core::{Error, RemoteAttributes, Result, Rules};

use crate::ObjectStore;

/// Object store backed by an S3 (or S3-compatible) bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client for the project's bucket, honouring the region and
    /// endpoint overrides from the rules file. Credentials come from the
    /// standard AWS environment/profile chain.
    pub async fn connect(rules: &Rules) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &rules.aws.region_name {
            loader = loader.region(aws_sdk_s3::config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &rules.aws.s3_endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket: rules.aws.s3_bucket_name.clone(),
        }
    }

    fn is_not_found(message: &str) -> bool {
        message.contains("NoSuchKey")
            || message.contains("NotFound")
            || message.contains("status: 404")
    }

    fn classify(op: &'static str, key: &str, message: String) -> Error {
        let lower = message.to_ascii_lowercase();
        if lower.contains("credential")
            || lower.contains("accessdenied")
            || lower.contains("signature")
            || lower.contains("unauthorized")
            || lower.contains("forbidden")
            || lower.contains("403")
        {
            Error::Credentials(message)
        } else {
            Error::Transport {
                op,
                key: key.to_string(),
                reason: message,
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        debug!(key, "fetching object");
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        let out = match out {
            Ok(out) => out,
            Err(e) => {
                let message = DisplayErrorContext(&e).to_string();
                if Self::is_not_found(&message) {
                    return Ok(None);
                }
                return Err(Self::classify("reading", key, message));
            }
        };
        let data = out.body.collect().await.map_err(|e| Error::Transport {
            op: "reading",
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(data.into_bytes()))
    }

    async fn put(&self, key: &str, body: Bytes, attributes: &RemoteAttributes) -> Result<()> {
        debug!(key, bytes = body.len(), "putting object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .acl(ObjectCannedAcl::from(attributes.acl.as_str()))
            .content_type(&attributes.content_type)
            .set_cache_control(attributes.cache_control.clone())
            .set_content_disposition(attributes.content_disposition.clone())
            .set_content_encoding(attributes.content_encoding.clone())
            .set_content_language(attributes.content_language.clone())
            .set_storage_class(
                attributes
                    .storage_class
                    .as_deref()
                    .map(StorageClass::from),
            )
            .set_website_redirect_location(attributes.website_redirect_location.clone())
            .set_metadata(if attributes.metadata.is_empty() {
                None
            } else {
                Some(attributes.metadata.clone().into_iter().collect())
            })
            .send()
            .await
            .map_err(|e| Self::classify("writing", key, DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn copy_with_attributes(&self, key: &str, attributes: &RemoteAttributes) -> Result<()> {
        debug!(key, "rewriting object attributes");
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .key(key)
            .copy_source(format!("{}/{}", self.bucket, key))
            .metadata_directive(MetadataDirective::Replace)
            .acl(ObjectCannedAcl::from(attributes.acl.as_str()))
            .content_type(&attributes.content_type)
            .set_cache_control(attributes.cache_control.clone())
            .set_content_disposition(attributes.content_disposition.clone())
            .set_content_encoding(attributes.content_encoding.clone())
            .set_content_language(attributes.content_language.clone())
            .set_storage_class(
                attributes
                    .storage_class
                    .as_deref()
                    .map(StorageClass::from),
            )
            .set_website_redirect_location(attributes.website_redirect_location.clone())
            .set_metadata(if attributes.metadata.is_empty() {
                None
            } else {
                Some(attributes.metadata.clone().into_iter().collect())
            })
            .send()
            .await
            .map_err(|e| {
                Self::classify("rewriting", key, DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        debug!(key, "deleting object");
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::classify("deleting", key, DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(S3ObjectStore::is_not_found("service error: NoSuchKey"));
        assert!(S3ObjectStore::is_not_found("unhandled, status: 404"));
        assert!(!S3ObjectStore::is_not_found("connection refused"));
    }

    #[test]
    fn test_credential_failures_classified() {
        let err = S3ObjectStore::classify(
            "reading",
            ".sitesync.cat",
            "AccessDenied: not authorised".to_string(),
        );
        assert!(matches!(err, Error::Credentials(_)));

        let err = S3ObjectStore::classify(
            "reading",
            ".sitesync.cat",
            "dispatch failure: timed out".to_string(),
        );
        assert!(matches!(err, Error::Transport { .. }));
    }
}

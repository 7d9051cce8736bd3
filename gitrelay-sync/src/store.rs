//! Object-store collaborator: the listing/retrieval interface the pipeline
//! consumes, plus the production S3 implementation.

use std::future::Future;

use aws_sdk_s3::error::DisplayErrorContext;
use chrono::{TimeZone, Utc};

use gitrelay_core::RemoteObject;

use crate::error::SyncError;

/// Listing and retrieval operations on a bucket of encrypted bundles.
///
/// Methods return `Send` futures so fetch workers can run on spawned tasks.
pub trait ObjectStore: Send + Sync + 'static {
    /// List every object currently in the bucket.
    fn list(&self) -> impl Future<Output = Result<Vec<RemoteObject>, SyncError>> + Send;

    /// Retrieve the full body of one object. The body is collected to bytes
    /// so the underlying connection is released before the result is used.
    fn get(&self, key: &str) -> impl Future<Output = Result<Vec<u8>, SyncError>> + Send;
}

/// S3-backed store. Credentials and region come from the SDK's standard
/// provider chain.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Load the ambient AWS configuration and bind to a bucket.
    pub async fn connect(bucket: String) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl ObjectStore for S3ObjectStore {
    async fn list(&self) -> Result<Vec<RemoteObject>, SyncError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|err| SyncError::Store {
                reason: DisplayErrorContext(&err).to_string(),
            })?;

        let mut listing = Vec::new();
        for object in output.contents() {
            let (Some(key), Some(modified)) = (object.key(), object.last_modified()) else {
                continue;
            };
            let Some(last_modified) = Utc
                .timestamp_opt(modified.secs(), modified.subsec_nanos())
                .single()
            else {
                return Err(SyncError::Store {
                    reason: format!("object '{key}' has an unrepresentable timestamp"),
                });
            };
            listing.push(RemoteObject {
                key: key.to_string(),
                last_modified,
            });
        }
        Ok(listing)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, SyncError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| SyncError::Store {
                reason: DisplayErrorContext(&err).to_string(),
            })?;

        let collected = output.body.collect().await.map_err(|err| SyncError::Store {
            reason: format!("reading body of '{key}': {err}"),
        })?;
        Ok(collected.into_bytes().to_vec())
    }
}

//! Upload of exported report files to S3.

use std::fmt;
use std::path::Path;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::error::{CostReportError, Result};

/// Region used when none is given.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Bucket and static credentials an exported report is uploaded with.
#[derive(Clone)]
pub struct S3Destination {
    bucket: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
}

impl fmt::Debug for S3Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Destination")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl S3Destination {
    /// Build a destination from optional command-line values.
    ///
    /// Returns `Ok(None)` when no bucket is given (nothing to upload).
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::Auth`] if a bucket is given without both
    /// the access key id and the secret access key.
    pub fn from_options(
        bucket: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        region: impl Into<String>,
    ) -> Result<Option<Self>> {
        let Some(bucket) = bucket.filter(|b| !b.is_empty()) else {
            return Ok(None);
        };
        let (Some(access_key_id), Some(secret_access_key)) = (
            access_key_id.filter(|k| !k.is_empty()),
            secret_access_key.filter(|k| !k.is_empty()),
        ) else {
            return Err(CostReportError::Auth(
                "AWS credentials are required to upload to S3".to_string(),
            ));
        };

        Ok(Some(Self {
            bucket,
            region: region.into(),
            access_key_id,
            secret_access_key,
        }))
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Upload `path` under a key prefixed with the current UTC time.
    ///
    /// Returns the object key.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::Config`] if `path` has no file name and
    /// [`CostReportError::Upload`] if reading the file or the upload fails.
    #[instrument(skip(self), fields(bucket = %self.bucket, region = %self.region))]
    pub async fn upload(&self, path: &Path) -> Result<String> {
        let key = object_key(path, Utc::now())?;

        let credentials = Credentials::new(
            &self.access_key_id,
            &self.secret_access_key,
            None,
            None,
            "cost-attribution",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .build();
        let client = aws_sdk_s3::Client::from_conf(config);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| CostReportError::Upload(format!("cannot read {}: {e}", path.display())))?;

        client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|e| CostReportError::Upload(DisplayErrorContext(&e).to_string()))?;

        info!(key = %key, "Uploaded report");
        Ok(key)
    }
}

/// Object key for `path`: `YYYY-MM-DD-HH-MM-SS-<file name>`.
///
/// # Errors
///
/// Returns [`CostReportError::Config`] if `path` has no file name.
pub fn object_key(path: &Path, at: DateTime<Utc>) -> Result<String> {
    let name = path
        .file_name()
        .ok_or_else(|| CostReportError::Config(format!("{} is not a file", path.display())))?;
    Ok(format!(
        "{}-{}",
        at.format("%Y-%m-%d-%H-%M-%S"),
        name.to_string_lossy()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_object_key_uses_timestamp_and_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 1, 8, 9, 5, 3).unwrap();
        let key = object_key(Path::new("/tmp/out/report.csv"), at).unwrap();
        assert_eq!(key, "2024-01-08-09-05-03-report.csv");
    }

    #[test]
    fn test_object_key_requires_file_name() {
        let err = object_key(Path::new("/"), Utc::now()).unwrap_err();
        assert!(matches!(err, CostReportError::Config(_)));
    }

    #[test]
    fn test_no_bucket_means_no_upload() {
        let destination =
            S3Destination::from_options(None, some("id"), some("secret"), DEFAULT_REGION).unwrap();
        assert!(destination.is_none());

        let destination =
            S3Destination::from_options(some(""), None, None, DEFAULT_REGION).unwrap();
        assert!(destination.is_none());
    }

    #[test]
    fn test_bucket_without_credentials_is_rejected() {
        for (id, secret) in [(None, None), (some("id"), None), (None, some("secret")), (some(""), some("secret"))] {
            let err = S3Destination::from_options(some("reports"), id, secret, DEFAULT_REGION)
                .unwrap_err();
            assert!(matches!(err, CostReportError::Auth(_)));
        }
    }

    #[test]
    fn test_destination_with_credentials() {
        let destination =
            S3Destination::from_options(some("reports"), some("id"), some("secret"), "eu-west-1")
                .unwrap()
                .unwrap();
        assert_eq!(destination.bucket(), "reports");
        assert_eq!(destination.region(), "eu-west-1");
        assert!(!format!("{destination:?}").contains("\"secret\""));
    }
}

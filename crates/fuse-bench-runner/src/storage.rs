//! S3 access for the runner
//!
//! Downloads artifacts from the case prefix and uploads raw fio outputs,
//! the run report, and the CSV summary. Credentials come from the
//! instance role, so there is no key handling here.

use crate::bench::ResultSink;
use anyhow::{Context, Result};
use aws_sdk_s3::{primitives::ByteStream, Client};
use fuse_bench_common::defaults::fio_output_name;
use std::path::Path;
use tracing::debug;

/// S3 wrapper scoped to the artifacts bucket and case prefix
pub struct Storage {
    client: Client,
    bucket: String,
    case_id: String,
}

impl Storage {
    /// Create a client from the ambient AWS environment (instance role)
    pub async fn new(bucket: &str, case_id: &str) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self {
            client: Client::new(&aws_config),
            bucket: bucket.to_string(),
            case_id: case_id.to_string(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}/{}", self.case_id, name)
    }

    /// Download an object under the case prefix as a UTF-8 string
    pub async fn download_string(&self, name: &str) -> Result<String> {
        let key = self.key(name);
        debug!(bucket = %self.bucket, key = %key, "Downloading object");

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .with_context(|| format!("Failed to download s3://{}/{}", self.bucket, key))?;

        let body = response
            .body
            .collect()
            .await
            .context("Failed to read object body from S3")?;

        String::from_utf8(body.into_bytes().to_vec())
            .with_context(|| format!("s3://{}/{} is not valid UTF-8", self.bucket, key))
    }

    /// Download an object under the case prefix to a local file
    pub async fn download_to_file(&self, name: &str, path: &Path) -> Result<()> {
        let key = self.key(name);
        debug!(bucket = %self.bucket, key = %key, path = %path.display(), "Downloading to file");

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .with_context(|| format!("Failed to download s3://{}/{}", self.bucket, key))?;

        let body = response
            .body
            .collect()
            .await
            .context("Failed to read object body from S3")?;

        tokio::fs::write(path, body.into_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// Upload a local file under the case prefix
    pub async fn upload_file(&self, name: &str, path: &Path) -> Result<()> {
        let key = self.key(name);
        debug!(bucket = %self.bucket, key = %key, path = %path.display(), "Uploading file");

        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to read file {}", path.display()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to upload s3://{}/{}", self.bucket, key))?;

        Ok(())
    }

    /// Upload in-memory bytes under the case prefix
    pub async fn upload_bytes(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let key = self.key(name);
        debug!(bucket = %self.bucket, key = %key, size = data.len(), "Uploading bytes");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("Failed to upload s3://{}/{}", self.bucket, key))?;

        Ok(())
    }
}

impl ResultSink for Storage {
    async fn upload_output(&self, iteration: u32, path: &Path) -> Result<String> {
        let name = fio_output_name(iteration);
        self.upload_file(&name, path).await?;
        Ok(self.key(&name))
    }
}

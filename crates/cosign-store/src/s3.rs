//! S3 blob store

use crate::{BlobStore, Result, StoreError};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use cosign_types::AwsConfig;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct S3Store {
    client: Arc<Client>,
    bucket: String,
}

impl S3Store {
    /// Build a client for the configured bucket.
    ///
    /// Static credentials from the configuration take precedence; without them
    /// the default AWS provider chain (environment, profile) is used.
    pub async fn connect(aws: &AwsConfig) -> Result<Self> {
        if aws.bucket.is_empty() {
            return Err(StoreError::backend("connecting to s3", "aws.bucket is not set"));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(aws.bucket_region.clone()));
        if !aws.access_key_id.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                aws.access_key_id.clone(),
                aws.secret_access_key.clone(),
                None,
                None,
                "cosign-config",
            ));
        }
        let shared = loader.load().await;

        debug!(bucket = %aws.bucket, region = %aws.bucket_region, "connected to s3");
        Ok(Self {
            client: Arc::new(Client::new(&shared)),
            bucket: aws.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(prefix.map(str::to_string))
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                StoreError::backend(
                    format!("listing bucket {}", self.bucket),
                    DisplayErrorContext(e).to_string(),
                )
            })?;
            keys.extend(page.contents().iter().filter_map(|o| o.key().map(str::to_string)));
        }
        debug!(bucket = %self.bucket, prefix, count = keys.len(), "listed objects");
        Ok(keys)
    }
}

#[async_trait]
impl BlobStore for S3Store {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Ok(None)
            }
            Err(e) => {
                return Err(StoreError::backend(
                    format!("downloading {path}"),
                    DisplayErrorContext(e).to_string(),
                ))
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::backend(format!("downloading {path}"), e))?;
        Ok(Some(data.into_bytes().to_vec()))
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> Result<()> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                StoreError::backend(
                    format!("uploading {path}"),
                    DisplayErrorContext(e).to_string(),
                )
            })?;
        debug!(path, bytes = len, "uploaded object");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<String>> {
        self.list(None).await
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.list(Some(prefix)).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        // S3 reports success for missing keys
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                StoreError::backend(
                    format!("deleting {path}"),
                    DisplayErrorContext(e).to_string(),
                )
            })?;
        debug!(path, "deleted object");
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(StoreError::backend(
                format!("checking {path}"),
                DisplayErrorContext(e).to_string(),
            )),
        }
    }
}

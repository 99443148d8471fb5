use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use pipewright_types::AwsResult;

use super::map_sdk_err;
use crate::client::S3Api;

pub struct SdkS3 {
    client: aws_sdk_s3::Client,
}

impl SdkS3 {
    pub fn new(config: &SdkConfig) -> Self {
        SdkS3 {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

#[async_trait]
impl S3Api for SdkS3 {
    async fn bucket_exists(&self, bucket: &str) -> AwsResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => match err.as_service_error() {
                Some(service_err) if service_err.is_not_found() => Ok(false),
                _ => Err(map_sdk_err("head bucket", err)),
            },
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> AwsResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        // us-east-1 rejects an explicit location constraint.
        if region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("create bucket", e))
    }
}

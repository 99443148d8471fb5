//! Artifact bucket provisioning.

use pipewright_types::AwsResult;

use crate::client::S3Api;

/// Create the bucket if it does not exist yet. Losing a create race to a
/// concurrent deploy counts as success.
pub async fn ensure_bucket(client: &dyn S3Api, bucket: &str, region: &str) -> AwsResult<()> {
    if client.bucket_exists(bucket).await? {
        return Ok(());
    }
    tracing::info!(bucket, "Creating artifact bucket");
    match client.create_bucket(bucket, region).await {
        Err(err) if err.code() == "BucketAlreadyOwnedByYou" => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CloudClients;

    #[tokio::test]
    async fn test_ensure_bucket_only_creates_once() {
        let (clients, cloud) = CloudClients::in_memory();
        let s3 = clients.s3.as_ref();

        ensure_bucket(s3, "codepipeline-us-west-2-111122223333", "us-west-2").await.unwrap();
        ensure_bucket(s3, "codepipeline-us-west-2-111122223333", "us-west-2").await.unwrap();

        assert_eq!(cloud.calls("create_bucket"), 1);
        assert!(cloud.has_bucket("codepipeline-us-west-2-111122223333"));
    }
}

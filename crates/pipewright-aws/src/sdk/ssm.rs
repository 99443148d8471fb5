use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ssm::types::ParameterType;
use pipewright_types::AwsResult;

use super::map_sdk_err;
use crate::client::SsmApi;

pub struct SdkSsm {
    client: aws_sdk_ssm::Client,
}

impl SdkSsm {
    pub fn new(config: &SdkConfig) -> Self {
        SdkSsm {
            client: aws_sdk_ssm::Client::new(config),
        }
    }
}

#[async_trait]
impl SsmApi for SdkSsm {
    async fn put_secure_parameter(
        &self,
        name: &str,
        value: &str,
        description: &str,
    ) -> AwsResult<()> {
        self.client
            .put_parameter()
            .name(name)
            .value(value)
            .description(description)
            .r#type(ParameterType::SecureString)
            .overwrite(true)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("put parameter", e))
    }

    async fn delete_parameters(&self, names: &[String]) -> AwsResult<()> {
        // DeleteParameters lists missing names in the response instead of
        // failing, which matches the idempotence we want.
        self.client
            .delete_parameters()
            .set_names(Some(names.to_vec()))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("delete parameters", e))
    }
}

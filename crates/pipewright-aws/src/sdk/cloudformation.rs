use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudformation::types::Parameter;
use pipewright_types::AwsResult;

use super::map_sdk_err;
use crate::client::{CloudFormationApi, Stack};

pub struct SdkCloudFormation {
    client: aws_sdk_cloudformation::Client,
}

impl SdkCloudFormation {
    pub fn new(config: &SdkConfig) -> Self {
        SdkCloudFormation {
            client: aws_sdk_cloudformation::Client::new(config),
        }
    }
}

#[async_trait]
impl CloudFormationApi for SdkCloudFormation {
    async fn get_stack(&self, name: &str) -> AwsResult<Option<Stack>> {
        // DescribeStacks reports an absent stack as ValidationError.
        match self.client.describe_stacks().stack_name(name).send().await {
            Ok(out) => Ok(out.stacks().first().map(|stack| {
                let outputs: BTreeMap<String, String> = stack
                    .outputs()
                    .iter()
                    .filter_map(|o| {
                        Some((o.output_key()?.to_string(), o.output_value()?.to_string()))
                    })
                    .collect();
                Stack {
                    name: stack.stack_name().unwrap_or(name).to_string(),
                    status: stack
                        .stack_status()
                        .map(|s| s.as_str().to_string())
                        .unwrap_or_default(),
                    outputs,
                }
            })),
            Err(err) => {
                let mapped = map_sdk_err("describe stack", err);
                if mapped.is_not_found() {
                    Ok(None)
                } else {
                    Err(mapped)
                }
            }
        }
    }

    async fn create_stack(
        &self,
        name: &str,
        template_body: &str,
        parameters: &[(String, String)],
    ) -> AwsResult<()> {
        let params: Vec<Parameter> = parameters
            .iter()
            .map(|(key, value)| {
                Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(value)
                    .build()
            })
            .collect();
        self.client
            .create_stack()
            .stack_name(name)
            .template_body(template_body)
            .set_parameters(Some(params))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("create stack", e))
    }

    async fn delete_stack(&self, name: &str) -> AwsResult<()> {
        self.client
            .delete_stack()
            .stack_name(name)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_err("delete stack", e))
    }
}

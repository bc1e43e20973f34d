//! EC2 instance management
//!
//! Launches the single benchmark instance. The RunInstances call itself is
//! deliberately not retried: a failed creation aborts the whole run.

use crate::aws::context::AwsContext;
use anyhow::{Context, Result};
use aws_sdk_ec2::{
    types::{Filter, InstanceStateName, InstanceType, ResourceType, Tag, TagSpecification},
    Client,
};
use chrono::Utc;
use fuse_bench_common::tags::{
    self, TAG_CASE_ID, TAG_CREATED_AT, TAG_RUN_ID, TAG_TOOL, TAG_TOOL_VALUE,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// EC2 client for managing benchmark instances
pub struct Ec2Client {
    client: Client,
}

/// Launched instance info
#[derive(Debug, Clone)]
pub struct LaunchedInstance {
    pub instance_id: String,
    pub public_ip: Option<String>,
}

/// Configuration for launching the benchmark instance
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Unique run identifier for tagging
    pub run_id: String,
    /// Derived test-case identifier for tagging and naming
    pub case_id: String,
    /// EC2 instance type (e.g. "c7i.2xlarge")
    pub instance_type: String,
    /// User data script (will be base64 encoded)
    pub user_data: String,
    /// Optional VPC subnet ID
    pub subnet_id: Option<String>,
    /// Optional security group ID
    pub security_group_id: Option<String>,
    /// Optional IAM instance profile name
    pub iam_instance_profile: Option<String>,
}

impl Ec2Client {
    /// Create an EC2 client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }

    /// Get the latest x86_64 AL2023 AMI
    pub async fn latest_al2023_ami(&self) -> Result<String> {
        let response = self
            .client
            .describe_images()
            .owners("amazon")
            .filters(
                Filter::builder()
                    .name("name")
                    .values("al2023-ami-*-x86_64")
                    .build(),
            )
            .filters(Filter::builder().name("state").values("available").build())
            .filters(
                Filter::builder()
                    .name("architecture")
                    .values("x86_64")
                    .build(),
            )
            .send()
            .await
            .context("Failed to describe images")?;

        let mut images: Vec<_> = response.images().iter().collect();
        images.sort_by(|a, b| {
            b.creation_date()
                .unwrap_or_default()
                .cmp(a.creation_date().unwrap_or_default())
        });

        let ami = images
            .first()
            .and_then(|img| img.image_id())
            .context("No AL2023 AMI found")?;

        debug!(ami = %ami, "Found AL2023 AMI");

        Ok(ami.to_string())
    }

    /// Launch the benchmark instance.
    ///
    /// Performs a single RunInstances call with no retry; any failure is
    /// returned to the caller and aborts provisioning.
    pub async fn launch_instance(&self, spec: LaunchSpec) -> Result<LaunchedInstance> {
        let ami_id = self.latest_al2023_ami().await?;

        let instance_type: InstanceType = spec
            .instance_type
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid instance type: {}", spec.instance_type))?;

        info!(
            instance_type = %spec.instance_type,
            case_id = %spec.case_id,
            ami = %ami_id,
            "Launching instance"
        );

        let user_data_b64 = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            spec.user_data.as_bytes(),
        );

        let created_at = tags::format_created_at(Utc::now());
        let mut request = self
            .client
            .run_instances()
            .image_id(&ami_id)
            .instance_type(instance_type)
            .min_count(1)
            .max_count(1)
            .user_data(user_data_b64)
            .tag_specifications(
                TagSpecification::builder()
                    .resource_type(ResourceType::Instance)
                    .tags(Tag::builder().key(TAG_TOOL).value(TAG_TOOL_VALUE).build())
                    .tags(Tag::builder().key(TAG_RUN_ID).value(&spec.run_id).build())
                    .tags(Tag::builder().key(TAG_CASE_ID).value(&spec.case_id).build())
                    .tags(
                        Tag::builder()
                            .key(TAG_CREATED_AT)
                            .value(&created_at)
                            .build(),
                    )
                    .tags(
                        Tag::builder()
                            .key("Name")
                            .value(format!("fuse-bench-{}", spec.case_id))
                            .build(),
                    )
                    .build(),
            );

        if let Some(subnet) = &spec.subnet_id {
            request = request.subnet_id(subnet);
        }

        if let Some(sg) = &spec.security_group_id {
            request = request.security_group_ids(sg);
        }

        if let Some(profile) = &spec.iam_instance_profile {
            request = request.iam_instance_profile(
                aws_sdk_ec2::types::IamInstanceProfileSpecification::builder()
                    .name(profile)
                    .build(),
            );
        }

        let response = request.send().await.context("Failed to launch instance")?;

        let instance = response
            .instances()
            .first()
            .context("No instance returned")?;

        let instance_id = instance
            .instance_id()
            .context("No instance ID")?
            .to_string();

        info!(instance_id = %instance_id, "Instance launched");

        Ok(LaunchedInstance {
            instance_id,
            public_ip: None,
        })
    }

    /// Default timeout for waiting for the instance to be running (10 minutes)
    const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 600;

    /// Wait for an instance to be running and get its public IP
    pub async fn wait_for_running(
        &self,
        instance_id: &str,
        timeout_secs: Option<u64>,
    ) -> Result<Option<String>> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(Self::DEFAULT_WAIT_TIMEOUT_SECS));
        info!(
            instance_id = %instance_id,
            timeout_secs = timeout.as_secs(),
            "Waiting for instance to be running"
        );

        let result = tokio::time::timeout(timeout, self.wait_for_running_inner(instance_id)).await;

        match result {
            Ok(inner_result) => inner_result,
            Err(_) => {
                warn!(
                    instance_id = %instance_id,
                    timeout_secs = timeout.as_secs(),
                    "Timed out waiting for instance to be running"
                );
                Err(anyhow::anyhow!(
                    "Timeout waiting for instance {} to be running after {}s",
                    instance_id,
                    timeout.as_secs()
                ))
            }
        }
    }

    /// Inner wait loop without timeout (used by wait_for_running)
    async fn wait_for_running_inner(&self, instance_id: &str) -> Result<Option<String>> {
        loop {
            let response = self
                .client
                .describe_instances()
                .instance_ids(instance_id)
                .send()
                .await
                .context("Failed to describe instance")?;

            let instance = response
                .reservations()
                .first()
                .and_then(|r| r.instances().first())
                .context("Instance not found")?;

            let state = instance
                .state()
                .and_then(|s| s.name())
                .unwrap_or(&InstanceStateName::Pending);

            match state {
                InstanceStateName::Running => {
                    let public_ip = instance.public_ip_address().map(|s| s.to_string());
                    info!(instance_id = %instance_id, public_ip = ?public_ip, "Instance is running");
                    return Ok(public_ip);
                }
                InstanceStateName::Pending => {
                    debug!(instance_id = %instance_id, "Instance still pending");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                _ => {
                    anyhow::bail!(
                        "Instance {} entered unexpected state: {:?}",
                        instance_id,
                        state
                    );
                }
            }
        }
    }
}

/// Trait for the EC2 operations provisioning needs, mockable in tests
#[allow(async_fn_in_trait)] // Internal use only
#[cfg_attr(test, mockall::automock)]
pub trait ProvisionEc2: Send + Sync {
    /// Launch the benchmark instance
    async fn launch_instance(&self, spec: LaunchSpec) -> Result<LaunchedInstance>;

    /// Wait for the instance to be running and get its public IP
    async fn wait_for_running(
        &self,
        instance_id: &str,
        timeout_secs: Option<u64>,
    ) -> Result<Option<String>>;
}

impl ProvisionEc2 for Ec2Client {
    async fn launch_instance(&self, spec: LaunchSpec) -> Result<LaunchedInstance> {
        Ec2Client::launch_instance(self, spec).await
    }

    async fn wait_for_running(
        &self,
        instance_id: &str,
        timeout_secs: Option<u64>,
    ) -> Result<Option<String>> {
        Ec2Client::wait_for_running(self, instance_id, timeout_secs).await
    }
}

//! AWS service clients for the provisioner

pub mod context;
pub mod ec2;
pub mod s3;

pub use context::AwsContext;
pub use ec2::{Ec2Client, LaunchSpec, LaunchedInstance, ProvisionEc2};
pub use s3::{ArtifactStore, S3Client};

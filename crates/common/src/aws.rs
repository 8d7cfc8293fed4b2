use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::Credentials as StaticCredentials;

use crate::credentials::Credentials;

/// Name reported by the static credentials provider.
const PROVIDER_NAME: &str = "credentials-file";

/// Load the shared AWS SDK configuration for the provided [`Credentials`].
///
/// Both the S3 and the Elastic Beanstalk clients are built from the same configuration.
pub async fn load_config(credentials: &Credentials) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(credentials.region.clone()))
        .credentials_provider(StaticCredentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            None,
            None,
            PROVIDER_NAME,
        ))
        .load()
        .await
}

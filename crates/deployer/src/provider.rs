use std::{path::Path, time::SystemTime};

use common::{
    aws,
    beanstalk::{
        self, ApplicationVersion, ApplicationVersionRequest, EnvironmentHealth, EnvironmentRequest,
        LaunchedEnvironment,
    },
    credentials::Credentials,
    s3,
};
use derive_more::{Display, Error, From};
use tracing::debug;

/// Cloud provider errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ProviderError {
    /// Elastic Beanstalk request error.
    #[from(ignore)]
    Beanstalk(beanstalk::Error),

    /// S3 request error.
    S3(s3::Error),

    /// Source bundle upload error.
    Upload(s3::UploadError),

    /// Credentials do not allow to manage Elastic Beanstalk resources.
    #[display(fmt = "insufficient privileges to deploy application")]
    InsufficientPrivileges,
}

/// Management API calls the deployment process relies on.
pub(crate) trait Provider {
    /// Check whether the CNAME prefix is available.
    async fn cname_available(&self, cname_prefix: &str) -> Result<bool, ProviderError>;

    /// Create or retrieve the storage bucket used for source bundles.
    async fn storage_location(&self) -> Result<Option<String>, ProviderError>;

    /// Upload a local file.
    async fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), ProviderError>;

    /// Check whether a remote object exists.
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ProviderError>;

    /// Register an application version, creating the application if needed.
    async fn create_application_version(
        &self,
        request: &ApplicationVersionRequest,
    ) -> Result<ApplicationVersion, ProviderError>;

    /// Start creating an environment.
    async fn create_environment(
        &self,
        request: &EnvironmentRequest,
    ) -> Result<LaunchedEnvironment, ProviderError>;

    /// Get the current environment status and health.
    async fn environment_health(
        &self,
        environment_name: &str,
    ) -> Result<Option<EnvironmentHealth>, ProviderError>;

    /// Get environment event messages since the provided moment, oldest first.
    async fn environment_events(
        &self,
        environment_name: &str,
        since: SystemTime,
    ) -> Result<Vec<String>, ProviderError>;
}

/// [`Provider`] implementation backed by AWS Elastic Beanstalk and S3.
pub(crate) struct AwsProvider {
    /// Elastic Beanstalk client.
    beanstalk: beanstalk::ConfiguredClient,

    /// Source bundle storage client.
    s3: s3::ConfiguredClient,
}

impl AwsProvider {
    /// Create provider clients signed with the provided [`Credentials`].
    pub(crate) async fn new(credentials: &Credentials) -> Self {
        let config = aws::load_config(credentials).await;

        debug!(region = %credentials.region, "provider clients configured");

        Self {
            beanstalk: beanstalk::ConfiguredClient::new(&config),
            s3: s3::ConfiguredClient::new(&config),
        }
    }
}

impl From<beanstalk::Error> for ProviderError {
    fn from(err: beanstalk::Error) -> Self {
        match err {
            beanstalk::Error::InsufficientPrivilegesException(_) => Self::InsufficientPrivileges,
            err => Self::Beanstalk(err),
        }
    }
}

impl Provider for AwsProvider {
    async fn cname_available(&self, cname_prefix: &str) -> Result<bool, ProviderError> {
        Ok(self.beanstalk.check_dns_availability(cname_prefix).await?)
    }

    async fn storage_location(&self) -> Result<Option<String>, ProviderError> {
        Ok(self.beanstalk.create_storage_location().await?)
    }

    async fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), ProviderError> {
        Ok(self.s3.upload_file(bucket, key, path).await?)
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ProviderError> {
        Ok(self.s3.object_exists(bucket, key).await?)
    }

    async fn create_application_version(
        &self,
        request: &ApplicationVersionRequest,
    ) -> Result<ApplicationVersion, ProviderError> {
        Ok(self.beanstalk.create_application_version(request).await?)
    }

    async fn create_environment(
        &self,
        request: &EnvironmentRequest,
    ) -> Result<LaunchedEnvironment, ProviderError> {
        Ok(self.beanstalk.create_environment(request).await?)
    }

    async fn environment_health(
        &self,
        environment_name: &str,
    ) -> Result<Option<EnvironmentHealth>, ProviderError> {
        Ok(self.beanstalk.describe_environment(environment_name).await?)
    }

    async fn environment_events(
        &self,
        environment_name: &str,
        since: SystemTime,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(self
            .beanstalk
            .describe_events(environment_name, since)
            .await?)
    }
}

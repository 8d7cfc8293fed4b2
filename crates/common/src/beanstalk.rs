use std::time::SystemTime;

use aws_config::SdkConfig;
pub use aws_sdk_elasticbeanstalk::Error;
use aws_sdk_elasticbeanstalk::{
    error::{ProvideErrorMetadata, SdkError},
    primitives::DateTime,
    types::{error::InsufficientPrivilegesException, ConfigurationOptionSetting, S3Location},
    Client,
};
use tracing::debug;

/// Error codes returned when credentials are not allowed to manage Elastic Beanstalk resources.
///
/// Not every operation models the privileges error, so the remaining codes
/// are reported as unhandled errors by the SDK.
const ACCESS_DENIED_CODES: [&str; 3] = [
    "InsufficientPrivilegesException",
    "AccessDenied",
    "AccessDeniedException",
];

/// Application version registration request.
#[derive(Clone, Debug)]
pub struct ApplicationVersionRequest {
    /// Application name, created automatically if missing.
    pub application_name: String,

    /// Version label.
    pub version_label: String,

    /// Human-readable version description.
    pub description: String,

    /// Bucket that holds the source bundle.
    pub bucket: String,

    /// Source bundle object key.
    pub key: String,
}

/// Application version as reported back by Elastic Beanstalk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplicationVersion {
    pub application_name: Option<String>,
    pub version_label: Option<String>,
}

/// A single environment configuration option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionSetting {
    pub namespace: &'static str,
    pub option_name: &'static str,
    pub value: String,
}

/// Environment creation request.
#[derive(Clone, Debug)]
pub struct EnvironmentRequest {
    pub application_name: String,
    pub environment_name: String,
    pub cname_prefix: String,
    pub version_label: String,
    pub solution_stack_name: String,
    pub option_settings: Vec<OptionSetting>,
}

/// Newly created environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchedEnvironment {
    /// Environment status, such as `Launching`.
    pub status: Option<String>,

    /// Environment hostname.
    pub cname: Option<String>,
}

/// Current environment status and enhanced health.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentHealth {
    /// Environment status, such as `Launching` or `Ready`.
    pub status: Option<String>,

    /// Enhanced health status, such as `Pending` or `Ok`.
    pub health: Option<String>,
}

/// Configured Elastic Beanstalk client.
pub struct ConfiguredClient {
    client: Client,
}

impl ConfiguredClient {
    /// Create new [`ConfiguredClient`] from the shared SDK configuration.
    pub fn new(config: &SdkConfig) -> Self {
        ConfiguredClient {
            client: Client::new(config),
        }
    }

    /// Check whether the provided CNAME prefix is still available.
    pub async fn check_dns_availability(&self, cname_prefix: &str) -> Result<bool, Error> {
        let response = self
            .client
            .check_dns_availability()
            .cname_prefix(cname_prefix)
            .send()
            .await
            .map_err(classify)?;

        Ok(response.available() == Some(true))
    }

    /// Create, or retrieve if it already exists, the Elastic Beanstalk storage bucket.
    pub async fn create_storage_location(&self) -> Result<Option<String>, Error> {
        let response = self
            .client
            .create_storage_location()
            .send()
            .await
            .map_err(classify)?;

        Ok(response.s3_bucket().map(ToOwned::to_owned))
    }

    /// Register a new application version.
    pub async fn create_application_version(
        &self,
        request: &ApplicationVersionRequest,
    ) -> Result<ApplicationVersion, Error> {
        let response = self
            .client
            .create_application_version()
            .application_name(&request.application_name)
            .auto_create_application(true)
            .description(&request.description)
            .source_bundle(
                S3Location::builder()
                    .s3_bucket(&request.bucket)
                    .s3_key(&request.key)
                    .build(),
            )
            .version_label(&request.version_label)
            .send()
            .await
            .map_err(classify)?;

        let version = response.application_version();

        Ok(ApplicationVersion {
            application_name: version
                .and_then(|version| version.application_name())
                .map(ToOwned::to_owned),
            version_label: version
                .and_then(|version| version.version_label())
                .map(ToOwned::to_owned),
        })
    }

    /// Create a new environment.
    pub async fn create_environment(
        &self,
        request: &EnvironmentRequest,
    ) -> Result<LaunchedEnvironment, Error> {
        let option_settings = request
            .option_settings
            .iter()
            .map(|setting| {
                ConfigurationOptionSetting::builder()
                    .namespace(setting.namespace)
                    .option_name(setting.option_name)
                    .value(&setting.value)
                    .build()
            })
            .collect();

        let response = self
            .client
            .create_environment()
            .application_name(&request.application_name)
            .environment_name(&request.environment_name)
            .cname_prefix(&request.cname_prefix)
            .version_label(&request.version_label)
            .solution_stack_name(&request.solution_stack_name)
            .set_option_settings(Some(option_settings))
            .send()
            .await
            .map_err(classify)?;

        debug!(environment_id = ?response.environment_id(), "environment created");

        Ok(LaunchedEnvironment {
            status: response.status().map(|status| status.as_str().to_owned()),
            cname: response.cname().map(ToOwned::to_owned),
        })
    }

    /// Describe a single environment by its name.
    ///
    /// Returns [`None`] if the environment does not exist.
    pub async fn describe_environment(
        &self,
        environment_name: &str,
    ) -> Result<Option<EnvironmentHealth>, Error> {
        let response = self
            .client
            .describe_environments()
            .environment_names(environment_name)
            .include_deleted(false)
            .send()
            .await
            .map_err(classify)?;

        Ok(response
            .environments()
            .first()
            .map(|environment| EnvironmentHealth {
                status: environment
                    .status()
                    .map(|status| status.as_str().to_owned()),
                health: environment
                    .health_status()
                    .map(|health| health.as_str().to_owned()),
            }))
    }

    /// Get messages of environment events that happened since the provided moment.
    ///
    /// Messages are returned in chronological order.
    pub async fn describe_events(
        &self,
        environment_name: &str,
        since: SystemTime,
    ) -> Result<Vec<String>, Error> {
        let response = self
            .client
            .describe_events()
            .environment_name(environment_name)
            .start_time(DateTime::from(since))
            .end_time(DateTime::from(SystemTime::now()))
            .send()
            .await
            .map_err(classify)?;

        Ok(response
            .events()
            .iter()
            .rev()
            .filter_map(|event| event.message())
            .map(ToOwned::to_owned)
            .collect())
    }
}

/// Convert an operation error, reporting access denials as [`Error::InsufficientPrivilegesException`].
fn classify<E, R>(err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata,
    Error: From<SdkError<E, R>>,
{
    let denied = err
        .as_service_error()
        .and_then(|service_err| service_err.code())
        .is_some_and(|code| ACCESS_DENIED_CODES.contains(&code));

    if !denied {
        return err.into();
    }

    let message = err
        .as_service_error()
        .and_then(|service_err| service_err.message())
        .map(ToOwned::to_owned);

    Error::InsufficientPrivilegesException(
        InsufficientPrivilegesException::builder()
            .set_message(message)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use aws_sdk_elasticbeanstalk::{
        error::{ErrorMetadata, SdkError},
        operation::check_dns_availability::CheckDNSAvailabilityError,
    };

    use super::{classify, Error};

    fn service_error(code: &str) -> SdkError<CheckDNSAvailabilityError, ()> {
        SdkError::service_error(
            CheckDNSAvailabilityError::generic(
                ErrorMetadata::builder()
                    .code(code)
                    .message("request failed")
                    .build(),
            ),
            (),
        )
    }

    #[test]
    fn access_denial_is_insufficient_privileges() {
        for code in ["AccessDenied", "AccessDeniedException", "InsufficientPrivilegesException"] {
            assert!(
                matches!(
                    classify(service_error(code)),
                    Error::InsufficientPrivilegesException(_)
                ),
                "{code}"
            );
        }
    }

    #[test]
    fn other_errors_are_kept() {
        assert!(!matches!(
            classify(service_error("Throttling")),
            Error::InsufficientPrivilegesException(_)
        ));
    }
}

use common::{
    beanstalk::{ApplicationVersionRequest, EnvironmentRequest, OptionSetting},
    config,
};
use derive_more::{Display, Error, From};
use tracing::{info, instrument};

use crate::{
    provider::{Provider, ProviderError},
    session::Session,
};

/// Status reported by a freshly created environment.
const LAUNCHING_STATUS: &str = "Launching";

/// Application version and environment creation errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ReleaseError {
    /// Provider request error.
    Provider(ProviderError),

    /// Registered application version does not match the requested one.
    #[display(fmt = "unexpected application version in response")]
    VersionMismatch,

    /// Environment is not launching.
    #[display(fmt = "unexpected environment status: {:?}", _0)]
    NotLaunching(#[error(ignore)] Option<String>),

    /// Environment was created without a hostname.
    #[display(fmt = "environment has no CNAME")]
    MissingCname,
}

/// Register the uploaded source bundle as a new application version.
///
/// Application is created automatically if it does not exist yet.
#[instrument(skip_all, fields(app_name = %session.app_name))]
pub(crate) async fn create_application_version<P: Provider>(
    provider: &P,
    session: &Session,
) -> Result<(), ReleaseError> {
    let version = provider
        .create_application_version(&ApplicationVersionRequest {
            application_name: session.app_name.clone(),
            version_label: session.content_hash.clone(),
            description: format!("{} version {}", session.app_name, session.content_hash),
            bucket: session.bucket.clone(),
            key: session.archive_name.clone(),
        })
        .await?;

    if version.application_name.as_deref() != Some(session.app_name.as_str())
        || version.version_label.as_deref() != Some(session.content_hash.as_str())
    {
        return Err(ReleaseError::VersionMismatch);
    }

    info!(version_label = %session.content_hash, "application version created");

    Ok(())
}

/// Create the environment running the current application version.
///
/// On success, the environment hostname is stored in the [`Session`].
#[instrument(skip_all, fields(app_name = %session.app_name))]
pub(crate) async fn create_environment<P: Provider>(
    provider: &P,
    session: &mut Session,
    template: &config::Environment,
) -> Result<(), ReleaseError> {
    let environment = provider
        .create_environment(&EnvironmentRequest {
            application_name: session.app_name.clone(),
            environment_name: session.app_name.clone(),
            cname_prefix: session.app_name.clone(),
            version_label: session.content_hash.clone(),
            solution_stack_name: template.solution_stack_name.clone(),
            option_settings: option_settings(template),
        })
        .await?;

    if environment.status.as_deref() != Some(LAUNCHING_STATUS) {
        return Err(ReleaseError::NotLaunching(environment.status));
    }

    let cname = environment.cname.ok_or(ReleaseError::MissingCname)?;

    info!(%cname, "environment launching");

    session.endpoint = Some(cname);

    Ok(())
}

/// Build environment option settings from the configured template.
///
/// Optional template values that are not configured are left out.
pub(crate) fn option_settings(template: &config::Environment) -> Vec<OptionSetting> {
    let setting = |namespace: &'static str, option_name: &'static str, value: &str| OptionSetting {
        namespace,
        option_name,
        value: value.to_owned(),
    };

    let mut settings = Vec::new();

    if let Some(endpoint) = &template.notification_endpoint {
        settings.push(setting(
            "aws:elasticbeanstalk:sns:topics",
            "Notification Endpoint",
            endpoint,
        ));
    }

    settings.extend([
        setting(
            "aws:elasticbeanstalk:environment",
            "ServiceRole",
            &template.service_role,
        ),
        setting(
            "aws:elasticbeanstalk:environment",
            "EnvironmentType",
            &template.environment_type,
        ),
        setting(
            "aws:elasticbeanstalk:healthreporting:system",
            "SystemType",
            "enhanced",
        ),
        setting(
            "aws:elasticbeanstalk:healthreporting:system",
            "HealthCheckSuccessThreshold",
            "Ok",
        ),
    ]);

    if !template.subnets.is_empty() {
        settings.push(setting(
            "aws:ec2:vpc",
            "Subnets",
            &template.subnets.join(","),
        ));
    }

    if let Some(vpc_id) = &template.vpc_id {
        settings.push(setting("aws:ec2:vpc", "VPCId", vpc_id));
    }

    settings.push(setting(
        "aws:ec2:vpc",
        "AssociatePublicIpAddress",
        &template.associate_public_ip_address.to_string(),
    ));

    if !template.security_groups.is_empty() {
        settings.push(setting(
            "aws:autoscaling:launchconfiguration",
            "SecurityGroups",
            &template.security_groups.join(","),
        ));
    }

    settings.extend([
        setting(
            "aws:autoscaling:launchconfiguration",
            "IamInstanceProfile",
            &template.iam_instance_profile,
        ),
        setting(
            "aws:autoscaling:launchconfiguration",
            "InstanceType",
            &template.instance_type,
        ),
    ]);

    if let Some(key_name) = &template.key_name {
        settings.push(setting(
            "aws:autoscaling:launchconfiguration",
            "EC2KeyName",
            key_name,
        ));
    }

    settings
}

use derive_more::{Display, Error, From};
use tracing::{info, instrument};

use crate::{
    prompt::{Prompt, PromptError},
    provider::{Provider, ProviderError},
};

/// Question asked before the first availability check.
const FIRST_QUESTION: &str = "Please select an app name";

/// Question asked after the provider reported the name as taken.
const RETRY_QUESTION: &str = "That app name has already been chosen. Please try another";

/// Fatal session bootstrap errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum SessionError {
    /// Provider request error.
    #[from(ignore)]
    Provider(ProviderError),

    /// Operator prompt error.
    Prompt(PromptError),

    /// Credentials do not allow to manage Elastic Beanstalk resources.
    #[display(fmt = "insufficient privileges to deploy application")]
    InsufficientPrivileges,

    /// Provider did not return a storage bucket.
    #[display(fmt = "S3 bucket could not be created")]
    MissingBucket,
}

impl From<ProviderError> for SessionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InsufficientPrivileges => Self::InsufficientPrivileges,
            err => Self::Provider(err),
        }
    }
}

/// State of a single deployment run.
#[derive(Debug)]
pub(crate) struct Session {
    /// Deployment region.
    pub region: String,

    /// Application name, also used as the environment name and the CNAME prefix.
    pub app_name: String,

    /// Source bundle bucket.
    pub bucket: String,

    /// Project content hash, used as the version label.
    pub content_hash: String,

    /// Source bundle object key.
    pub archive_name: String,

    /// Environment hostname, known once the environment is launching.
    pub endpoint: Option<String>,
}

impl Session {
    /// Negotiate the application name with the operator and retrieve the storage bucket.
    pub(crate) async fn start<P: Provider, Q: Prompt>(
        provider: &P,
        prompt: &mut Q,
        region: String,
        content_hash: String,
    ) -> Result<Self, SessionError> {
        let app_name = negotiate_app_name(provider, prompt).await?;
        let bucket = ensure_bucket(provider).await?;

        Ok(Self {
            region,
            app_name,
            bucket,
            archive_name: format!("{content_hash}.zip"),
            content_hash,
            endpoint: None,
        })
    }

    /// Deployed page URL.
    pub(crate) fn endpoint_url(&self) -> Option<String> {
        self.endpoint
            .as_deref()
            .map(|endpoint| format!("http://{endpoint}"))
    }
}

/// Ask the operator for an application name until the provider reports it as available.
#[instrument(skip_all)]
pub(crate) async fn negotiate_app_name<P: Provider, Q: Prompt>(
    provider: &P,
    prompt: &mut Q,
) -> Result<String, SessionError> {
    let mut question = FIRST_QUESTION;

    loop {
        let app_name = prompt.ask(question)?;

        if app_name.is_empty() {
            continue;
        }

        if provider.cname_available(&app_name).await? {
            info!(%app_name, "application name is available");
            return Ok(app_name);
        }

        question = RETRY_QUESTION;
    }
}

/// Create, or retrieve the existing, source bundle bucket.
pub(crate) async fn ensure_bucket<P: Provider>(provider: &P) -> Result<String, SessionError> {
    let bucket = provider
        .storage_location()
        .await?
        .ok_or(SessionError::MissingBucket)?;

    info!(%bucket, "storage location ready");

    Ok(bucket)
}

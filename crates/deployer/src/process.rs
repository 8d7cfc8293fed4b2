use std::{future::Future, io, path::Path, time::Duration};

use common::config::Config;
use derive_more::Display;
use indicatif::ProgressBar;
use tracing::{error, instrument, warn};

use crate::{
    archiver::Exclusions,
    bundle::upload_source_bundle,
    health::wait_until_healthy,
    provider::Provider,
    release::{create_application_version, create_environment},
    session::Session,
    verify::verify_page_contents,
};

/// Deployment pipeline stage.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub(crate) enum Stage {
    /// Source bundle packaging and upload.
    #[display(fmt = "Could not upload Source Bundle.")]
    Upload,

    /// Application and application version creation.
    #[display(fmt = "Could not create Application or Application Version.")]
    ApplicationVersion,

    /// Environment creation.
    #[display(fmt = "Could not create Environment.")]
    Environment,

    /// Environment health polling.
    #[display(fmt = "Could not check Environment Health.")]
    Health,

    /// Deployed page verification.
    #[display(fmt = "Page contents don't match the expected text.")]
    PageContents,
}

/// Result of a deployment pipeline run.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Every stage succeeded.
    Deployed {
        /// Deployed page URL.
        url: String,
    },

    /// Pipeline stopped at the provided stage.
    Failed(Stage),
}

/// Run the deployment pipeline for a started [`Session`].
///
/// Stages run one after another and the first failed stage stops the pipeline.
/// Cloud resources created by earlier stages are left in place.
#[instrument(skip_all, fields(app_name = %session.app_name, region = %session.region))]
pub(crate) async fn run<P: Provider>(
    provider: &P,
    config: &Config,
    root: &Path,
    exclusions: &Exclusions,
    session: &mut Session,
    progress: &ProgressBar,
) -> Outcome {
    progress.enable_steady_tick(Duration::from_millis(150));

    progress.set_message("Uploading Source Bundle to S3...");

    if let Err(err) = upload_source_bundle(provider, session, root, exclusions).await {
        return fail(Stage::Upload, &err, progress);
    }

    progress.println("Source bundle uploaded.");
    progress.set_message("Creating Application and Application Version...");

    if let Err(err) = create_application_version(provider, session).await {
        return fail(Stage::ApplicationVersion, &err, progress);
    }

    progress.println("Application and Application Version created.");
    progress.set_message("Creating Environment...");

    if let Err(err) = create_environment(provider, session, &config.environment).await {
        return fail(Stage::Environment, &err, progress);
    }

    progress.println("Environment launching, please wait...");
    progress.set_message("Waiting for the environment to become healthy...");

    if let Err(err) = wait_until_healthy(
        provider,
        &session.app_name,
        config.health.poll_interval(),
        config.health.timeout(),
        progress,
    )
    .await
    {
        return fail(Stage::Health, &err, progress);
    }

    progress.println("Environment healthy and ready.");
    progress.set_message("Checking page content...");

    let Some(url) = session.endpoint_url() else {
        progress.finish_and_clear();
        return Outcome::Failed(Stage::PageContents);
    };

    if !verify_page_contents(&url, &config.page).await {
        progress.finish_and_clear();
        return Outcome::Failed(Stage::PageContents);
    }

    progress.finish_and_clear();

    Outcome::Deployed { url }
}

/// Wait for the operator interrupt `signal`.
///
/// If the signal listener cannot be installed, the interrupt never happens.
pub(crate) async fn interrupted<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(err) = signal.await {
        warn!(%err, "unable to listen for interrupts, cancellation is disabled");
        std::future::pending::<()>().await;
    }
}

/// Log the stage failure cause and stop the pipeline.
fn fail(stage: Stage, err: &dyn std::error::Error, progress: &ProgressBar) -> Outcome {
    error!(%err, ?stage, "deployment stage failed");
    progress.finish_and_clear();
    Outcome::Failed(stage)
}

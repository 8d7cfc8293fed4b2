use std::time::{Duration, SystemTime};

use common::beanstalk::EnvironmentHealth;
use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::provider::{Provider, ProviderError};

/// Environment status once all resources are created.
const READY_STATUS: &str = "Ready";

/// Enhanced health status of an environment that serves requests.
const OK_HEALTH: &str = "Ok";

/// Health polling errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum HealthError {
    /// Environment status cannot be retrieved.
    #[display(fmt = "could not check health of environment: {}", _0)]
    Unavailable(ProviderError),

    /// Environment did not become healthy in time.
    #[display(fmt = "environment did not become healthy in {:?}", _0)]
    TimedOut(#[error(ignore)] Duration),
}

/// Observed environment state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum HealthState {
    /// Environment is not serving requests yet.
    Pending {
        /// Last reported environment status.
        status: Option<String>,

        /// Last reported enhanced health status.
        health: Option<String>,
    },

    /// Environment is ready and healthy.
    Healthy,
}

impl From<EnvironmentHealth> for HealthState {
    fn from(EnvironmentHealth { status, health }: EnvironmentHealth) -> Self {
        if status.as_deref() == Some(READY_STATUS) && health.as_deref() == Some(OK_HEALTH) {
            HealthState::Healthy
        } else {
            HealthState::Pending { status, health }
        }
    }
}

/// Poll the environment until it is ready and healthy.
///
/// Status and health changes are printed as they happen, along with all new
/// environment events. The whole process is bounded by `limit`.
#[instrument(skip_all, fields(%environment_name))]
pub(crate) async fn wait_until_healthy<P: Provider>(
    provider: &P,
    environment_name: &str,
    interval: Duration,
    limit: Duration,
    progress: &ProgressBar,
) -> Result<(), HealthError> {
    timeout(
        limit,
        poll_health(provider, environment_name, interval, progress),
    )
    .await
    .map_err(|_| HealthError::TimedOut(limit))?
}

/// Unbounded polling loop.
async fn poll_health<P: Provider>(
    provider: &P,
    environment_name: &str,
    interval: Duration,
    progress: &ProgressBar,
) -> Result<(), HealthError> {
    let mut last_status = None;
    let mut last_health = None;
    let mut events_since = SystemTime::now();

    loop {
        let requested_at = SystemTime::now();

        let state = provider
            .environment_health(environment_name)
            .await?
            .map(HealthState::from)
            .unwrap_or(HealthState::Pending {
                status: None,
                health: None,
            });

        let HealthState::Pending { status, health } = state else {
            progress.println("Healthy!");
            return Ok(());
        };

        if status.is_some() && status != last_status {
            progress.println(format!("Status: {}", status.as_deref().unwrap_or_default()));
            last_status = status;
        }

        if health.is_some() && health != last_health {
            progress.println(format!("Health: {}", health.as_deref().unwrap_or_default()));
            last_health = health;
        }

        match provider
            .environment_events(environment_name, events_since)
            .await
        {
            Ok(events) => {
                for event in events {
                    progress.println(event);
                }

                events_since = requested_at;
            }
            Err(err) => warn!(%err, "unable to retrieve environment events"),
        }

        debug!(?interval, "environment is not healthy yet");

        tokio::time::sleep(interval).await;
    }
}

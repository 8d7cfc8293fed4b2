//! # Deployer
//!
//! Deploys the contents of a local directory as a new AWS Elastic Beanstalk
//! application and checks that the resulting page serves the expected content.
//!
//! The whole directory, except for excluded paths such as credentials and VCS
//! metadata, is packaged into a ZIP source bundle. The bundle is named after the
//! directory content hash, which also becomes the application version label.
//!
//! Once the environment reports itself healthy, its page is fetched and the
//! configured element is compared with the expected text.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::{env, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use common::{config::Config, credentials::Credentials, logging};
use indicatif::ProgressBar;
use tracing::info;

use crate::{
    archiver::{checksum_directory, Exclusions},
    process::{Outcome, Stage},
    prompt::Terminal,
    provider::AwsProvider,
    session::Session,
};

/// Project source code archiving and hashing utilities.
mod archiver;

/// Source bundle upload.
mod bundle;

/// Command-line arguments.
mod cli;

/// Environment health polling.
mod health;

/// Deployment pipeline.
mod process;

/// Operator prompts.
mod prompt;

/// Cloud provider seam.
mod provider;

/// Application version and environment creation.
mod release;

/// Deployment session bootstrap.
mod session;

/// Deployed page verification.
mod verify;

/// Test doubles.
#[cfg(test)]
mod testing;

/// CLI entrypoint.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, anyhow::Error> {
    let cli = Cli::parse();

    let working_dir = env::current_dir()?;
    let config_file = working_dir.join(&cli.config_file);

    let config = Config::new(Some(config_file.clone()))?;

    logging::init(&config);

    let root = match cli.project_dir {
        Some(path) => working_dir.join(path),
        None => working_dir,
    };

    let credentials_file = root.join(&config.project.credentials_file);

    let credentials = Credentials::from_file(&credentials_file, &config.project.allowed_regions)
        .context("unable to load credentials")?;

    let exclusions = Exclusions::with_files(
        &root,
        &config.project.exclude,
        &[credentials_file.as_path(), config_file.as_path()],
    )?;
    let content_hash = checksum_directory(&root, &exclusions)?;

    info!(%content_hash, root = %root.display(), "project directory hashed");

    let provider = AwsProvider::new(&credentials).await;

    let mut session = Session::start(
        &provider,
        &mut Terminal,
        credentials.region.clone(),
        content_hash,
    )
    .await?;

    println!("Deploying {} to {}...", session.app_name, session.region);

    let progress = ProgressBar::new_spinner();

    let outcome = tokio::select! {
        outcome = process::run(&provider, &config, &root, &exclusions, &mut session, &progress) => outcome,
        () = process::interrupted(tokio::signal::ctrl_c()) => {
            progress.finish_and_clear();
            println!("Deployment cancelled.");
            return Ok(ExitCode::FAILURE);
        }
    };

    let expected_text = &config.page.expected_text;

    match outcome {
        Outcome::Deployed { url } => {
            println!("\"{expected_text}\" found!");
            println!("Go to {url} to see for yourself!");
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failed(Stage::PageContents) => {
            println!("Page contents don't match \"{expected_text}\"");
            Ok(ExitCode::FAILURE)
        }
        Outcome::Failed(stage) => {
            println!("{stage}");
            Ok(ExitCode::FAILURE)
        }
    }
}

use std::{fs, io, path::Path};

use derive_more::{Display, Error, From};
use serde::Deserialize;

/// Errors that may occur while loading the credentials file.
#[derive(Debug, Display, From, Error)]
pub enum CredentialsError {
    /// Credentials file cannot be read.
    #[display(fmt = "credentials file not found: {}", _0)]
    Io(io::Error),

    /// Credentials file is not a valid JSON document.
    #[display(fmt = "invalid JSON in credentials file: {}", _0)]
    Json(serde_json::Error),

    /// Some of the required keys are absent.
    #[display(fmt = "missing required keys from credentials file: {:?}", _0)]
    MissingKeys(#[error(ignore)] Vec<&'static str>),

    /// Region is not in the list of regions that support Elastic Beanstalk.
    #[display(fmt = "region {} does not support Elastic Beanstalk", _0)]
    UnsupportedRegion(#[error(ignore)] String),
}

/// Credentials file contents before validation.
#[derive(Deserialize)]
struct CredentialsFile {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    region: Option<String>,
}

/// Validated AWS credentials.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// Access key identifier.
    pub access_key_id: String,

    /// Secret access key.
    pub secret_access_key: String,

    /// Deployment region.
    pub region: String,
}

impl Credentials {
    /// Read credentials from a JSON file.
    pub fn from_file(path: &Path, allowed_regions: &[String]) -> Result<Self, CredentialsError> {
        Self::from_json(&fs::read(path)?, allowed_regions)
    }

    /// Parse and validate the JSON credentials document.
    ///
    /// Every missing key is reported at once. Region is checked against `allowed_regions`.
    pub fn from_json(json: &[u8], allowed_regions: &[String]) -> Result<Self, CredentialsError> {
        let CredentialsFile {
            access_key_id,
            secret_access_key,
            region,
        } = serde_json::from_slice(json)?;

        let (Some(access_key_id), Some(secret_access_key), Some(region)) =
            (&access_key_id, &secret_access_key, &region)
        else {
            let missing = [
                ("access_key_id", access_key_id.is_none()),
                ("secret_access_key", secret_access_key.is_none()),
                ("region", region.is_none()),
            ]
            .into_iter()
            .filter_map(|(key, missing)| missing.then_some(key))
            .collect();

            return Err(CredentialsError::MissingKeys(missing));
        };

        if !allowed_regions.iter().any(|allowed| allowed == region) {
            return Err(CredentialsError::UnsupportedRegion(region.clone()));
        }

        Ok(Self {
            access_key_id: access_key_id.clone(),
            secret_access_key: secret_access_key.clone(),
            region: region.clone(),
        })
    }
}

use std::path::Path;

use aws_config::SdkConfig;
pub use aws_sdk_s3::Error;
use aws_sdk_s3::{
    primitives::{ByteStream, ByteStreamError},
    Client,
};
use derive_more::{Display, Error, From};
use tracing::debug;

/// Source bundle upload errors.
#[derive(Debug, Display, From, Error)]
pub enum UploadError {
    /// Unable to open the local file as a request body.
    #[display(fmt = "unable to read source bundle: {}", _0)]
    Body(ByteStreamError),

    /// S3 request error.
    S3(Error),
}

/// Configured S3 client.
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

    /// Upload a local file into `bucket` under the provided `key`.
    ///
    /// The file is only kept open for the duration of the request.
    pub async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), UploadError> {
        let body = ByteStream::from_path(path).await?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(Error::from)?;

        debug!(%bucket, %key, "object uploaded");

        Ok(())
    }

    /// Check whether an object with the provided `key` exists.
    pub async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, Error> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|err| err.is_not_found()) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

use std::{io, path::Path};

use derive_more::{Display, Error, From};
use tracing::{info, instrument};

use crate::{
    archiver::{build_zip_archive, ArchiverError, Exclusions},
    provider::{Provider, ProviderError},
    session::Session,
};

/// Source bundle upload errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum BundleError {
    /// IO-related error.
    Io(io::Error),

    /// Zip archiver error.
    #[display(fmt = "unable to create zip archive: {}", _0)]
    Archiver(ArchiverError),

    /// Provider request error.
    Provider(ProviderError),

    /// Uploaded object cannot be found in the bucket.
    #[display(fmt = "source bundle {} is missing from the bucket", _0)]
    MissingRemoteObject(#[error(ignore)] String),
}

/// Archive the project and upload it into the session bucket.
///
/// The local archive is written into a temporary file, which is deleted
/// once the upload is confirmed (or dropped on any error).
#[instrument(skip_all, fields(key = %session.archive_name))]
pub(crate) async fn upload_source_bundle<P: Provider>(
    provider: &P,
    session: &Session,
    root: &Path,
    exclusions: &Exclusions,
) -> Result<(), BundleError> {
    let mut archive_file = tempfile::Builder::new().suffix(".zip").tempfile()?;

    build_zip_archive(root, exclusions, archive_file.as_file_mut())?;

    provider
        .put_object(&session.bucket, &session.archive_name, archive_file.path())
        .await?;

    if !provider
        .object_exists(&session.bucket, &session.archive_name)
        .await?
    {
        return Err(BundleError::MissingRemoteObject(
            session.archive_name.clone(),
        ));
    }

    archive_file.close()?;

    info!(bucket = %session.bucket, "source bundle uploaded");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Cursor};

    use zip::ZipArchive;

    use crate::{
        archiver::Exclusions,
        testing::{test_session, ScriptedProvider},
    };

    use super::{upload_source_bundle, BundleError};

    #[tokio::test]
    async fn uploads_archive() {
        let dir = tempfile::tempdir().expect("unable to create temporary directory");
        fs::write(dir.path().join("index.html"), "<h1>Hi</h1>").expect("unable to write file");
        fs::write(dir.path().join("credentials.json"), "{}").expect("unable to write file");

        let exclusions = Exclusions::new(dir.path(), &["credentials.json"][..])
            .expect("patterns must be valid");
        let provider = ScriptedProvider::default();
        let session = test_session();

        upload_source_bundle(&provider, &session, dir.path(), &exclusions)
            .await
            .expect("upload must succeed");

        let objects = provider.objects();
        let archive = objects
            .get(&(session.bucket.clone(), session.archive_name.clone()))
            .expect("archive must be uploaded");

        let archive = ZipArchive::new(Cursor::new(archive.clone())).expect("invalid archive");

        assert_eq!(archive.file_names().collect::<Vec<_>>(), ["index.html"]);
    }

    #[tokio::test]
    async fn missing_remote_object() {
        let dir = tempfile::tempdir().expect("unable to create temporary directory");
        fs::write(dir.path().join("index.html"), "<h1>Hi</h1>").expect("unable to write file");

        let exclusions = Exclusions::new::<&str>(dir.path(), &[]).expect("patterns must be valid");
        let provider = ScriptedProvider::default().losing_uploads();

        let result =
            upload_source_bundle(&provider, &test_session(), dir.path(), &exclusions).await;

        assert!(matches!(result, Err(BundleError::MissingRemoteObject(_))));
    }
}

use std::{
    collections::BTreeSet,
    fs::File,
    io::{self, Seek, Write},
    path::{Component, Path, StripPrefixError},
};

use common::hash;
use derive_more::{Display, Error, From};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};
use zip::{write::FileOptions, ZipWriter};

/// Errors that may occur during the archive creation process.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ArchiverError {
    /// [`zip`]-crate specific error.
    Zip(zip::result::ZipError),

    /// [`walkdir`]-crate specific error.
    WalkDir(walkdir::Error),

    /// Invalid exclusion pattern.
    #[display(fmt = "invalid exclusion pattern: {}", _0)]
    Pattern(ignore::Error),

    /// IO error.
    Io(io::Error),

    /// Unable to strip project root prefix from path.
    StripPrefix(StripPrefixError),
}

/// Set of paths left out of the source bundle.
///
/// Patterns follow the gitignore syntax and are matched relative to the project root.
pub(crate) struct Exclusions {
    /// Compiled gitignore matcher rooted at the project directory.
    matcher: Gitignore,
}

impl Exclusions {
    /// Build the exclusion set.
    ///
    /// Duplicate and blank patterns are dropped.
    pub(crate) fn new<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Self, ArchiverError> {
        let patterns: BTreeSet<&str> = patterns
            .iter()
            .map(|pattern| pattern.as_ref().trim())
            .filter(|pattern| !pattern.is_empty())
            .collect();

        let mut builder = GitignoreBuilder::new(root);

        for pattern in patterns {
            builder.add_line(None, pattern)?;
        }

        Ok(Self {
            matcher: builder.build()?,
        })
    }

    /// Build the exclusion set, additionally excluding the provided `files`.
    ///
    /// Relative file paths are resolved against `root`. Absolute paths outside of `root`
    /// can never be archived and are skipped.
    pub(crate) fn with_files<S: AsRef<str>>(
        root: &Path,
        patterns: &[S],
        files: &[&Path],
    ) -> Result<Self, ArchiverError> {
        let patterns: Vec<String> = patterns
            .iter()
            .map(|pattern| pattern.as_ref().to_owned())
            .chain(files.iter().filter_map(|file| anchored_pattern(root, file)))
            .collect();

        Self::new(root, &patterns)
    }

    /// Check whether the provided path under the project root is excluded.
    fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        self.matcher.matched(path, is_dir).is_ignore()
    }
}

/// Archive the project `root` into the provided `file`.
///
/// See [`walk_project_directory`] for more information on which files
/// and directories are ignored during the packaging process.
pub(crate) fn build_zip_archive<W: Write + Seek>(
    root: &Path,
    exclusions: &Exclusions,
    file: W,
) -> Result<W, ArchiverError> {
    let mut writer = ZipWriter::new(file);

    let mut entries = walk_project_directory(root, exclusions);

    while let Some(entry) = entries.next().transpose()? {
        let Some(path) = entry_name(root, &entry)? else {
            continue;
        };

        if !path.is_empty() {
            if entry.file_type().is_dir() {
                writer.add_directory(path, FileOptions::default())?;
            } else if entry.file_type().is_file() {
                writer.start_file(path, FileOptions::default())?;
                io::copy(&mut File::open(entry.path())?, &mut writer)?;
            }
        }
    }

    Ok(writer.finish()?)
}

/// Compute the hex-encoded content hash of the project `root`.
///
/// File contents are concatenated in the order of their relative paths,
/// which makes the result independent of the directory read order.
pub(crate) fn checksum_directory(
    root: &Path,
    exclusions: &Exclusions,
) -> Result<String, ArchiverError> {
    let mut files = Vec::new();

    for entry in walk_project_directory(root, exclusions) {
        let entry = entry?;

        if entry.file_type().is_file() {
            if let Some(path) = entry_name(root, &entry)? {
                files.push((path, entry.into_path()));
            }
        }
    }

    files.sort_unstable();

    let hash = hash::blake2_concat(files.iter().map(|(_, path)| File::open(path)))?;

    Ok(hex::encode(hash))
}

/// Pattern that matches exactly one file, anchored at the project root.
fn anchored_pattern(root: &Path, file: &Path) -> Option<String> {
    let relative = if file.is_absolute() {
        file.strip_prefix(root).ok()?
    } else {
        file
    };

    let mut parts = Vec::new();

    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }

    (!parts.is_empty()).then(|| format!("/{}", parts.join("/")))
}

/// Get the archive entry name of a walked entry.
///
/// Returns [`None`] for paths that contain non-unicode symbols.
fn entry_name(root: &Path, entry: &DirEntry) -> Result<Option<String>, ArchiverError> {
    let relative = entry.path().strip_prefix(root)?;

    let Some(path) = relative.to_str() else {
        warn!(path = %entry.path().display(), "path contains non-unicode symbols, skipping");
        return Ok(None);
    };

    Ok(Some(path.replace(std::path::MAIN_SEPARATOR, "/")))
}

/// Recursively iterate over the project files and directories while filtering them.
///
/// Returned [`Iterator`] will not yield any entries matched by the provided [`Exclusions`],
/// nor anything inside of an excluded directory.
fn walk_project_directory<'a>(
    root: &Path,
    exclusions: &'a Exclusions,
) -> impl Iterator<Item = Result<DirEntry, walkdir::Error>> + 'a {
    WalkDir::new(root).into_iter().filter_entry(move |entry| {
        entry.depth() == 0 || !exclusions.is_excluded(entry.path(), entry.file_type().is_dir())
    })
}

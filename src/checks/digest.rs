use super::{Check, CheckError};
use glob::{MatchOptions, Pattern};
use log::trace;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    collections::BTreeMap,
    fs::File,
    io,
    path::{Component, Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

/// The patterns ignored if nothing else is configured: dotfiles and `_src` folders.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &["**/.*", "**/_src/*"];

// `*` stays inside one path component, `**/` spans directories.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A custom error describing the error cases for computing digests.
#[derive(Debug, Error)]
pub enum DigestError {
    /// One of the ignore patterns is not a valid glob.
    #[error("{0} is not a valid ignore pattern ({1})")]
    InvalidPattern(String, String),
    /// The root to watch doesn't exist or is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(String),
    /// Walking the directory tree failed.
    #[error("cannot walk directory: {0}")]
    Walk(String),
    /// Reading a file failed, so it cannot be hashed.
    #[error("cannot read {0}: {1}")]
    Read(String, io::Error),
    /// A file name is not valid UTF-8, so it has no key to deploy it by.
    #[error("{0} has a name that is not valid UTF-8, rename or ignore it")]
    InvalidName(String),
}

/// A set of glob patterns, that excludes paths from both digesting and deploying.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// Compile the patterns, failing on the first invalid one.
    pub fn new<I, S>(patterns: I) -> Result<Self, DigestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Pattern::new(pattern)
                    .map_err(|err| DigestError::InvalidPattern(pattern.to_string(), err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IgnoreSet { patterns })
    }

    /// Test a path relative to the watched root (without leading slash).
    pub fn is_ignored(&self, relative: &Path) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_path_with(relative, MATCH_OPTIONS))
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        IgnoreSet {
            patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .filter_map(|pattern| Pattern::new(pattern).ok())
                .collect(),
        }
    }
}

/// A mapping from every file path (relative to the root, with a leading slash)
/// to the SHA-256 of its contents.
///
/// Two digests are equal if every path and hash is equal, regardless of the
/// order the files were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryDigest(BTreeMap<String, String>);

impl DirectoryDigest {
    /// Walk the directory under `root` and hash every file not matched by `ignore`.
    ///
    /// Any unreadable file or directory fails the whole computation.
    pub fn compute(root: &Path, ignore: &IgnoreSet) -> Result<Self, DigestError> {
        if !root.is_dir() {
            return Err(DigestError::NotADirectory(root.display().to_string()));
        }

        let mut files = BTreeMap::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || entry
                        .path()
                        .strip_prefix(root)
                        .map(|relative| !ignore.is_ignored(relative))
                        .unwrap_or(true)
            });

        for entry in walker {
            let entry = entry.map_err(|err| DigestError::Walk(err.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|err| DigestError::Walk(err.to_string()))?;
            let key = to_key(relative)?;
            let hash = hash_file(entry.path())?;
            trace!("Hashed {} to {hash}.", relative.display());
            files.insert(key, hash);
        }

        Ok(DirectoryDigest(files))
    }

    /// The number of files in the digest.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no file was found.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The hash of one file, looked up by its key (e.g. `/img/logo.png`).
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    /// Iterate over the file keys in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every path that was added, modified or removed compared to `previous`.
    pub fn changed_paths(&self, previous: &DirectoryDigest) -> Vec<String> {
        let mut changed: Vec<String> = self
            .0
            .iter()
            .filter(|(path, hash)| previous.0.get(*path) != Some(*hash))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(
            previous
                .0
                .keys()
                .filter(|path| !self.0.contains_key(*path))
                .cloned(),
        );
        changed.sort();
        changed
    }

    /// Convert a digest key back to a path under `root`.
    pub fn resolve(root: &Path, key: &str) -> PathBuf {
        root.join(key.trim_start_matches('/'))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DirectoryDigest {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        DirectoryDigest(
            iter.into_iter()
                .map(|(path, hash)| (path.into(), hash.into()))
                .collect(),
        )
    }
}

fn to_key(relative: &Path) -> Result<String, DigestError> {
    let mut key = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part
                .to_str()
                .ok_or_else(|| DigestError::InvalidName(relative.display().to_string()))?;
            key.push('/');
            key.push_str(part);
        }
    }
    Ok(key)
}

fn hash_file(path: &Path) -> Result<String, DigestError> {
    let read_error = |err| DigestError::Read(path.display().to_string(), err);

    let mut file = File::open(path).map_err(read_error)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(read_error)?;

    Ok(format!("{:x}", hasher.finalize()))
}

/// A check hashing every file in the watched directory.
pub struct DigestCheck {
    root: PathBuf,
    ignore: IgnoreSet,
}

impl DigestCheck {
    /// Creates a new check for the root directory with the ignore patterns.
    pub fn new(root: PathBuf, ignore: IgnoreSet) -> Self {
        DigestCheck { root, ignore }
    }
}

impl Check for DigestCheck {
    fn digest(&self) -> Result<DirectoryDigest, CheckError> {
        let digest = DirectoryDigest::compute(&self.root, &self.ignore)?;

        Ok(digest)
    }
}

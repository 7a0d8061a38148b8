//! Object listing and pattern-based selection.

use globset::{Glob, GlobMatcher};
use regex::Regex;
use tracing::debug;

use crate::path::{clean_folder_name, has_key_prefix, normalize_key};
use crate::spec::{BlobOpError, EnumMatchMode, SpecMatch, SpecRemoteObject};
use crate::storage::{StorageClient, StorageError};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
enum TypeMatcherFile {
    Exact(String),
    Regex(Regex),
    Glob(GlobMatcher),
}

/// Compiled [`SpecMatch`].
///
/// Regex mode uses search semantics: a candidate is kept when the pattern
/// matches anywhere in its full path. Anchor the pattern to require more.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    spec_match: SpecMatch,
    matcher: TypeMatcherFile,
}

impl FileMatcher {
    pub fn new(spec_match: SpecMatch) -> Result<Self, BlobOpError> {
        let matcher = _compile(&spec_match)?;
        Ok(Self {
            spec_match,
            matcher,
        })
    }

    pub fn spec(&self) -> &SpecMatch {
        &self.spec_match
    }

    pub fn is_match(&self, path: &str) -> bool {
        match &self.matcher {
            TypeMatcherFile::Exact(c_path) => normalize_key(path) == *c_path,
            TypeMatcherFile::Regex(regex) => regex.is_match(path),
            TypeMatcherFile::Glob(glob) => glob.is_match(path),
        }
    }

    /// Keep the candidates that match, preserving listing order.
    pub fn select(&self, candidates: Vec<SpecRemoteObject>) -> Vec<SpecRemoteObject> {
        candidates
            .into_iter()
            .filter(|obj| self.is_match(&obj.path))
            .collect()
    }

    /// Same as [`FileMatcher::select`] for plain keys (local upload candidates).
    pub fn select_keys(&self, keys: Vec<String>) -> Vec<String> {
        keys.into_iter().filter(|key| self.is_match(key)).collect()
    }
}

fn _compile(spec_match: &SpecMatch) -> Result<TypeMatcherFile, BlobOpError> {
    match spec_match.mode {
        EnumMatchMode::ExactMatch => {
            let c_path = normalize_key(&spec_match.pattern);
            if c_path.is_empty() {
                return Err(BlobOpError::InvalidInput(
                    "Arg `source_file_name` must name an object in exact_match mode.".to_string(),
                ));
            }
            Ok(TypeMatcherFile::Exact(c_path))
        }
        EnumMatchMode::RegexMatch => Regex::new(&spec_match.pattern)
            .map(TypeMatcherFile::Regex)
            .map_err(|e| BlobOpError::InvalidInput(format!("Invalid regex pattern: {e}"))),
        EnumMatchMode::GlobMatch => Glob::new(&spec_match.pattern)
            .map(|glob| TypeMatcherFile::Glob(glob.compile_matcher()))
            .map_err(|e| BlobOpError::InvalidInput(format!("Invalid glob pattern: {e}"))),
    }
}

/// Select `candidates` against `spec_match`.
pub fn match_objects(
    candidates: Vec<SpecRemoteObject>,
    spec_match: &SpecMatch,
) -> Result<Vec<SpecRemoteObject>, BlobOpError> {
    Ok(FileMatcher::new(spec_match.clone())?.select(candidates))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Listing

/// List every object of `container` under `prefix`.
///
/// The backend result is consumed fully and filtered again client-side, so
/// a backend that ignores or loosens the prefix still yields a scoped set.
pub fn list_objects(
    client: &dyn StorageClient,
    container: &str,
    prefix: &str,
) -> Result<Vec<SpecRemoteObject>, BlobOpError> {
    let c_prefix = clean_folder_name(prefix);
    let l_listing = client
        .list_objects(container, &c_prefix)
        .map_err(|e| match e {
            StorageError::Unauthorized(message) => BlobOpError::IncorrectCredentials { message },
            other => BlobOpError::ListFailed {
                container: container.to_string(),
                prefix: c_prefix.clone(),
                message: other.to_string(),
            },
        })?;

    let n_listed = l_listing.len();
    let l_objects: Vec<SpecRemoteObject> = l_listing
        .into_iter()
        .filter(|item| has_key_prefix(&item.name, &c_prefix))
        .map(|item| SpecRemoteObject::new(container, &item.name))
        .collect();
    debug!(
        container,
        prefix = %c_prefix,
        n_listed,
        n_kept = l_objects.len(),
        "listed objects"
    );
    Ok(l_objects)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

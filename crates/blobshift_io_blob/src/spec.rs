//! Selection, naming and transfer models plus top-level error types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::path::normalize_key;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// How `--source-file-name` selects objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumMatchMode {
    /// Pattern is the literal full path of one object.
    #[default]
    ExactMatch,
    /// Regular expression searched (unanchored) in each candidate's full path.
    RegexMatch,
    /// Shell-like wildcards matched against each candidate's full path.
    GlobMatch,
}

impl EnumMatchMode {
    /// Flag value as accepted on the command line.
    pub fn as_flag(self) -> &'static str {
        match self {
            Self::ExactMatch => "exact_match",
            Self::RegexMatch => "regex_match",
            Self::GlobMatch => "glob_match",
        }
    }

    /// Whether selection needs a prior listing of the container.
    pub fn if_requires_listing(self) -> bool {
        !matches!(self, Self::ExactMatch)
    }
}

impl FromStr for EnumMatchMode {
    type Err = BlobOpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "exact_match" => Ok(Self::ExactMatch),
            "regex_match" => Ok(Self::RegexMatch),
            "glob_match" => Ok(Self::GlobMatch),
            other => Err(BlobOpError::InvalidInput(format!(
                "Unknown match type `{other}` (expected exact_match, regex_match or glob_match)"
            ))),
        }
    }
}

/// Copy status as reported by the storage backend for one copy handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopyStatus {
    Success,
    Pending,
    Failed,
    Aborted,
}

impl fmt::Display for EnumCopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let txt = match self {
            Self::Success => "success",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        f.write_str(txt)
    }
}

/// Lifecycle of one relocation (`SpecCopyOperation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumTransferStatus {
    Pending,
    Copying,
    Succeeded,
    Failed,
}

/// Batch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumTransferKind {
    Move,
    Delete,
    Download,
    Upload,
}

impl EnumTransferKind {
    /// Mutating operations treat an empty selection as a user error.
    pub fn if_requires_match(self) -> bool {
        matches!(self, Self::Move | Self::Delete)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Delete => "delete",
            Self::Download => "download",
            Self::Upload => "upload",
        }
    }

    /// Progressive verb used in per-object log lines.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Move => "Moving",
            Self::Delete => "Deleting",
            Self::Download => "Downloading",
            Self::Upload => "Uploading",
        }
    }
}

/// Result codes surfaced to the process boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumResultCode {
    NoMatchesFound,
    IncorrectCredentials,
    MoveFailed,
    GenericDeleteFailed,
    InvalidInput,
    ListFailed,
    DownloadFailed,
    UploadFailed,
}

impl EnumResultCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoMatchesFound => "NO_MATCHES_FOUND",
            Self::IncorrectCredentials => "INCORRECT_CREDENTIALS",
            Self::MoveFailed => "MOVE_FAILED",
            Self::GenericDeleteFailed => "GENERIC_DELETE_FAILED",
            Self::InvalidInput => "INVALID_INPUT",
            Self::ListFailed => "LIST_FAILED",
            Self::DownloadFailed => "DOWNLOAD_FAILED",
            Self::UploadFailed => "UPLOAD_FAILED",
        }
    }
}

impl fmt::Display for EnumResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// One stored object within a container. The path is always normalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecRemoteObject {
    pub container: String,
    pub path: String,
}

impl SpecRemoteObject {
    pub fn new(container: impl Into<String>, path: &str) -> Self {
        Self {
            container: container.into(),
            path: normalize_key(path),
        }
    }
}

impl fmt::Display for SpecRemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.path)
    }
}

/// Selection rule for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMatch {
    pub pattern: String,
    pub mode: EnumMatchMode,
}

impl SpecMatch {
    pub fn new(pattern: impl Into<String>, mode: EnumMatchMode) -> Self {
        Self {
            pattern: pattern.into(),
            mode,
        }
    }
}

/// Destination naming input for one object.
///
/// `index` carries the 1-based ordinal and is only set when the batch has
/// more than one member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecDestinationPlan {
    /// Destination folder (normalized, no leading/trailing separator).
    pub folder: String,
    /// Explicit destination file name, if the caller supplied one.
    pub base_name: Option<String>,
    /// Disambiguation ordinal.
    pub index: Option<usize>,
}

/// Transient state of one copy-then-delete relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCopyOperation {
    pub source: SpecRemoteObject,
    pub destination: SpecRemoteObject,
    pub status: EnumTransferStatus,
}

/// User-level description of one batch, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SpecTransferRequest {
    /// Target container for every call in the batch.
    pub container: String,
    /// Folder scoping the source path, or the listing prefix in pattern modes.
    pub source_folder: String,
    /// Literal file name (exact mode) or pattern (regex/glob modes).
    pub source_file_name: String,
    pub rule_match: EnumMatchMode,
    /// Destination folder; unused by delete.
    pub destination_folder: String,
    /// Explicit destination file name; derived from the source when absent.
    pub destination_file_name: Option<String>,
}

/// Per-run knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecTransferOptions {
    /// List, match and name but never mutate storage or local files.
    pub if_dry_run: bool,
}

/// Errors that end a batch. Every variant maps to exactly one [`EnumResultCode`].
#[derive(Debug, Error)]
pub enum BlobOpError {
    /// A pattern selected nothing for an operation that must act on something.
    #[error("No files matching {pattern} found")]
    NoMatchesFound { pattern: String },

    /// The storage client could not be constructed or authorized.
    #[error("Incorrect credentials: {message}")]
    IncorrectCredentials { message: String },

    /// Copy did not report success; the source was kept.
    #[error("Copy blob from {path_src} to {path_dst} failed: {reason}")]
    MoveFailed {
        path_src: String,
        path_dst: String,
        reason: String,
    },

    /// Delete call failed (delete-only run, or the delete step of a move).
    #[error("Delete of {path} failed: {message}")]
    DeleteFailed { path: String, message: String },

    /// Malformed arguments or a plan that would lose data.
    #[error("{0}")]
    InvalidInput(String),

    /// Container listing failed.
    #[error("Listing {container} with prefix `{prefix}` failed: {message}")]
    ListFailed {
        container: String,
        prefix: String,
        message: String,
    },

    #[error("Download of {path} to {} failed: {message}", path_local.display())]
    DownloadFailed {
        path: String,
        path_local: PathBuf,
        message: String,
    },

    #[error("Upload of {} to {path} failed: {message}", path_local.display())]
    UploadFailed {
        path_local: PathBuf,
        path: String,
        message: String,
    },
}

impl BlobOpError {
    pub fn code(&self) -> EnumResultCode {
        match self {
            Self::NoMatchesFound { .. } => EnumResultCode::NoMatchesFound,
            Self::IncorrectCredentials { .. } => EnumResultCode::IncorrectCredentials,
            Self::MoveFailed { .. } => EnumResultCode::MoveFailed,
            Self::DeleteFailed { .. } => EnumResultCode::GenericDeleteFailed,
            Self::InvalidInput(_) => EnumResultCode::InvalidInput,
            Self::ListFailed { .. } => EnumResultCode::ListFailed,
            Self::DownloadFailed { .. } => EnumResultCode::DownloadFailed,
            Self::UploadFailed { .. } => EnumResultCode::UploadFailed,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

//! Batch orchestration: select -> name -> move/delete/download/upload -> report.
//!
//! Every batch is strictly sequential. Object `i + 1` is never touched before
//! object `i` has reached a definite outcome, and the first failure ends the
//! batch with that object's error.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::matcher::{FileMatcher, list_objects};
use crate::naming::{derive_ordinal, resolve_destinations};
use crate::path::{clean_folder_name, combine_folder_and_file_name};
use crate::report::{
    EnumTransferOutcome, ReportTransfer, ReportTransferBuilder, SpecTransferEntry,
    TransferObserver,
};
use crate::spec::{
    BlobOpError, EnumCopyStatus, EnumTransferKind, EnumTransferStatus, SpecCopyOperation,
    SpecDestinationPlan, SpecMatch, SpecRemoteObject, SpecTransferOptions, SpecTransferRequest,
};
use crate::storage::{SpecCopyHandle, StorageClient, StorageError};
use crate::util::collect_file_keys;

////////////////////////////////////////////////////////////////////////////////
// #region CopyOperation

impl SpecCopyOperation {
    pub fn new(source: SpecRemoteObject, destination: SpecRemoteObject) -> Self {
        Self {
            source,
            destination,
            status: EnumTransferStatus::Pending,
        }
    }

    /// Apply `next` if it is a legal transition; returns whether it was applied.
    ///
    /// `Pending -> Copying -> {Succeeded, Failed}` for moves,
    /// `Pending -> {Succeeded, Failed}` for deletes.
    pub fn advance(&mut self, next: EnumTransferStatus) -> bool {
        use EnumTransferStatus::{Copying, Failed, Pending, Succeeded};

        let b_is_legal = matches!(
            (self.status, next),
            (Pending, Copying) | (Pending | Copying, Succeeded | Failed)
        );
        if b_is_legal {
            self.status = next;
        }
        b_is_legal
    }

    fn fail_move(&mut self, reason: String) -> BlobOpError {
        self.advance(EnumTransferStatus::Failed);
        BlobOpError::MoveFailed {
            path_src: self.source.path.clone(),
            path_dst: self.destination.path.clone(),
            reason,
        }
    }
}

/// Relocate one object: copy, verify, then delete the source.
pub fn move_object(
    client: &dyn StorageClient,
    source: &SpecRemoteObject,
    destination: &SpecRemoteObject,
) -> Result<(), BlobOpError> {
    let mut spec_copy_op = SpecCopyOperation::new(source.clone(), destination.clone());
    execute_move(client, &mut spec_copy_op)
}

/// Drive `spec_copy_op` to `Succeeded` or `Failed`.
///
/// The source is deleted only after the destination reports a successful
/// copy. Any other copy status aborts the copy (best effort) and keeps the
/// source. A failed delete after a good copy leaves both objects in place.
pub fn execute_move(
    client: &dyn StorageClient,
    spec_copy_op: &mut SpecCopyOperation,
) -> Result<(), BlobOpError> {
    if spec_copy_op.source.container != spec_copy_op.destination.container {
        return Err(spec_copy_op.fail_move(format!(
            "destination container {} differs from source container {}",
            spec_copy_op.destination.container, spec_copy_op.source.container
        )));
    }
    if spec_copy_op.source.path == spec_copy_op.destination.path {
        return Err(
            spec_copy_op.fail_move("source and destination are the same object".to_string())
        );
    }

    let c_container = spec_copy_op.source.container.clone();
    spec_copy_op.advance(EnumTransferStatus::Copying);
    let handle = match client.copy_object(
        &c_container,
        &spec_copy_op.source.path,
        &spec_copy_op.destination.path,
        true,
    ) {
        Ok(v) => v,
        Err(e) => return Err(spec_copy_op.fail_move(e.to_string())),
    };

    let copy_state = match client.get_copy_status(&handle) {
        Ok(v) => v,
        Err(e) => {
            abort_copy_best_effort(client, &handle);
            return Err(spec_copy_op.fail_move(format!("cannot read copy status: {e}")));
        }
    };
    if copy_state.status != EnumCopyStatus::Success {
        abort_copy_best_effort(client, &handle);
        return Err(spec_copy_op.fail_move(format!("status {}", copy_state.status)));
    }
    debug!(
        container = %c_container,
        path_src = %spec_copy_op.source.path,
        path_dst = %spec_copy_op.destination.path,
        id = %copy_state.id,
        "copy verified"
    );

    if let Err(e) = client.delete_object(&c_container, &spec_copy_op.source.path) {
        spec_copy_op.advance(EnumTransferStatus::Failed);
        warn!(
            "Copied {} to {} but could not delete the source; both objects remain",
            spec_copy_op.source, spec_copy_op.destination
        );
        return Err(BlobOpError::DeleteFailed {
            path: spec_copy_op.source.path.clone(),
            message: e.to_string(),
        });
    }
    spec_copy_op.advance(EnumTransferStatus::Succeeded);
    Ok(())
}

fn abort_copy_best_effort(client: &dyn StorageClient, handle: &SpecCopyHandle) {
    if let Err(e) = client.abort_copy(handle) {
        warn!(id = %handle.id, path_dst = %handle.path_dst, error = %e, "abort copy failed");
    }
}

/// Delete one object.
pub fn delete_object(
    client: &dyn StorageClient,
    target: &SpecRemoteObject,
) -> Result<(), BlobOpError> {
    client
        .delete_object(&target.container, &target.path)
        .map_err(|e| BlobOpError::DeleteFailed {
            path: target.path.clone(),
            message: e.to_string(),
        })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Selection

fn select_remote_objects(
    client: &dyn StorageClient,
    request: &SpecTransferRequest,
    builder_report: &mut ReportTransferBuilder,
) -> Result<Vec<SpecRemoteObject>, BlobOpError> {
    let kind = builder_report.kind();
    let matcher = FileMatcher::new(SpecMatch::new(
        request.source_file_name.clone(),
        request.rule_match,
    ))?;

    if !request.rule_match.if_requires_listing() {
        let c_path =
            combine_folder_and_file_name(&request.source_folder, &request.source_file_name);
        if c_path.is_empty() {
            return Err(BlobOpError::InvalidInput(
                "Source folder and file name resolve to an empty path.".to_string(),
            ));
        }
        return Ok(vec![SpecRemoteObject::new(request.container.clone(), &c_path)]);
    }

    let l_candidates = list_objects(client, &request.container, &request.source_folder)?;
    builder_report.set_listed(l_candidates.len());
    let l_matched = matcher.select(l_candidates);
    ensure_matches(kind, &request.source_file_name, l_matched.len())?;
    Ok(l_matched)
}

fn ensure_matches(
    kind: EnumTransferKind,
    pattern: &str,
    n_matched: usize,
) -> Result<(), BlobOpError> {
    if n_matched == 0 {
        if kind.if_requires_match() {
            return Err(BlobOpError::NoMatchesFound {
                pattern: pattern.to_string(),
            });
        }
        warn!("No files matching {pattern} found");
        return Ok(());
    }
    info!("{n_matched} files found. Preparing to {}...", kind.label());
    Ok(())
}

/// Destinations must be pairwise distinct and, for moves, must not overwrite
/// another source of the same batch.
fn validate_plan(
    l_sources: &[String],
    l_destinations: &[String],
    if_check_overlap: bool,
) -> Result<(), BlobOpError> {
    let mut set_seen: HashSet<&str> = HashSet::with_capacity(l_destinations.len());
    for c_dst in l_destinations {
        if !set_seen.insert(c_dst.as_str()) {
            return Err(BlobOpError::InvalidInput(format!(
                "Destination {c_dst} is produced by more than one source."
            )));
        }
    }
    if if_check_overlap {
        let set_sources: HashSet<&str> = l_sources.iter().map(String::as_str).collect();
        if let Some(c_dst) = l_destinations
            .iter()
            .find(|c_dst| set_sources.contains(c_dst.as_str()))
        {
            return Err(BlobOpError::InvalidInput(format!(
                "Destination {c_dst} is also a source of this batch."
            )));
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Batches

/// Move every selected object into the destination folder.
///
/// Regex/glob selection with no match fails with `NO_MATCHES_FOUND` before
/// any mutating call.
pub fn move_objects(
    client: &dyn StorageClient,
    request: &SpecTransferRequest,
    spec_options: SpecTransferOptions,
    observer: &mut dyn TransferObserver,
) -> Result<ReportTransfer, BlobOpError> {
    let mut builder_report = ReportTransferBuilder::new(EnumTransferKind::Move);
    let l_sources = select_remote_objects(client, request, &mut builder_report)?;
    builder_report.set_matched(l_sources.len());

    let spec_plan = SpecDestinationPlan::new(
        &request.destination_folder,
        request.destination_file_name.as_deref(),
    );
    let l_destinations = resolve_destinations(&spec_plan, &l_sources);
    validate_plan(
        &l_sources.iter().map(|o| o.path.clone()).collect::<Vec<_>>(),
        &l_destinations.iter().map(|o| o.path.clone()).collect::<Vec<_>>(),
        true,
    )?;

    for (n_idx, (source, destination)) in l_sources.iter().zip(&l_destinations).enumerate() {
        let outcome = if spec_options.if_dry_run {
            EnumTransferOutcome::Skipped
        } else {
            match move_object(client, source, destination) {
                Ok(_) => EnumTransferOutcome::Succeeded,
                Err(e) => {
                    builder_report.add_entry(
                        _entry(
                            n_idx,
                            &source.path,
                            Some(destination.path.as_str()),
                            EnumTransferOutcome::Failed(e.to_string()),
                        ),
                        observer,
                    );
                    return Err(e);
                }
            }
        };
        builder_report.add_entry(
            _entry(n_idx, &source.path, Some(destination.path.as_str()), outcome),
            observer,
        );
    }
    Ok(builder_report.build())
}

/// Delete every selected object, stopping at the first failure.
pub fn delete_objects(
    client: &dyn StorageClient,
    request: &SpecTransferRequest,
    spec_options: SpecTransferOptions,
    observer: &mut dyn TransferObserver,
) -> Result<ReportTransfer, BlobOpError> {
    let mut builder_report = ReportTransferBuilder::new(EnumTransferKind::Delete);
    let l_targets = select_remote_objects(client, request, &mut builder_report)?;
    builder_report.set_matched(l_targets.len());

    for (n_idx, target) in l_targets.iter().enumerate() {
        let outcome = if spec_options.if_dry_run {
            EnumTransferOutcome::Skipped
        } else {
            match delete_object(client, target) {
                Ok(_) => EnumTransferOutcome::Succeeded,
                Err(e) => {
                    builder_report.add_entry(
                        _entry(
                            n_idx,
                            &target.path,
                            None,
                            EnumTransferOutcome::Failed(e.to_string()),
                        ),
                        observer,
                    );
                    return Err(e);
                }
            }
        };
        builder_report.add_entry(_entry(n_idx, &target.path, None, outcome), observer);
    }
    Ok(builder_report.build())
}

/// Download every selected object below `path_dir_local_root`.
///
/// An empty selection is not an error.
pub fn download_objects(
    client: &dyn StorageClient,
    request: &SpecTransferRequest,
    spec_options: SpecTransferOptions,
    path_dir_local_root: &Path,
    observer: &mut dyn TransferObserver,
) -> Result<ReportTransfer, BlobOpError> {
    let mut builder_report = ReportTransferBuilder::new(EnumTransferKind::Download);
    let l_sources = select_remote_objects(client, request, &mut builder_report)?;
    builder_report.set_matched(l_sources.len());

    let spec_plan = SpecDestinationPlan::new(
        &request.destination_folder,
        request.destination_file_name.as_deref(),
    );
    let n_total = l_sources.len();
    let l_destinations: Vec<String> = l_sources
        .iter()
        .enumerate()
        .map(|(n_idx, source)| {
            spec_plan
                .with_index(derive_ordinal(n_idx, n_total))
                .resolve_path(&source.path)
        })
        .collect();
    validate_plan(&[], &l_destinations, false)?;

    for (n_idx, (source, c_dst)) in l_sources.iter().zip(&l_destinations).enumerate() {
        let path_local = _join_key(path_dir_local_root, c_dst);
        let c_local = path_local.display().to_string();
        let outcome = if spec_options.if_dry_run {
            EnumTransferOutcome::Skipped
        } else {
            match download_one(client, source, &path_local) {
                Ok(_) => EnumTransferOutcome::Succeeded,
                Err(e) => {
                    builder_report.add_entry(
                        _entry(
                            n_idx,
                            &source.path,
                            Some(c_local.as_str()),
                            EnumTransferOutcome::Failed(e.to_string()),
                        ),
                        observer,
                    );
                    return Err(e);
                }
            }
        };
        builder_report.add_entry(
            _entry(n_idx, &source.path, Some(c_local.as_str()), outcome),
            observer,
        );
    }
    Ok(builder_report.build())
}

fn download_one(
    client: &dyn StorageClient,
    source: &SpecRemoteObject,
    path_local: &Path,
) -> Result<(), BlobOpError> {
    let to_error = |message: String| BlobOpError::DownloadFailed {
        path: source.path.clone(),
        path_local: path_local.to_path_buf(),
        message,
    };

    if let Some(path_parent) = path_local.parent() {
        fs::create_dir_all(path_parent).map_err(|e| to_error(e.to_string()))?;
    }
    let mut reader = client
        .download_object(&source.container, &source.path)
        .map_err(|e| to_error(e.to_string()))?;
    let mut file_dst = fs::File::create(path_local).map_err(|e| to_error(e.to_string()))?;
    io::copy(&mut reader, &mut file_dst).map_err(|e| to_error(e.to_string()))?;
    Ok(())
}

/// Upload every selected local file found below `path_dir_local_root`.
///
/// Pattern modes walk `<root>/<source_folder>` recursively and match the
/// root-relative `/`-separated path of each file. An empty selection is not
/// an error.
pub fn upload_objects(
    client: &dyn StorageClient,
    request: &SpecTransferRequest,
    spec_options: SpecTransferOptions,
    path_dir_local_root: &Path,
    observer: &mut dyn TransferObserver,
) -> Result<ReportTransfer, BlobOpError> {
    let mut builder_report = ReportTransferBuilder::new(EnumTransferKind::Upload);
    let matcher = FileMatcher::new(SpecMatch::new(
        request.source_file_name.clone(),
        request.rule_match,
    ))?;

    let l_keys = if request.rule_match.if_requires_listing() {
        let l_candidates = list_local_keys(path_dir_local_root, &request.source_folder)?;
        builder_report.set_listed(l_candidates.len());
        let l_keys = matcher.select_keys(l_candidates);
        ensure_matches(EnumTransferKind::Upload, &request.source_file_name, l_keys.len())?;
        l_keys
    } else {
        vec![combine_folder_and_file_name(
            &request.source_folder,
            &request.source_file_name,
        )]
    };
    builder_report.set_matched(l_keys.len());

    let spec_plan = SpecDestinationPlan::new(
        &request.destination_folder,
        request.destination_file_name.as_deref(),
    );
    let n_total = l_keys.len();
    let l_destinations: Vec<String> = l_keys
        .iter()
        .enumerate()
        .map(|(n_idx, c_key)| {
            spec_plan
                .with_index(derive_ordinal(n_idx, n_total))
                .resolve_path(c_key)
        })
        .collect();
    validate_plan(&[], &l_destinations, false)?;

    for (n_idx, (c_key, c_dst)) in l_keys.iter().zip(&l_destinations).enumerate() {
        let path_local = _join_key(path_dir_local_root, c_key);
        let c_local = path_local.display().to_string();
        let outcome = if spec_options.if_dry_run {
            EnumTransferOutcome::Skipped
        } else {
            match upload_one(client, &request.container, &path_local, c_dst) {
                Ok(_) => EnumTransferOutcome::Succeeded,
                Err(e) => {
                    builder_report.add_entry(
                        _entry(
                            n_idx,
                            &c_local,
                            Some(c_dst.as_str()),
                            EnumTransferOutcome::Failed(e.to_string()),
                        ),
                        observer,
                    );
                    return Err(e);
                }
            }
        };
        builder_report.add_entry(
            _entry(n_idx, &c_local, Some(c_dst.as_str()), outcome),
            observer,
        );
    }
    Ok(builder_report.build())
}

fn upload_one(
    client: &dyn StorageClient,
    container: &str,
    path_local: &Path,
    path_dst: &str,
) -> Result<(), BlobOpError> {
    let to_error = |message: String| BlobOpError::UploadFailed {
        path_local: path_local.to_path_buf(),
        path: path_dst.to_string(),
        message,
    };

    let mut file_src = fs::File::open(path_local).map_err(|e| to_error(e.to_string()))?;
    client
        .upload_object(container, path_dst, &mut file_src)
        .map_err(|e| match e {
            StorageError::ContainerNotFound { container } => {
                to_error(format!("Container \"{container}\" does not exist"))
            }
            StorageError::AlreadyExists { .. } => {
                to_error("File already exists in the container".to_string())
            }
            other => to_error(other.to_string()),
        })
}

fn list_local_keys(
    path_dir_local_root: &Path,
    source_folder: &str,
) -> Result<Vec<String>, BlobOpError> {
    let c_folder = clean_folder_name(source_folder);
    let path_dir_source = _join_key(path_dir_local_root, &c_folder);
    let mut l_keys = Vec::new();
    match collect_file_keys(&path_dir_source, &c_folder, &mut l_keys) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path_dir_source.display(), "source folder does not exist");
        }
        Err(e) => {
            return Err(BlobOpError::UploadFailed {
                path_local: path_dir_source,
                path: String::new(),
                message: format!("cannot scan source folder: {e}"),
            });
        }
    }
    l_keys.sort();
    Ok(l_keys)
}

fn _join_key(path_dir_root: &Path, c_key: &str) -> PathBuf {
    let mut path_item = path_dir_root.to_path_buf();
    for part in c_key.split('/').filter(|p| !p.is_empty()) {
        path_item.push(part);
    }
    path_item
}

fn _entry(
    n_idx: usize,
    source: &str,
    destination: Option<&str>,
    outcome: EnumTransferOutcome,
) -> SpecTransferEntry {
    SpecTransferEntry {
        ordinal: n_idx + 1,
        source: source.to_string(),
        destination: destination.map(str::to_string),
        outcome,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::{delete_objects, download_objects, execute_move, move_objects, upload_objects};
    use crate::report::{EnumTransferOutcome, SpecTransferEntry, TracingObserver};
    use crate::spec::{
        EnumCopyStatus, EnumMatchMode, EnumResultCode, EnumTransferKind, EnumTransferStatus,
        SpecCopyOperation, SpecRemoteObject, SpecTransferOptions, SpecTransferRequest,
    };
    use crate::storage::{EnumStorageCall, LocalStorage, MemoryStorage};

    fn request_regex(pattern: &str, folder: &str) -> SpecTransferRequest {
        SpecTransferRequest {
            container: "c".to_string(),
            source_folder: folder.to_string(),
            source_file_name: pattern.to_string(),
            rule_match: EnumMatchMode::RegexMatch,
            ..SpecTransferRequest::default()
        }
    }

    fn copy_sources(storage: &MemoryStorage) -> Vec<String> {
        storage
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                EnumStorageCall::Copy { path_src, .. } => Some(path_src),
                _ => None,
            })
            .collect()
    }

    fn seeded_storage(l_paths: &[&str]) -> MemoryStorage {
        let storage = MemoryStorage::new();
        for c_path in l_paths {
            storage.insert("c", c_path, c_path.as_bytes());
        }
        storage
    }

    #[test]
    fn regex_move_scenario_enumerates_explicit_name() {
        let storage =
            seeded_storage(&["2023/report_a.csv", "2023/report_b.csv", "2023/summary.csv"]);
        let request = SpecTransferRequest {
            destination_folder: "archive".to_string(),
            destination_file_name: Some("out.csv".to_string()),
            ..request_regex("report", "2023")
        };

        let report = move_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            &mut TracingObserver,
        )
        .expect("move");

        assert_eq!(report.cnt_listed, 3);
        assert_eq!(report.cnt_matched, 2);
        assert_eq!(report.cnt_succeeded, 2);
        assert_eq!(
            storage.object_names("c"),
            vec!["2023/summary.csv", "archive/out_1.csv", "archive/out_2.csv"]
        );
        assert_eq!(
            storage.read("c", "archive/out_2.csv").as_deref(),
            Some(&b"2023/report_b.csv"[..])
        );
    }

    #[test]
    fn zero_match_move_and_delete_fail_before_any_mutation() {
        let storage = seeded_storage(&["2023/summary.csv"]);
        let request = request_regex("report", "2023");

        let err = move_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            &mut TracingObserver,
        )
        .expect_err("no matches");
        assert_eq!(err.code(), EnumResultCode::NoMatchesFound);

        let err = delete_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            &mut TracingObserver,
        )
        .expect_err("no matches");
        assert_eq!(err.code(), EnumResultCode::NoMatchesFound);

        assert!(storage.calls().iter().all(|call| !call.if_mutating()));
        assert!(storage.contains("c", "2023/summary.csv"));
    }

    #[test]
    fn zero_match_download_is_not_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let storage = seeded_storage(&["2023/summary.csv"]);

        let report = download_objects(
            &storage,
            &request_regex("report", "2023"),
            SpecTransferOptions::default(),
            tmp.path(),
            &mut TracingObserver,
        )
        .expect("download");
        assert_eq!(report.cnt_matched, 0);
        assert!(report.entries.is_empty());
    }

    #[test]
    fn move_batch_stops_on_first_failure() {
        let storage = seeded_storage(&["in/a.csv", "in/b.csv", "in/c.csv"]);
        storage.force_copy_status("out/b_2.csv", EnumCopyStatus::Failed);
        let request = SpecTransferRequest {
            destination_folder: "out".to_string(),
            ..request_regex(r"\.csv$", "in")
        };

        let mut l_seen: Vec<SpecTransferEntry> = Vec::new();
        let mut observer =
            |_kind: EnumTransferKind, _n_total: usize, entry: &SpecTransferEntry| {
                l_seen.push(entry.clone());
            };
        let err = move_objects(&storage, &request, SpecTransferOptions::default(), &mut observer)
            .expect_err("second copy fails");
        assert_eq!(err.code(), EnumResultCode::MoveFailed);

        assert_eq!(copy_sources(&storage), vec!["in/a.csv", "in/b.csv"]);
        assert!(!storage.contains("c", "in/a.csv"));
        assert!(storage.contains("c", "out/a_1.csv"));
        assert!(storage.contains("c", "in/b.csv"));
        assert!(!storage.contains("c", "out/b_2.csv"));
        assert!(storage.contains("c", "in/c.csv"));
        assert!(!storage.contains("c", "out/c_3.csv"));

        assert_eq!(l_seen.len(), 2);
        assert_eq!(l_seen[0].outcome, EnumTransferOutcome::Succeeded);
        assert!(matches!(l_seen[1].outcome, EnumTransferOutcome::Failed(_)));
    }

    #[test]
    fn failed_copy_keeps_source_and_aborts_destination() {
        let storage = seeded_storage(&["a.csv"]);
        storage.force_copy_status("b.csv", EnumCopyStatus::Pending);

        let mut spec_copy_op = SpecCopyOperation::new(
            SpecRemoteObject::new("c", "a.csv"),
            SpecRemoteObject::new("c", "b.csv"),
        );
        let err = execute_move(&storage, &mut spec_copy_op).expect_err("pending copy");

        assert_eq!(err.code(), EnumResultCode::MoveFailed);
        assert_eq!(spec_copy_op.status, EnumTransferStatus::Failed);
        assert!(storage.contains("c", "a.csv"));
        assert!(!storage.contains("c", "b.csv"));
        assert!(
            storage
                .calls()
                .iter()
                .any(|call| matches!(call, EnumStorageCall::Abort { .. }))
        );
        assert!(
            storage
                .calls()
                .iter()
                .all(|call| !matches!(call, EnumStorageCall::Delete { .. }))
        );
    }

    #[test]
    fn delete_failure_after_copy_keeps_both_objects() {
        let storage = seeded_storage(&["a.csv"]);
        storage.fail_delete("a.csv");

        let mut spec_copy_op = SpecCopyOperation::new(
            SpecRemoteObject::new("c", "a.csv"),
            SpecRemoteObject::new("c", "moved/a.csv"),
        );
        let err = execute_move(&storage, &mut spec_copy_op).expect_err("delete fails");

        assert_eq!(err.code(), EnumResultCode::GenericDeleteFailed);
        assert_eq!(spec_copy_op.status, EnumTransferStatus::Failed);
        assert!(storage.contains("c", "a.csv"));
        assert!(storage.contains("c", "moved/a.csv"));
    }

    #[test]
    fn successful_move_transitions_through_copying() {
        let storage = seeded_storage(&["a.csv"]);
        let mut spec_copy_op = SpecCopyOperation::new(
            SpecRemoteObject::new("c", "a.csv"),
            SpecRemoteObject::new("c", "b.csv"),
        );
        execute_move(&storage, &mut spec_copy_op).expect("move");
        assert_eq!(spec_copy_op.status, EnumTransferStatus::Succeeded);
        assert!(!spec_copy_op.advance(EnumTransferStatus::Copying));
        assert!(!storage.contains("c", "a.csv"));
        assert!(storage.contains("c", "b.csv"));
    }

    #[test]
    fn exact_move_skips_listing_and_suffix() {
        let storage = seeded_storage(&["2023/report.csv"]);
        let request = SpecTransferRequest {
            container: "c".to_string(),
            source_folder: "/2023/".to_string(),
            source_file_name: "report.csv".to_string(),
            destination_folder: "archive".to_string(),
            ..SpecTransferRequest::default()
        };

        move_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            &mut TracingObserver,
        )
        .expect("move");

        assert!(
            storage
                .calls()
                .iter()
                .all(|call| !matches!(call, EnumStorageCall::List { .. }))
        );
        assert_eq!(storage.object_names("c"), vec!["archive/report.csv"]);
    }

    #[test]
    fn exact_move_of_missing_object_is_move_failure() {
        let storage = seeded_storage(&["other.csv"]);
        let request = SpecTransferRequest {
            container: "c".to_string(),
            source_file_name: "missing.csv".to_string(),
            destination_folder: "archive".to_string(),
            ..SpecTransferRequest::default()
        };

        let err = move_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            &mut TracingObserver,
        )
        .expect_err("missing source");
        assert_eq!(err.code(), EnumResultCode::MoveFailed);
    }

    #[test]
    fn single_regex_match_gets_no_suffix() {
        let storage = seeded_storage(&["in/only.csv", "in/skip.txt"]);
        let request = SpecTransferRequest {
            destination_folder: "out".to_string(),
            destination_file_name: Some("renamed.csv".to_string()),
            ..request_regex(r"\.csv$", "in")
        };

        move_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            &mut TracingObserver,
        )
        .expect("move");
        assert!(storage.contains("c", "out/renamed.csv"));
    }

    #[test]
    fn move_onto_own_path_is_rejected() {
        let storage = seeded_storage(&["in/a.csv"]);
        let request = SpecTransferRequest {
            container: "c".to_string(),
            source_folder: "in".to_string(),
            source_file_name: "a.csv".to_string(),
            destination_folder: "in".to_string(),
            ..SpecTransferRequest::default()
        };

        let err = move_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            &mut TracingObserver,
        )
        .expect_err("same path");
        assert_eq!(err.code(), EnumResultCode::InvalidInput);
        assert!(storage.calls().is_empty());
        assert!(storage.contains("c", "in/a.csv"));
    }

    #[test]
    fn destination_overwriting_later_source_is_rejected() {
        let storage = seeded_storage(&["a.csv", "a_1.csv"]);
        let request = SpecTransferRequest {
            destination_file_name: Some("a.csv".to_string()),
            ..request_regex(r"\.csv$", "")
        };

        let err = move_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            &mut TracingObserver,
        )
        .expect_err("overlap");
        assert_eq!(err.code(), EnumResultCode::InvalidInput);
        assert!(storage.calls().iter().all(|call| !call.if_mutating()));
    }

    #[test]
    fn delete_batch_stops_on_first_failure() {
        let storage = seeded_storage(&["d/1.log", "d/2.log", "d/3.log"]);
        storage.fail_delete("d/2.log");

        let err = delete_objects(
            &storage,
            &request_regex(r"\.log$", "d"),
            SpecTransferOptions::default(),
            &mut TracingObserver,
        )
        .expect_err("second delete fails");
        assert_eq!(err.code(), EnumResultCode::GenericDeleteFailed);

        assert!(!storage.contains("c", "d/1.log"));
        assert!(storage.contains("c", "d/2.log"));
        assert!(storage.contains("c", "d/3.log"));
        let n_deletes = storage
            .calls()
            .iter()
            .filter(|call| matches!(call, EnumStorageCall::Delete { .. }))
            .count();
        assert_eq!(n_deletes, 2);
    }

    #[test]
    fn dry_run_plans_without_mutation() {
        let storage = seeded_storage(&["in/a.csv", "in/b.csv"]);
        let request = SpecTransferRequest {
            destination_folder: "out".to_string(),
            ..request_regex("csv", "in")
        };

        let report = move_objects(
            &storage,
            &request,
            SpecTransferOptions { if_dry_run: true },
            &mut TracingObserver,
        )
        .expect("dry run");

        assert_eq!(report.cnt_skipped, 2);
        assert_eq!(report.cnt_succeeded, 0);
        assert_eq!(
            report.entries[1].destination.as_deref(),
            Some("out/b_2.csv")
        );
        assert!(storage.calls().iter().all(|call| !call.if_mutating()));
    }

    #[test]
    fn download_writes_enumerated_local_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let storage = seeded_storage(&["2023/report_a.csv", "2023/report_b.csv"]);
        let request = SpecTransferRequest {
            destination_folder: "/downloads/".to_string(),
            destination_file_name: Some("out.csv".to_string()),
            ..request_regex("report", "2023")
        };

        let report = download_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            tmp.path(),
            &mut TracingObserver,
        )
        .expect("download");

        assert_eq!(report.cnt_succeeded, 2);
        assert_eq!(
            fs::read_to_string(tmp.path().join("downloads/out_1.csv")).expect("read"),
            "2023/report_a.csv"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("downloads/out_2.csv")).expect("read"),
            "2023/report_b.csv"
        );
        assert!(storage.contains("c", "2023/report_a.csv"));
    }

    #[test]
    fn download_of_missing_object_fails() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let storage = seeded_storage(&[]);
        let request = SpecTransferRequest {
            container: "c".to_string(),
            source_file_name: "absent.bin".to_string(),
            ..SpecTransferRequest::default()
        };

        let err = download_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            tmp.path(),
            &mut TracingObserver,
        )
        .expect_err("missing");
        assert_eq!(err.code(), EnumResultCode::DownloadFailed);
    }

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, txt).expect("write text");
    }

    #[test]
    fn upload_matches_local_keys_and_refuses_overwrite() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_text(&tmp.path().join("data/report_a.csv"), "a");
        write_text(&tmp.path().join("data/nested/report_b.csv"), "b");
        write_text(&tmp.path().join("data/notes.txt"), "n");
        let storage = MemoryStorage::new();
        storage.create_container("c");

        let request = SpecTransferRequest {
            destination_folder: "incoming".to_string(),
            ..request_regex(r"report_.*\.csv$", "data")
        };
        let report = upload_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            tmp.path(),
            &mut TracingObserver,
        )
        .expect("upload");

        assert_eq!(report.cnt_listed, 3);
        assert_eq!(
            storage.object_names("c"),
            vec!["incoming/report_a_2.csv", "incoming/report_b_1.csv"]
        );

        let err = upload_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            tmp.path(),
            &mut TracingObserver,
        )
        .expect_err("already exists");
        assert_eq!(err.code(), EnumResultCode::UploadFailed);
    }

    #[test]
    fn upload_to_missing_container_fails() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_text(&tmp.path().join("a.txt"), "a");
        let storage = MemoryStorage::new();
        let request = SpecTransferRequest {
            container: "absent".to_string(),
            source_file_name: "a.txt".to_string(),
            ..SpecTransferRequest::default()
        };

        let err = upload_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            tmp.path(),
            &mut TracingObserver,
        )
        .expect_err("missing container");
        assert_eq!(err.code(), EnumResultCode::UploadFailed);
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn local_backend_move_end_to_end() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_text(&tmp.path().join("c/in/x/data.csv"), "x");
        write_text(&tmp.path().join("c/in/y/data.csv"), "y");
        let storage = LocalStorage::open(tmp.path()).expect("open");

        let request = SpecTransferRequest {
            destination_folder: "flat".to_string(),
            ..request_regex(r"data\.csv", "in")
        };
        let report = move_objects(
            &storage,
            &request,
            SpecTransferOptions::default(),
            &mut TracingObserver,
        )
        .expect("move");

        assert_eq!(report.cnt_succeeded, 2);
        assert_eq!(
            fs::read_to_string(tmp.path().join("c/flat/data_1.csv")).expect("read"),
            "x"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("c/flat/data_2.csv")).expect("read"),
            "y"
        );
        assert!(!tmp.path().join("c/in/x/data.csv").exists());
        assert!(!tmp.path().join("c/in/y/data.csv").exists());
    }
}

//! Destination naming for single objects and multi-object batches.

use crate::path::{clean_folder_name, combine_folder_and_file_name, extract_file_name};
use crate::spec::{SpecDestinationPlan, SpecRemoteObject};

/// Insert `_<ordinal>` before the last `.` of `file_name`, or append it when
/// there is no extension separator.
///
/// # Examples
/// ```
/// use blobshift_io_blob::naming::enumerate_file_name;
///
/// assert_eq!(enumerate_file_name("out.csv", 2), "out_2.csv");
/// assert_eq!(enumerate_file_name("data.tar.gz", 1), "data.tar_1.gz");
/// assert_eq!(enumerate_file_name("README", 3), "README_3");
/// ```
pub fn enumerate_file_name(file_name: &str, ordinal: usize) -> String {
    match file_name.rfind('.') {
        Some(n_pos) => format!("{}_{ordinal}{}", &file_name[..n_pos], &file_name[n_pos..]),
        None => format!("{file_name}_{ordinal}"),
    }
}

/// Ordinal for the `n_idx`-th (0-based) member of a batch of `n_total`.
///
/// Single-member batches get no ordinal so their names stay verbatim.
pub fn derive_ordinal(n_idx: usize, n_total: usize) -> Option<usize> {
    (n_total > 1).then_some(n_idx + 1)
}

impl SpecDestinationPlan {
    pub fn new(folder: &str, base_name: Option<&str>) -> Self {
        Self {
            folder: clean_folder_name(folder),
            base_name: base_name
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            index: None,
        }
    }

    /// Copy of this plan carrying `ordinal`.
    pub fn with_index(&self, ordinal: Option<usize>) -> Self {
        Self {
            index: ordinal,
            ..self.clone()
        }
    }

    /// File name for `source_path`: explicit name or source basename, then the
    /// ordinal suffix when `index` is set.
    pub fn resolve_file_name(&self, source_path: &str) -> String {
        let c_file_name = match &self.base_name {
            Some(name) => name.clone(),
            None => extract_file_name(source_path),
        };
        match self.index {
            Some(ordinal) => enumerate_file_name(&c_file_name, ordinal),
            None => c_file_name,
        }
    }

    /// Full destination key for `source_path`.
    pub fn resolve_path(&self, source_path: &str) -> String {
        combine_folder_and_file_name(&self.folder, &self.resolve_file_name(source_path))
    }
}

/// Destination object for `source` in the same container.
pub fn resolve_destination(
    plan_input: &SpecDestinationPlan,
    source: &SpecRemoteObject,
    ordinal: Option<usize>,
) -> SpecRemoteObject {
    let c_path = plan_input.with_index(ordinal).resolve_path(&source.path);
    SpecRemoteObject::new(source.container.clone(), &c_path)
}

/// Destination for every member of a match set, ordinals assigned by position.
pub fn resolve_destinations(
    plan_input: &SpecDestinationPlan,
    l_sources: &[SpecRemoteObject],
) -> Vec<SpecRemoteObject> {
    let n_total = l_sources.len();
    l_sources
        .iter()
        .enumerate()
        .map(|(n_idx, source)| {
            resolve_destination(plan_input, source, derive_ordinal(n_idx, n_total))
        })
        .collect()
}

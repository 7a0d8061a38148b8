//! `blobshift_io_blob` v1:
//! Blob selection, destination naming and relocation engine.
//!
//! Layout:
//! - `spec`     : enums/records/errors
//! - `path`     : object key normalization
//! - `matcher`  : exact/regex/glob selection and listing
//! - `naming`   : destination folder and file name resolution
//! - `storage`  : storage client seam plus local and in-memory backends
//! - `config`   : connection string parsing and client factory
//! - `transfer` : move/delete/download/upload orchestration
//! - `report`   : per-object events and batch report

pub mod config;
pub mod matcher;
pub mod naming;
pub mod path;
pub mod report;
pub mod spec;
pub mod storage;
pub mod transfer;
mod util;

pub use config::{EnumStorageBackend, SpecStorageConfig, open_storage};
pub use matcher::{FileMatcher, list_objects, match_objects};
pub use naming::{enumerate_file_name, resolve_destination, resolve_destinations};
pub use report::{
    EnumTransferOutcome, ReportTransfer, ReportTransferBuilder, SpecTransferEntry,
    TracingObserver, TransferObserver,
};
pub use spec::{
    BlobOpError, EnumCopyStatus, EnumMatchMode, EnumResultCode, EnumTransferKind,
    EnumTransferStatus, SpecCopyOperation, SpecDestinationPlan, SpecMatch, SpecRemoteObject,
    SpecTransferOptions, SpecTransferRequest,
};
pub use storage::{LocalStorage, MemoryStorage, StorageClient, StorageError};
pub use transfer::{
    delete_object, delete_objects, download_objects, move_object, move_objects, upload_objects,
};

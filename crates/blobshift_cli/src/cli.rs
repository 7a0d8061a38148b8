//! Command-line surface: argument model, request assembly and exit codes.

use std::path::Path;

use blobshift_io_blob::{
    BlobOpError, EnumMatchMode, EnumResultCode, ReportTransfer, SpecStorageConfig,
    SpecTransferOptions, SpecTransferRequest, TracingObserver, delete_objects, download_objects,
    move_objects, open_storage, upload_objects,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "blobshift")]
#[command(about = "Select, rename and relocate objects in blob storage", long_about = None)]
pub struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: EnumCommand,
}

#[derive(Debug, Subcommand)]
pub enum EnumCommand {
    /// Copy matching objects to the destination, then delete the sources
    Move {
        #[command(flatten)]
        source: ArgsSource,
        #[command(flatten)]
        destination: ArgsDestination,
        #[command(flatten)]
        storage: ArgsStorage,
    },
    /// Delete matching objects
    Delete {
        #[command(flatten)]
        source: ArgsSource,
        #[command(flatten)]
        storage: ArgsStorage,
    },
    /// Download matching objects below the current directory
    Download {
        #[command(flatten)]
        source: ArgsSource,
        #[command(flatten)]
        destination: ArgsDestination,
        #[command(flatten)]
        storage: ArgsStorage,
    },
    /// Upload matching local files from below the current directory
    Upload {
        #[command(flatten)]
        source: ArgsSource,
        #[command(flatten)]
        destination: ArgsDestination,
        #[command(flatten)]
        storage: ArgsStorage,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum EnumMatchTypeArg {
    ExactMatch,
    RegexMatch,
    GlobMatch,
}

impl From<EnumMatchTypeArg> for EnumMatchMode {
    fn from(value: EnumMatchTypeArg) -> Self {
        match value {
            EnumMatchTypeArg::ExactMatch => Self::ExactMatch,
            EnumMatchTypeArg::RegexMatch => Self::RegexMatch,
            EnumMatchTypeArg::GlobMatch => Self::GlobMatch,
        }
    }
}

#[derive(Debug, Args)]
pub struct ArgsSource {
    #[arg(long)]
    pub container_name: String,

    #[arg(long, value_enum, default_value_t = EnumMatchTypeArg::ExactMatch)]
    pub source_file_name_match_type: EnumMatchTypeArg,

    /// Folder of the source file, or listing prefix in pattern modes.
    #[arg(long, default_value = "")]
    pub source_folder_name: String,

    /// File name, regular expression or glob depending on the match type.
    #[arg(long)]
    pub source_file_name: String,
}

#[derive(Debug, Args)]
pub struct ArgsDestination {
    #[arg(long, default_value = "")]
    pub destination_folder_name: String,

    /// Explicit destination name; batches get `_1`, `_2`, ... suffixes.
    #[arg(long)]
    pub destination_file_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct ArgsStorage {
    /// `Backend=local;Root=<dir>` or `Backend=memory`.
    #[arg(long, env = "BLOBSHIFT_CONNECTION_STRING", hide_env_values = true)]
    pub connection_string: String,

    /// Plan and report without touching storage.
    #[arg(long)]
    pub dry_run: bool,
}

fn _request(source: &ArgsSource, destination: Option<&ArgsDestination>) -> SpecTransferRequest {
    SpecTransferRequest {
        container: source.container_name.clone(),
        source_folder: source.source_folder_name.clone(),
        source_file_name: source.source_file_name.clone(),
        rule_match: source.source_file_name_match_type.into(),
        destination_folder: destination
            .map(|d| d.destination_folder_name.clone())
            .unwrap_or_default(),
        destination_file_name: destination
            .and_then(|d| d.destination_file_name.clone())
            .filter(|name| !name.is_empty()),
    }
}

/// Execute the parsed command. Local paths resolve against `path_dir_local_root`.
pub fn run(cli: &Cli, path_dir_local_root: &Path) -> Result<ReportTransfer, BlobOpError> {
    let (source, destination, storage) = match &cli.command {
        EnumCommand::Move {
            source,
            destination,
            storage,
        }
        | EnumCommand::Download {
            source,
            destination,
            storage,
        }
        | EnumCommand::Upload {
            source,
            destination,
            storage,
        } => (source, Some(destination), storage),
        EnumCommand::Delete { source, storage } => (source, None, storage),
    };

    let spec_config = SpecStorageConfig::from_connection_string(&storage.connection_string)?;
    let client = open_storage(&spec_config)?;
    let request = _request(source, destination);
    let spec_options = SpecTransferOptions {
        if_dry_run: storage.dry_run,
    };
    debug!(?request, ?spec_options, "request assembled");

    let mut observer = TracingObserver;
    match &cli.command {
        EnumCommand::Move { .. } => {
            move_objects(client.as_ref(), &request, spec_options, &mut observer)
        }
        EnumCommand::Delete { .. } => {
            delete_objects(client.as_ref(), &request, spec_options, &mut observer)
        }
        EnumCommand::Download { .. } => download_objects(
            client.as_ref(),
            &request,
            spec_options,
            path_dir_local_root,
            &mut observer,
        ),
        EnumCommand::Upload { .. } => upload_objects(
            client.as_ref(),
            &request,
            spec_options,
            path_dir_local_root,
            &mut observer,
        ),
    }
}

/// Process exit code for each result code. Argument errors exit with 2 (clap).
pub fn exit_code(code: EnumResultCode) -> u8 {
    match code {
        EnumResultCode::IncorrectCredentials => 3,
        EnumResultCode::InvalidInput => 4,
        EnumResultCode::NoMatchesFound => 200,
        EnumResultCode::MoveFailed => 210,
        EnumResultCode::GenericDeleteFailed => 211,
        EnumResultCode::ListFailed => 212,
        EnumResultCode::DownloadFailed => 213,
        EnumResultCode::UploadFailed => 214,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs;

    use blobshift_io_blob::{EnumMatchMode, EnumResultCode};
    use clap::Parser;

    use super::{Cli, EnumCommand, EnumMatchTypeArg, _request, exit_code, run};

    fn parse(l_args: &[&str]) -> Cli {
        Cli::try_parse_from(l_args.iter().copied()).expect("parse")
    }

    #[test]
    fn move_defaults_to_exact_match() {
        let cli = parse(&[
            "blobshift",
            "move",
            "--container-name",
            "c",
            "--source-file-name",
            "a.csv",
            "--connection-string",
            "Backend=memory",
        ]);
        assert!(!cli.verbose);

        let EnumCommand::Move {
            source,
            destination,
            storage,
        } = &cli.command
        else {
            panic!("expected move");
        };
        assert_eq!(
            source.source_file_name_match_type,
            EnumMatchTypeArg::ExactMatch
        );
        assert_eq!(source.source_folder_name, "");
        assert!(!storage.dry_run);

        let request = _request(source, Some(destination));
        assert_eq!(request.rule_match, EnumMatchMode::ExactMatch);
        assert_eq!(request.destination_folder, "");
        assert_eq!(request.destination_file_name, None);
    }

    #[test]
    fn parses_pattern_flags_and_global_verbose() {
        let cli = parse(&[
            "blobshift",
            "download",
            "--container-name",
            "c",
            "--source-file-name-match-type",
            "glob_match",
            "--source-file-name",
            "*.csv",
            "--destination-file-name",
            "",
            "--connection-string",
            "Backend=memory",
            "--dry-run",
            "-v",
        ]);
        assert!(cli.verbose);

        let EnumCommand::Download {
            source,
            destination,
            storage,
        } = &cli.command
        else {
            panic!("expected download");
        };
        assert!(storage.dry_run);
        let request = _request(source, Some(destination));
        assert_eq!(request.rule_match, EnumMatchMode::GlobMatch);
        assert_eq!(request.destination_file_name, None);
    }

    #[test]
    fn rejects_unknown_match_type_and_missing_container() {
        assert!(
            Cli::try_parse_from([
                "blobshift",
                "delete",
                "--container-name",
                "c",
                "--source-file-name-match-type",
                "fuzzy",
                "--source-file-name",
                "x",
                "--connection-string",
                "Backend=memory",
            ])
            .is_err()
        );
        assert!(
            Cli::try_parse_from([
                "blobshift",
                "delete",
                "--source-file-name",
                "x",
                "--connection-string",
                "Backend=memory",
            ])
            .is_err()
        );
    }

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let l_codes = [
            EnumResultCode::NoMatchesFound,
            EnumResultCode::IncorrectCredentials,
            EnumResultCode::MoveFailed,
            EnumResultCode::GenericDeleteFailed,
            EnumResultCode::InvalidInput,
            EnumResultCode::ListFailed,
            EnumResultCode::DownloadFailed,
            EnumResultCode::UploadFailed,
        ];
        let set_exit: HashSet<u8> = l_codes.iter().map(|c| exit_code(*c)).collect();
        assert_eq!(set_exit.len(), l_codes.len());
        assert!(!set_exit.contains(&0));
        assert!(!set_exit.contains(&2));
    }

    #[test]
    fn run_moves_on_local_backend() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_dir_container = tmp.path().join("c/2023");
        fs::create_dir_all(&path_dir_container).expect("mkdir");
        fs::write(path_dir_container.join("report_a.csv"), "a").expect("write");
        fs::write(path_dir_container.join("report_b.csv"), "b").expect("write");
        fs::write(path_dir_container.join("summary.csv"), "s").expect("write");

        let c_conn = format!("Backend=local;Root={}", tmp.path().display());
        let cli = parse(&[
            "blobshift",
            "move",
            "--container-name",
            "c",
            "--source-file-name-match-type",
            "regex_match",
            "--source-folder-name",
            "2023",
            "--source-file-name",
            "report",
            "--destination-folder-name",
            "archive",
            "--destination-file-name",
            "out.csv",
            "--connection-string",
            c_conn.as_str(),
        ]);

        let report = run(&cli, tmp.path()).expect("run");
        assert_eq!(report.cnt_succeeded, 2);
        assert!(tmp.path().join("c/archive/out_1.csv").is_file());
        assert!(tmp.path().join("c/archive/out_2.csv").is_file());
        assert!(path_dir_container.join("summary.csv").is_file());
        assert!(!path_dir_container.join("report_a.csv").exists());
    }

    #[test]
    fn run_reports_no_matches_and_bad_credentials() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("c")).expect("mkdir");
        let c_conn = format!("Backend=local;Root={}", tmp.path().display());

        let cli = parse(&[
            "blobshift",
            "delete",
            "--container-name",
            "c",
            "--source-file-name-match-type",
            "regex_match",
            "--source-file-name",
            "nothing",
            "--connection-string",
            c_conn.as_str(),
        ]);
        let err = run(&cli, tmp.path()).expect_err("no matches");
        assert_eq!(err.code(), EnumResultCode::NoMatchesFound);
        assert_eq!(exit_code(err.code()), 200);

        let cli = parse(&[
            "blobshift",
            "delete",
            "--container-name",
            "c",
            "--source-file-name",
            "x",
            "--connection-string",
            "AccountName=abc",
        ]);
        let err = run(&cli, tmp.path()).expect_err("bad credentials");
        assert_eq!(err.code(), EnumResultCode::IncorrectCredentials);
    }
}

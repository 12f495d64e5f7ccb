use std::path::PathBuf;

/// Typed failure kinds for the analysis pipeline, one per row of the error
/// handling table: most are fatal and bubble out of `main`; a few are logged
/// and the caller continues (see each stage's call sites).
#[derive(Debug, thiserror::Error)]
pub enum ArchError {
    #[error("failed to scan root directory {path}: {source}")]
    ScanRootIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognized diagram node label: {0}")]
    GrammarUnknown(String),

    #[error("could not bind diagram node {0:?} to any filesystem entry")]
    Unbound(String),

    #[error("relationship references unknown variable: {0}")]
    UnknownVariable(String),

    #[error("failed to load compilation database from {path}: {reason}")]
    CompdbLoad { path: PathBuf, reason: String },

    #[error("translation unit {file} produced a diagnostic above the warning threshold: {message}")]
    TuDiagnostic { file: PathBuf, message: String },

    #[error("exception while walking cursor: {0}")]
    CursorWalk(String),

    #[error("could not resolve included file for {including_file}: {included}")]
    MissingIncludeFile {
        including_file: PathBuf,
        included: String,
    },

    #[error("edge endpoint {0} is outside the scanned tree")]
    OutsideTreeEndpoint(PathBuf),
}

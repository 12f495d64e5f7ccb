use std::path::Path;

use clang::{Clang, Index};

use crate::error::ArchError;
use crate::fs_index::FsIndex;

use super::{walker::walk_entity, CodeDep};

/// Appended to every compile command to normalize system-header resolution
/// (`spec.md` §6's "Compilation-database extensions"), verbatim from
/// `examples/original_source/lib/code.py`'s `custom_args`.
const SYSTEM_INCLUDE_ARGS: &[&str] = &[
    "-ferror-limit=0",
    "-isystem",
    "/Library/Developer/CommandLineTools/usr/lib/clang/11.0.0/include",
    "-isystem",
    "/Library/Developer/CommandLineTools/usr/include/c++/v1",
    "-isystem",
    "/Library/Developer/CommandLineTools/SDKs/MacOSX10.15.sdk/usr/include",
    "-isystem",
    "/opt/llvm/lib/clang/9.0.1/include",
];

/// Parses every compile command in `compdb_dir`'s compilation database and
/// returns the flattened list of `CodeDep`s (`spec.md` §4.E).
///
/// libclang permits only one live `Clang` instance per process — a second
/// `Clang::new()` call fails while the first is alive — so unlike the
/// teacher's `tree_sitter::Parser` (which is `Send` and fans out cleanly
/// across `rayon` via a `thread_local!` parser per worker),
/// `clang::CompileCommand`/`Index`/`Entity` are `!Send`/`!Sync` and cannot
/// cross rayon's `par_iter()` boundary at all. Parsing here is sequential:
/// one `Clang`/`Index` for the whole run, one translation unit at a time.
pub fn deps(compdb_dir: &Path, fs: &FsIndex) -> Result<Vec<CodeDep>, ArchError> {
    let database = clang::CompilationDatabase::from_directory(compdb_dir).map_err(|_| {
        ArchError::CompdbLoad {
            path: compdb_dir.to_path_buf(),
            reason: "failed to load compile_commands.json".to_string(),
        }
    })?;

    let all_commands = database.get_all_compile_commands();
    let commands = all_commands.get_commands();

    let clang = Clang::new().map_err(|reason| ArchError::CompdbLoad {
        path: compdb_dir.to_path_buf(),
        reason,
    })?;
    let index = Index::new(&clang, false, false);

    let mut deps = Vec::new();
    for command in &commands {
        deps.extend(parse_one(&index, command, fs)?);
    }

    Ok(deps)
}

fn parse_one(index: &Index, command: &clang::CompileCommand, fs: &FsIndex) -> Result<Vec<CodeDep>, ArchError> {
    let mut arguments = command.get_arguments();
    arguments.extend(SYSTEM_INCLUDE_ARGS.iter().map(|s| s.to_string()));

    let filename = command.get_filename();
    tracing::debug!(file = %filename.display(), "parsing translation unit");

    let tu = index
        .parser(&filename)
        .arguments(&arguments)
        .parse()
        .map_err(|err| ArchError::TuDiagnostic {
            file: filename.clone(),
            message: err.to_string(),
        })?;

    for diagnostic in tu.get_diagnostics() {
        if diagnostic.get_severity() == clang::diagnostic::Severity::Fatal {
            return Err(ArchError::TuDiagnostic {
                file: filename.clone(),
                message: diagnostic.get_text(),
            });
        }
    }

    Ok(walk_entity(tu.get_entity(), fs))
}

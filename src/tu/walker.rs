use clang::{Entity, EntityKind};

use crate::fs_index::FsIndex;

use super::{CodeDep, CodeNode, CodeRef};

/// Depth-first walk of one translation unit's cursor tree, returning every
/// `CodeDep` it implies (`spec.md` §4.D). This is the only function in the
/// crate that touches the `clang` crate's `Entity` directly; everything else
/// downstream operates on plain `CodeDep` values so it can be exercised in
/// tests without a libclang toolchain (`SPEC_FULL.md` §4.D's testing seam).
pub fn walk_entity(entity: Entity, fs: &FsIndex) -> Vec<CodeDep> {
    let mut deps = Vec::new();
    walk(entity, fs, &mut deps);
    deps
}

fn walk(entity: Entity, fs: &FsIndex, deps: &mut Vec<CodeDep>) {
    if is_in_system_header(&entity) {
        return;
    }

    for child in entity.get_children() {
        walk(child, fs, deps);
    }

    if !is_relevant_kind(entity.get_kind()) {
        return;
    }

    if entity.get_kind() == EntityKind::InclusionDirective {
        handle_inclusion(entity, fs, deps);
    } else if is_cross_file_reference(&entity) {
        if let Some(dep) = build_dep(entity, fs) {
            deps.push(dep);
        }
    }
}

/// The cursor-kind taxonomy from `spec.md` §4.D, keyed off named `EntityKind`
/// variants (never integer ranges) — a literal transcription of
/// `lib/code.py`'s commented-out named-constant form of `_cursor_kind_filter`.
fn is_relevant_kind(kind: EntityKind) -> bool {
    matches!(
        kind,
        EntityKind::InclusionDirective
            | EntityKind::TypeRef
            | EntityKind::MemberRef
            | EntityKind::LabelRef
            | EntityKind::OverloadedDeclRef
            | EntityKind::VariableRef
            | EntityKind::DeclRefExpr
            | EntityKind::MemberRefExpr
            | EntityKind::CallExpr
    )
}

fn is_in_system_header(entity: &Entity) -> bool {
    entity
        .get_location()
        .map(|loc| loc.is_in_system_header())
        .unwrap_or(false)
}

/// Mirrors `lib/code.py`'s `_cursor_filter`: the referenced entity must exist,
/// not live in a system header, have a known file, and differ from the
/// referencing entity's file.
fn is_cross_file_reference(entity: &Entity) -> bool {
    let Some(referenced) = entity.get_reference() else {
        return false;
    };
    if is_in_system_header(&referenced) {
        return false;
    }
    let Some(ref_file) = entity_file(&referenced) else {
        return false;
    };
    let Some(this_file) = entity_file(entity) else {
        return false;
    };
    ref_file != this_file
}

fn handle_inclusion(entity: Entity, fs: &FsIndex, deps: &mut Vec<CodeDep>) {
    let Some(included) = entity.get_file() else {
        tracing::warn!("could not resolve included file for inclusion directive");
        return;
    };
    let included_path = included.get_path();

    let Some(src_fs_id) = entity_file(&entity).and_then(|p| fs.id_by_path(&p)) else {
        return;
    };
    let Some(dst_fs_id) = fs.id_by_path(&included_path) else {
        // outside the scanned tree; not our concern per spec.md §4.D.
        return;
    };

    deps.push(CodeDep {
        src: CodeRef {
            fs_id: src_fs_id,
            node: Some(code_node(&entity)),
        },
        dst: CodeRef {
            fs_id: dst_fs_id,
            node: None,
        },
    });
}

fn build_dep(entity: Entity, fs: &FsIndex) -> Option<CodeDep> {
    let referenced = entity.get_reference()?;

    let src_path = entity_file(&entity)?;
    let dst_path = entity_file(&referenced)?;

    let src_fs_id = fs.id_by_path(&src_path)?;
    let dst_fs_id = fs.id_by_path(&dst_path)?;

    Some(CodeDep {
        src: CodeRef {
            fs_id: src_fs_id,
            node: Some(code_node(&entity)),
        },
        dst: CodeRef {
            fs_id: dst_fs_id,
            node: Some(code_node(&referenced)),
        },
    })
}

fn entity_file(entity: &Entity) -> Option<std::path::PathBuf> {
    entity
        .get_location()?
        .get_file_location()
        .file
        .map(|f| f.get_path())
}

fn code_node(entity: &Entity) -> CodeNode {
    let range = entity.get_range();
    let (start_line, start_col, end_line, end_col) = range
        .map(|r| {
            let start = r.get_start().get_file_location();
            let end = r.get_end().get_file_location();
            (start.line, start.column, end.line, end.column)
        })
        .unwrap_or((0, 0, 0, 0));

    CodeNode {
        file: entity_file(entity).unwrap_or_default(),
        start_line,
        start_col,
        end_line,
        end_col,
        kind: format!("{:?}", entity.get_kind()),
    }
}

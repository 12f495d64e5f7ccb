use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::ArchError;
use crate::fs_index::FsIndex;

use super::parser::{DiagramNode, DiagramRelationship};

/// A set of ≥2 filesystem ids bound to the same diagram node (`spec.md` §3).
/// Edges internal to a group are always permitted.
#[derive(Debug, Clone)]
pub struct FsGroup(pub Vec<u32>);

/// The bound architecture model: variable lookup, co-bound groups, and the
/// expanded set of permitted file-to-file pairs (`spec.md` §4.C's contract).
pub struct DiagramModel {
    pub var_index: HashMap<String, u32>,
    pub fs_groups: Vec<FsGroup>,
    pub allowed_rules: HashSet<(u32, u32)>,
}

const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hpp"];

/// Binds every variable-carrying node in `root` to filesystem ids, then
/// expands `relationships` and every `FsGroup` into `AllowedRule`s
/// (`spec.md` §4.C). Grounded on
/// `examples/original_source/lib/puml.py`'s `PumlParser`.
pub fn bind(
    root: &mut DiagramNode,
    relationships: &[DiagramRelationship],
    fs: &FsIndex,
    base_dir: &Path,
) -> Result<DiagramModel, ArchError> {
    let mut var_index = HashMap::new();
    let mut fs_groups = Vec::new();

    bind_node(root, base_dir, fs, &mut var_index, &mut fs_groups)?;

    let mut closures = HashMap::new();
    compute_closure(root, &mut closures);

    let mut allowed_rules = HashSet::new();

    for rel in relationships {
        let src_id = *var_index
            .get(&rel.src)
            .ok_or_else(|| ArchError::UnknownVariable(rel.src.clone()))?;
        let dst_id = *var_index
            .get(&rel.dst)
            .ok_or_else(|| ArchError::UnknownVariable(rel.dst.clone()))?;

        let src_closure = &closures[&src_id];
        let dst_closure = &closures[&dst_id];

        for &s in src_closure {
            for &d in dst_closure {
                allowed_rules.insert((s, d));
            }
        }
    }

    for group in &fs_groups {
        for &x in &group.0 {
            for &y in &group.0 {
                if x != y {
                    allowed_rules.insert((x, y));
                }
            }
        }
    }

    Ok(DiagramModel {
        var_index,
        fs_groups,
        allowed_rules,
    })
}

/// Binds `node` and recurses into its children, in preorder so each child
/// sees its parent's resolved base directory (`spec.md` §4.C step 1).
fn bind_node(
    node: &mut DiagramNode,
    base: &Path,
    fs: &FsIndex,
    var_index: &mut HashMap<String, u32>,
    fs_groups: &mut Vec<FsGroup>,
) -> Result<(), ArchError> {
    let mut child_base = base.to_path_buf();

    if let Some(name) = &node.name {
        let ids = resolve_candidates(base, name, fs);

        if node.variable.is_some() && ids.is_empty() {
            return Err(ArchError::Unbound(name.clone()));
        }

        node.fs_ids = ids;

        if let Some(variable) = &node.variable {
            var_index.insert(variable.clone(), node.id);
        }

        if node.fs_ids.len() > 1 {
            fs_groups.push(FsGroup(node.fs_ids.clone()));
        }

        if let [single] = node.fs_ids.as_slice() {
            let entry = fs.entry(*single);
            if entry.is_dir {
                child_base = entry.full_path.clone();
            }
        }
    }

    for child in &mut node.children {
        bind_node(child, &child_base, fs, var_index, fs_groups)?;
    }

    Ok(())
}

/// Probes `base/name` and `base/name.<ext>` for each recognized extension,
/// returning every candidate that resolves to a real entry in `fs`
/// (`spec.md` §4.C step 2; preserves the original's "binds both directory
/// and file" ambiguity — see `DESIGN.md`).
fn resolve_candidates(base: &Path, name: &str, fs: &FsIndex) -> Vec<u32> {
    let mut ids = Vec::new();
    let mut candidates: Vec<PathBuf> = vec![base.join(name)];
    for ext in SOURCE_EXTENSIONS {
        candidates.push(base.join(format!("{name}.{ext}")));
    }

    for candidate in candidates {
        if let Some(id) = fs.id_by_path(&candidate) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    ids
}

/// The union of `node`'s own bound ids and every descendant's bound ids
/// (`spec.md` §4.C's "descendant fs-id closure"), memoized per node id.
fn compute_closure(node: &DiagramNode, closures: &mut HashMap<u32, Vec<u32>>) -> Vec<u32> {
    let mut closure = node.fs_ids.clone();
    for child in &node.children {
        closure.extend(compute_closure(child, closures));
    }
    closures.insert(node.id, closure.clone());
    closure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::parser::{parse, NodeKind};
    use std::fs;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn binds_group_and_expands_relationship_into_allowed_rules() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("foo.h"), "");
        write(&dir.path().join("foo.cpp"), "");
        write(&dir.path().join("bar.cpp"), "");

        let config = crate::config::ArchConfig::default();
        let fs = crate::fs_index::scan(dir.path(), &config).unwrap();

        let text = r#"
            component "foo" as cfoo
            component "bar" as cbar
            cbar --> cfoo
        "#;
        let (mut root, rels) = parse(text).unwrap();
        let model = bind(&mut root, &rels, &fs, fs.full_path(fs.root)).unwrap();

        assert_eq!(model.fs_groups.len(), 1);
        assert_eq!(model.fs_groups[0].0.len(), 2);

        let foo_h = fs.id_by_path(&dir.path().join("foo.h")).unwrap();
        let foo_cpp = fs.id_by_path(&dir.path().join("foo.cpp")).unwrap();
        let bar_cpp = fs.id_by_path(&dir.path().join("bar.cpp")).unwrap();

        // FSGroup symmetry: both directions always permitted.
        assert!(model.allowed_rules.contains(&(foo_h, foo_cpp)));
        assert!(model.allowed_rules.contains(&(foo_cpp, foo_h)));

        // relationship-derived rules, both directions of the closure product.
        assert!(model.allowed_rules.contains(&(bar_cpp, foo_h)));
        assert!(model.allowed_rules.contains(&(bar_cpp, foo_cpp)));
    }

    #[test]
    fn unbound_component_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::ArchConfig::default();
        let fs = crate::fs_index::scan(dir.path(), &config).unwrap();

        let text = r#"component "ghost" as g"#;
        let (mut root, rels) = parse(text).unwrap();
        let result = bind(&mut root, &rels, &fs, fs.full_path(fs.root));
        assert!(matches!(result, Err(ArchError::Unbound(_))));
    }

    #[test]
    fn unknown_relationship_variable_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a.cpp"), "");
        let config = crate::config::ArchConfig::default();
        let fs = crate::fs_index::scan(dir.path(), &config).unwrap();

        let (mut root, _) = parse(r#"component "a" as ca"#).unwrap();
        let bogus_rel = DiagramRelationship {
            src: "ca".to_string(),
            dst: "nope".to_string(),
        };
        let result = bind(&mut root, std::slice::from_ref(&bogus_rel), &fs, fs.full_path(fs.root));
        assert!(matches!(result, Err(ArchError::UnknownVariable(_))));
        assert_eq!(root.kind, NodeKind::Root);
    }

    #[test]
    fn package_descent_binds_directory_and_children_resolve_within_it() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("lib/a.h"), "");
        write(&dir.path().join("lib/b.h"), "");
        write(&dir.path().join("m.cpp"), "");

        let config = crate::config::ArchConfig::default();
        let fs = crate::fs_index::scan(dir.path(), &config).unwrap();

        let text = r#"
            package "lib" as plib {
              component "a" as ca
              component "b" as cb
            }
            component "m" as cm
            cm --> plib
        "#;
        let (mut root, rels) = parse(text).unwrap();
        let model = bind(&mut root, &rels, &fs, fs.full_path(fs.root)).unwrap();

        let a_h = fs.id_by_path(&dir.path().join("lib/a.h")).unwrap();
        let b_h = fs.id_by_path(&dir.path().join("lib/b.h")).unwrap();
        let m_cpp = fs.id_by_path(&dir.path().join("m.cpp")).unwrap();

        assert!(model.allowed_rules.contains(&(m_cpp, a_h)));
        assert!(model.allowed_rules.contains(&(m_cpp, b_h)));
    }
}

use std::collections::HashMap;
use std::path::Path;

use crate::diagram::DiagramModel;
use crate::error::ArchError;
use crate::fs_index::FsIndex;
use crate::tu::CodeDep;

/// The result of checking observed dependencies against a `DiagramModel`
/// (`spec.md` §4.F's `violations(FSIndex, DiagramModel, deps)` contract).
///
/// Both matrices are sparse maps keyed by `(src_fs_id, dst_fs_id)` rather
/// than dense `N×N` arrays (`spec.md` §9, "Matrix sparsity"): `allowed` is a
/// `HashSet` of *permitted* pairs — the inverted sense of the original's
/// dense 0-means-permitted array, see `DESIGN.md` — and `observed`/
/// `grouped_deps` retain the full per-pair dependency lists so violations
/// can be back-expanded to concrete AST locations.
pub struct ConformanceReport {
    pub observed: HashMap<(u32, u32), usize>,
    pub grouped_deps: HashMap<(u32, u32), Vec<CodeDep>>,
    pub violations: Vec<(u32, u32)>,
}

impl ConformanceReport {
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    /// Every `CodeDep` whose `(src,dst)` pair violates the architecture —
    /// the union of `grouped_deps[(i,j)]` over violating pairs (`spec.md`
    /// §8 invariant 6).
    pub fn violating_deps(&self) -> Vec<&CodeDep> {
        self.violations
            .iter()
            .flat_map(|key| self.grouped_deps.get(key).into_iter().flatten())
            .collect()
    }
}

/// Groups `deps` by `(src.fs_id, dst.fs_id)` and computes the violation set:
/// pairs observed but not permitted by `model.allowed_rules`, excluding
/// same-file pairs (`spec.md` §4.F/§8 invariant 2 and 5).
pub fn check(model: &DiagramModel, deps: Vec<CodeDep>) -> ConformanceReport {
    let mut grouped_deps: HashMap<(u32, u32), Vec<CodeDep>> = HashMap::new();

    for dep in deps {
        let key = (dep.src.fs_id, dep.dst.fs_id);
        grouped_deps.entry(key).or_default().push(dep);
    }

    let observed: HashMap<(u32, u32), usize> = grouped_deps
        .iter()
        .map(|(key, deps)| (*key, deps.len()))
        .collect();

    let violations: Vec<(u32, u32)> = observed
        .keys()
        .filter(|&&(src, dst)| src != dst && !model.allowed_rules.contains(&(src, dst)))
        .copied()
        .collect();

    ConformanceReport {
        observed,
        grouped_deps,
        violations,
    }
}

/// Writes `violations_report.csv`: `src_path,dst_path`, no header, one line
/// per violating edge, paths absolute and canonicalized (`spec.md` §6).
pub fn write_violations_csv(
    path: &Path,
    fs: &FsIndex,
    report: &ConformanceReport,
) -> Result<(), ArchError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|err| csv_error(path, err))?;

    let mut sorted = report.violations.clone();
    sorted.sort_unstable();

    for (src, dst) in sorted {
        writer
            .write_record([
                fs.full_path(src).to_string_lossy().as_ref(),
                fs.full_path(dst).to_string_lossy().as_ref(),
            ])
            .map_err(|err| csv_error(path, err))?;
    }

    writer.flush().map_err(|source| ArchError::ScanRootIo {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `file_index.csv`: `id,full_path`, no header, one line per
/// `FSIndex` entry in id order (`spec.md` §6).
pub fn write_file_index_csv(path: &Path, fs: &FsIndex) -> Result<(), ArchError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|err| csv_error(path, err))?;

    for entry in fs.iter() {
        writer
            .write_record([entry.id.to_string(), entry.full_path.to_string_lossy().into_owned()])
            .map_err(|err| csv_error(path, err))?;
    }

    writer.flush().map_err(|source| ArchError::ScanRootIo {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_error(path: &Path, err: csv::Error) -> ArchError {
    ArchError::ScanRootIo {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, err),
    }
}

#[cfg(feature = "heatmap")]
pub fn write_heatmap(
    path: &Path,
    file_count: usize,
    report: &ConformanceReport,
) -> Result<(), ArchError> {
    let size = file_count as u32;
    let mut image = image::GrayImage::new(size.max(1), size.max(1));

    for &(src, dst) in &report.violations {
        image.put_pixel(dst, src, image::Luma([255]));
    }

    image.save(path).map_err(|err| ArchError::ScanRootIo {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tu::{CodeRef, CodeDep};
    use std::collections::HashSet as StdHashSet;

    fn dep(src: u32, dst: u32) -> CodeDep {
        CodeDep {
            src: CodeRef { fs_id: src, node: None },
            dst: CodeRef { fs_id: dst, node: None },
        }
    }

    fn model_with_allowed(pairs: &[(u32, u32)]) -> DiagramModel {
        DiagramModel {
            var_index: HashMap::new(),
            fs_groups: Vec::new(),
            allowed_rules: pairs.iter().copied().collect::<StdHashSet<_>>(),
        }
    }

    #[test]
    fn observed_without_allowed_rule_is_a_violation() {
        let model = model_with_allowed(&[]);
        let report = check(&model, vec![dep(1, 2)]);
        assert_eq!(report.violations, vec![(1, 2)]);
        assert_eq!(report.violation_count(), 1);
    }

    #[test]
    fn allowed_pair_produces_no_violation() {
        let model = model_with_allowed(&[(1, 2)]);
        let report = check(&model, vec![dep(1, 2)]);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn adding_allowed_rule_removes_exactly_that_violation() {
        let model_before = model_with_allowed(&[]);
        let deps = vec![dep(1, 2), dep(3, 4)];
        let before = check(&model_before, deps.clone());
        assert_eq!(before.violations.len(), 2);

        let model_after = model_with_allowed(&[(1, 2)]);
        let after = check(&model_after, deps);
        assert_eq!(after.violations, vec![(3, 4)]);
    }

    #[test]
    fn violating_deps_equals_union_of_grouped_deps_over_violations() {
        let model = model_with_allowed(&[]);
        let report = check(&model, vec![dep(1, 2), dep(1, 2), dep(3, 4)]);
        assert_eq!(report.violating_deps().len(), 3);
    }
}

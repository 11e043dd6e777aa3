use std::fs::{self, File};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};

use crate::layout::Layout;

/// Totals from a single materializer run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CreationReport {
    pub groups: usize,
    pub files_created: usize,
    pub files_skipped: usize,
}

/// Ensure every directory and placeholder file in `layout` exists under `root`.
///
/// Groups are processed in declaration order: the group directory is created
/// first (with any missing ancestors), then each listed file that does not
/// already exist is created empty and reported to `on_created` with its
/// root-relative path. Existing files are left untouched and produce no event.
/// The first filesystem error aborts the run; paths created before the error
/// remain on disk.
///
/// Layout paths are trusted input resolved directly beneath `root`; `..`
/// segments are not defended against.
pub fn materialize(
    layout: &Layout,
    root: &Utf8Path,
    mut on_created: impl FnMut(&Utf8Path),
) -> Result<CreationReport> {
    let mut report = CreationReport::default();

    for group in &layout.groups {
        let dir = root.join(&group.path);
        fs::create_dir_all(&dir).with_context(|| format!("creating directory {}", dir))?;

        for name in &group.files {
            let target = dir.join(name);
            if target.is_file() {
                report.files_skipped += 1;
                continue;
            }
            File::create(&target).with_context(|| format!("creating {}", target))?;
            report.files_created += 1;
            on_created(target.strip_prefix(root).unwrap_or(&target));
        }

        report.groups += 1;
    }

    Ok(report)
}

/// Layout entries absent from a root, gathered without touching the filesystem.
#[derive(Debug, Default)]
pub struct Audit {
    pub missing_dirs: Vec<Utf8PathBuf>,
    pub missing_files: Vec<Utf8PathBuf>,
}

impl Audit {
    pub fn is_complete(&self) -> bool {
        self.missing_dirs.is_empty() && self.missing_files.is_empty()
    }
}

/// Compare `root` against `layout` and collect the root-relative paths a
/// `materialize` run would still have to create. A path occupied by the wrong
/// kind of entry (a file where a directory belongs, or the reverse) counts as
/// missing.
pub fn audit(layout: &Layout, root: &Utf8Path) -> Audit {
    let mut audit = Audit::default();

    for group in &layout.groups {
        let dir = root.join(&group.path);
        if !dir.is_dir() {
            audit.missing_dirs.push(Utf8PathBuf::from(&group.path));
        }
        for name in &group.files {
            if !dir.join(name).is_file() {
                audit
                    .missing_files
                    .push(Utf8PathBuf::from(&group.path).join(name));
            }
        }
    }

    audit
}

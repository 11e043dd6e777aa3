use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use serde::Deserialize;
use toml_edit::{Array, ArrayOfTables, DocumentMut, Item, Table, Value as EditValue};

use crate::assets;

/// Declarative description of the workspace tree: an ordered list of
/// (directory path, filenames) groups, consumed top to bottom.
#[derive(Debug, Deserialize)]
pub struct Layout {
    #[serde(rename = "group", alias = "groups", default)]
    pub groups: Vec<Group>,
}

/// One directory and the placeholder files that live directly beneath it.
#[derive(Debug, Deserialize)]
pub struct Group {
    pub path: String,
    #[serde(default)]
    pub files: Vec<String>,
}

impl Layout {
    /// The embedded Research Management System layout.
    pub fn builtin() -> Result<Self> {
        let raw = assets::get_string(assets::DEFAULT_LAYOUT)?;
        let layout: Layout = toml::from_str(&raw)
            .with_context(|| format!("parsing embedded layout `{}`", assets::DEFAULT_LAYOUT))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Load a layout from a TOML or JSON file, selected by extension.
    pub fn load_from_path(path: &Utf8Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading layout {}", path))?;
        let layout: Layout = match path.extension() {
            Some("json") => {
                serde_json::from_str(&raw).with_context(|| format!("parsing layout {}", path))?
            }
            _ => toml::from_str(&raw).with_context(|| format!("parsing layout {}", path))?,
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|group| group.files.len()).sum()
    }

    /// Group paths must be relative and filenames single segments. Beyond
    /// that, paths are trusted (`..` is not rejected).
    fn validate(&self) -> Result<()> {
        for group in &self.groups {
            if group.path.is_empty() {
                bail!("layout contains a group with an empty path");
            }
            if Utf8Path::new(&group.path).is_absolute() {
                bail!("layout group `{}` must use a relative path", group.path);
            }
            for name in &group.files {
                if name.is_empty() || name.contains('/') {
                    bail!("layout group `{}` has invalid filename `{}`", group.path, name);
                }
            }
        }
        Ok(())
    }
}

pub fn format_summary(layout: &Layout) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Groups: {}", layout.groups.len());
    let _ = writeln!(out, "Files: {}", layout.file_count());

    let mut top_level: Vec<&str> = Vec::new();
    for group in &layout.groups {
        let head = group.path.split('/').next().unwrap_or(group.path.as_str());
        if !top_level.contains(&head) {
            top_level.push(head);
        }
    }
    if !top_level.is_empty() {
        let _ = writeln!(out, "Top-level directories: {}", top_level.join(", "));
    }

    out
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupUpdateMode {
    Overwrite,
    Append,
}

/// Insert or update a `[[group]]` entry in a layout file, preserving the
/// file's formatting and comments.
pub fn upsert_group(
    path: &Utf8Path,
    dir: &str,
    files: &[String],
    mode: GroupUpdateMode,
) -> Result<()> {
    if files.is_empty() {
        bail!("group file list must not be empty");
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent))?;
    }

    let mut doc: DocumentMut = if path.exists() {
        let raw = fs::read_to_string(path).with_context(|| format!("reading layout {}", path))?;
        raw.parse()
            .with_context(|| format!("parsing layout {}", path))?
    } else {
        DocumentMut::new()
    };

    if !doc.as_table().contains_key("group") {
        doc["group"] = Item::ArrayOfTables(ArrayOfTables::new());
    }

    let groups = doc
        .get_mut("group")
        .and_then(Item::as_array_of_tables_mut)
        .ok_or_else(|| anyhow::anyhow!("layout has a non-array `group` entry"))?;

    let position = groups
        .iter()
        .position(|table| table.get("path").and_then(Item::as_str) == Some(dir));

    match position {
        Some(index) => {
            let table = groups
                .get_mut(index)
                .ok_or_else(|| anyhow::anyhow!("group `{}` vanished during edit", dir))?;
            match mode {
                GroupUpdateMode::Overwrite => {
                    table.insert("files", Item::Value(EditValue::Array(files_array(files))));
                }
                GroupUpdateMode::Append => {
                    let arr = table
                        .get_mut("files")
                        .and_then(Item::as_value_mut)
                        .and_then(EditValue::as_array_mut)
                        .ok_or_else(|| {
                            anyhow::anyhow!("group `{}` has a non-array `files` entry", dir)
                        })?;
                    for file in files {
                        arr.push(EditValue::from(file.clone()));
                    }
                }
            }
        }
        None => {
            let mut table = Table::new();
            table.insert("path", toml_edit::value(dir));
            table.insert("files", Item::Value(EditValue::Array(files_array(files))));
            groups.push(table);
        }
    }

    fs::write(path, doc.to_string()).with_context(|| format!("writing layout {}", path))
}

fn files_array(files: &[String]) -> Array {
    let mut array = Array::new();
    for file in files {
        array.push(EditValue::from(file.clone()));
    }
    array
}

/// Write the embedded default layout to `path` as a starting point.
pub fn write_default(path: &Utf8Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        bail!("{} already exists; rerun with --force to overwrite", path);
    }

    let bytes = assets::get_bytes(assets::DEFAULT_LAYOUT)?;
    assets::write_to(path, &bytes)
}

use std::collections::HashSet;
use std::fs;
use std::time::SystemTime;

use anyhow::{Context, Result};
use camino::Utf8Path;

/// Rendering options for the tree report.
pub struct TreeOptions {
    pub max_depth: usize,
    pub show_hidden: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: 12,
            show_hidden: false,
        }
    }
}

fn ignored_names() -> HashSet<&'static str> {
    let mut names = HashSet::new();
    names.insert("node_modules");
    names.insert("target");
    names.insert("dist");
    names.insert("build");
    names.insert("__pycache__");
    names
}

fn should_skip(name: &str, opts: &TreeOptions, ignored: &HashSet<&str>) -> bool {
    if opts.show_hidden {
        return false;
    }
    name.starts_with('.') || ignored.contains(name)
}

fn format_timestamp(time: SystemTime) -> String {
    use std::time::UNIX_EPOCH;
    if let Ok(duration) = time.duration_since(UNIX_EPOCH) {
        let datetime = chrono::DateTime::<chrono::Utc>::from_timestamp(duration.as_secs() as i64, 0);
        if let Some(dt) = datetime {
            return dt.format("%Y-%m-%d %H:%M").to_string();
        }
    }
    "unknown".to_string()
}

fn walk_directory(
    dir: &Utf8Path,
    output: &mut String,
    depth: usize,
    opts: &TreeOptions,
    ignored: &HashSet<&str>,
) -> Result<()> {
    if depth >= opts.max_depth {
        return Ok(());
    }

    let indent = "  ".repeat(depth);

    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir))?
        .filter_map(|entry| entry.ok())
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        if should_skip(&name, opts, ignored) {
            continue;
        }

        let metadata = entry
            .metadata()
            .with_context(|| format!("reading metadata for {}", name))?;

        if metadata.is_dir() {
            output.push_str(&format!("{}{}/\n", indent, name));
            walk_directory(&dir.join(name.as_ref()), output, depth + 1, opts, ignored)?;
        } else if metadata.len() == 0 {
            output.push_str(&format!(
                "{}{} (empty, {})\n",
                indent,
                name,
                metadata
                    .modified()
                    .map(format_timestamp)
                    .unwrap_or_else(|_| "unknown".to_string())
            ));
        } else {
            output.push_str(&format!(
                "{}{} ({} bytes, {})\n",
                indent,
                name,
                metadata.len(),
                metadata
                    .modified()
                    .map(format_timestamp)
                    .unwrap_or_else(|_| "unknown".to_string())
            ));
        }
    }

    Ok(())
}

/// Render an indented listing of everything beneath `dir`. Hidden entries and
/// well-known build artifacts are skipped unless `show_hidden` is set.
pub fn render_tree(dir: &Utf8Path, opts: &TreeOptions) -> Result<String> {
    let mut output = format!("{}/\n", dir.file_name().unwrap_or("."));
    let ignored = ignored_names();
    walk_directory(dir, &mut output, 1, opts, &ignored)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn scratch_root(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn renders_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = scratch_root(&dir);
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/empty.rs"), "").unwrap();
        fs::write(root.join("notes.md"), "hello").unwrap();

        let tree = render_tree(&root, &TreeOptions::default()).unwrap();

        assert!(tree.contains("src/\n"));
        assert!(tree.contains("empty.rs (empty,"));
        assert!(tree.contains("notes.md (5 bytes,"));
    }

    #[test]
    fn hides_dotfiles_unless_asked() {
        let dir = tempfile::tempdir().unwrap();
        let root = scratch_root(&dir);
        fs::write(root.join(".gitkeep"), "").unwrap();

        let hidden = render_tree(&root, &TreeOptions::default()).unwrap();
        assert!(!hidden.contains(".gitkeep"));

        let shown = render_tree(
            &root,
            &TreeOptions {
                show_hidden: true,
                ..TreeOptions::default()
            },
        )
        .unwrap();
        assert!(shown.contains(".gitkeep"));
    }

    #[test]
    fn respects_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        let root = scratch_root(&dir);
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/deep.txt"), "x").unwrap();

        let tree = render_tree(
            &root,
            &TreeOptions {
                max_depth: 3,
                ..TreeOptions::default()
            },
        )
        .unwrap();

        assert!(tree.contains("a/\n"));
        assert!(tree.contains("b/\n"));
        assert!(!tree.contains("deep.txt"));
    }
}

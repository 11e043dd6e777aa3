use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};

use crate::cli::{Cli, Command, LayoutCommand, TreeArgs};
use crate::layout::{self, GroupUpdateMode, Layout};
use crate::materialize::{audit, materialize};
use crate::walk::{self, TreeOptions};

const LAYOUT_FILENAME: &str = "scaffold.toml";
const LAYOUT_DIR: &str = ".rms";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LayoutSource {
    Explicit,
    Discovered,
    HomeDefault,
    Builtin,
}

impl LayoutSource {
    fn as_str(&self) -> &'static str {
        match self {
            LayoutSource::Explicit => "explicit",
            LayoutSource::Discovered => "discovered",
            LayoutSource::HomeDefault => "home-default",
            LayoutSource::Builtin => "builtin",
        }
    }
}

#[derive(Clone, Debug)]
struct ResolvedLayoutPath {
    path: Option<Utf8PathBuf>,
    source: LayoutSource,
}

struct ScaffoldContext {
    chdir: Option<PathBuf>,
    file: Option<PathBuf>,
    root: Option<PathBuf>,
    dry_run: bool,
}

impl ScaffoldContext {
    fn apply_chdir(&self) -> Result<()> {
        if let Some(path) = &self.chdir {
            std::env::set_current_dir(path)
                .with_context(|| format!("changing directory to {}", path.display()))?;
        }
        Ok(())
    }

    fn resolve_root(&self) -> Result<Utf8PathBuf> {
        let cwd = std::env::current_dir().context("determining current directory")?;
        let resolved = match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => cwd.join(root),
            None => cwd,
        };
        Utf8PathBuf::from_path_buf(resolved).map_err(|_| anyhow!("root path must be valid UTF-8"))
    }

    fn resolve_layout_path(&self) -> Result<ResolvedLayoutPath> {
        if let Some(path) = &self.file {
            let path = Utf8PathBuf::from_path_buf(path.clone())
                .map_err(|_| anyhow!("layout path must be valid UTF-8"))?;
            return Ok(ResolvedLayoutPath {
                path: Some(path),
                source: LayoutSource::Explicit,
            });
        }

        if let Ok(cwd) = std::env::current_dir() {
            if let Ok(dir) = Utf8PathBuf::from_path_buf(cwd) {
                if let Some(path) = discover_layout_from(&dir) {
                    return Ok(ResolvedLayoutPath {
                        path: Some(path),
                        source: LayoutSource::Discovered,
                    });
                }
            }
        }

        if let Some(home) = dirs::home_dir() {
            let candidate = home.join(LAYOUT_DIR).join("layout.toml");
            if candidate.exists() {
                let path = Utf8PathBuf::from_path_buf(candidate)
                    .map_err(|_| anyhow!("layout path must be valid UTF-8"))?;
                return Ok(ResolvedLayoutPath {
                    path: Some(path),
                    source: LayoutSource::HomeDefault,
                });
            }
        }

        Ok(ResolvedLayoutPath {
            path: None,
            source: LayoutSource::Builtin,
        })
    }

    fn load_layout(&self) -> Result<(Layout, ResolvedLayoutPath)> {
        let resolved = self.resolve_layout_path()?;
        let layout = match &resolved.path {
            Some(path) => Layout::load_from_path(path)?,
            None => Layout::builtin()?,
        };
        tracing::debug!(source = resolved.source.as_str(), "layout resolved");
        Ok((layout, resolved))
    }

    /// Path that `layout generate`/`layout add` write to: the explicit file,
    /// the discovered one, or a fresh `scaffold.toml` in the current
    /// directory. The home default is never edited implicitly.
    fn layout_file_target(&self) -> Result<Utf8PathBuf> {
        if let Some(path) = &self.file {
            return Utf8PathBuf::from_path_buf(path.clone())
                .map_err(|_| anyhow!("layout path must be valid UTF-8"));
        }

        let cwd = std::env::current_dir().context("determining current directory")?;
        let cwd = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| anyhow!("current directory must be valid UTF-8"))?;
        if let Some(path) = discover_layout_from(&cwd) {
            return Ok(path);
        }
        Ok(cwd.join(LAYOUT_FILENAME))
    }
}

impl From<&Cli> for ScaffoldContext {
    fn from(cli: &Cli) -> Self {
        Self {
            chdir: cli.chdir.clone(),
            file: cli.file.clone(),
            root: cli.root.clone(),
            dry_run: cli.dry_run,
        }
    }
}

/// Nearest layout file at or above `start`.
fn discover_layout_from(start: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let preferred = dir.join(LAYOUT_FILENAME);
        if preferred.exists() {
            return Some(preferred);
        }

        let hidden = dir.join(LAYOUT_DIR).join("layout.toml");
        if hidden.exists() {
            return Some(hidden);
        }

        let Some(parent) = dir.parent() else {
            return None;
        };
        dir = parent.to_path_buf();
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let ctx = ScaffoldContext::from(&cli);
    ctx.apply_chdir()?;

    match cli.command.unwrap_or(Command::Create) {
        Command::Create => handle_create(&ctx),
        Command::Check => handle_check(&ctx),
        Command::Tree(args) => handle_tree(&ctx, args),
        Command::Layout { command } => handle_layout(&ctx, command),
    }
}

fn handle_create(ctx: &ScaffoldContext) -> Result<()> {
    let (layout, _) = ctx.load_layout()?;
    let root = ctx.resolve_root()?;

    if ctx.dry_run {
        let audit = audit(&layout, &root);
        for path in &audit.missing_files {
            println!("Would create: {}", path);
        }
        println!();
        println!(
            "[dry-run] {} groups declared; {} files would be created under {}",
            layout.groups.len(),
            audit.missing_files.len(),
            root
        );
        return Ok(());
    }

    let report = materialize(&layout, &root, |path| println!("Created: {}", path))?;

    println!();
    println!("[ok] Project structure created");
    println!(
        "Groups processed: {} ({} files created, {} already present)",
        report.groups, report.files_created, report.files_skipped
    );
    Ok(())
}

fn handle_check(ctx: &ScaffoldContext) -> Result<()> {
    let (layout, _) = ctx.load_layout()?;
    let root = ctx.resolve_root()?;

    println!("Checking {} against the layout...", root);
    let audit = audit(&layout, &root);

    if audit.is_complete() {
        println!(
            "[ok] All {} groups present ({} files).",
            layout.groups.len(),
            layout.file_count()
        );
        return Ok(());
    }

    if !audit.missing_dirs.is_empty() {
        println!("[error] Missing directories:");
        for path in &audit.missing_dirs {
            println!("  - {}", path);
        }
    }
    if !audit.missing_files.is_empty() {
        println!("[error] Missing files:");
        for path in &audit.missing_files {
            println!("  - {}", path);
        }
    }

    bail!("workspace does not match the layout")
}

fn handle_tree(ctx: &ScaffoldContext, args: TreeArgs) -> Result<()> {
    let root = ctx.resolve_root()?;
    if !root.is_dir() {
        bail!("{} is not a directory", root);
    }

    let options = TreeOptions {
        max_depth: args.depth,
        show_hidden: args.all,
    };
    print!("{}", walk::render_tree(&root, &options)?);
    Ok(())
}

fn handle_layout(ctx: &ScaffoldContext, command: Option<LayoutCommand>) -> Result<()> {
    match command {
        None | Some(LayoutCommand::Show) => {
            let (layout, resolved) = ctx.load_layout()?;
            match &resolved.path {
                Some(path) => println!("Layout: {} ({})", path, resolved.source.as_str()),
                None => println!("Layout: <built-in> ({})", resolved.source.as_str()),
            }
            print!("{}", layout::format_summary(&layout));
            Ok(())
        }
        Some(LayoutCommand::Path) => {
            let resolved = ctx.resolve_layout_path()?;
            match &resolved.path {
                Some(path) => println!("Layout path: {} ({})", path, resolved.source.as_str()),
                None => println!("Layout path: <built-in> ({})", resolved.source.as_str()),
            }
            Ok(())
        }
        Some(LayoutCommand::Generate { path, force }) => {
            let target = match path {
                Some(path) => Utf8PathBuf::from_path_buf(path)
                    .map_err(|_| anyhow!("layout generate path must be valid UTF-8"))?,
                None => ctx.layout_file_target()?,
            };
            layout::write_default(&target, force)?;
            if force {
                println!("Overwrote layout at {}", target);
            } else {
                println!("Wrote default layout to {}", target);
            }
            Ok(())
        }
        Some(LayoutCommand::Add {
            dir,
            files,
            force,
            append,
        }) => {
            let target = ctx.layout_file_target()?;
            let existed = group_exists(&target, &dir)?;
            if existed && !force && !append {
                bail!(
                    "group `{}` already exists in {}; rerun with --force to overwrite or --append to extend",
                    dir,
                    target
                );
            }

            let mode = if append {
                GroupUpdateMode::Append
            } else {
                GroupUpdateMode::Overwrite
            };
            layout::upsert_group(&target, &dir, &files, mode)?;
            println!("Wrote group `{}` to {}", dir, target);
            Ok(())
        }
    }
}

fn group_exists(path: &Utf8Path, dir: &str) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let raw = fs::read_to_string(path).with_context(|| format!("reading layout {}", path))?;
    let doc: toml_edit::DocumentMut = raw
        .parse()
        .with_context(|| format!("parsing layout {}", path))?;
    let Some(groups) = doc.get("group").and_then(|item| item.as_array_of_tables()) else {
        return Ok(false);
    };
    Ok(groups
        .iter()
        .any(|table| table.get("path").and_then(toml_edit::Item::as_str) == Some(dir)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn discover_finds_nearest_layout_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = scratch_root(&dir);
        let nested = root.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join(LAYOUT_FILENAME), "").unwrap();

        let found = discover_layout_from(&nested).unwrap();
        assert_eq!(found, root.join(LAYOUT_FILENAME));
    }

    #[test]
    fn discover_prefers_plain_file_over_hidden_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = scratch_root(&dir);
        fs::create_dir_all(root.join(LAYOUT_DIR)).unwrap();
        fs::write(root.join(LAYOUT_DIR).join("layout.toml"), "").unwrap();
        fs::write(root.join(LAYOUT_FILENAME), "").unwrap();

        let found = discover_layout_from(&root).unwrap();
        assert_eq!(found, root.join(LAYOUT_FILENAME));
    }

    #[test]
    fn discover_falls_back_to_hidden_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = scratch_root(&dir);
        let nested = root.join("deep");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(root.join(LAYOUT_DIR)).unwrap();
        fs::write(root.join(LAYOUT_DIR).join("layout.toml"), "").unwrap();

        let found = discover_layout_from(&nested).unwrap();
        assert_eq!(found, root.join(LAYOUT_DIR).join("layout.toml"));
    }

    #[test]
    fn resolve_root_joins_relative_paths() {
        let ctx = ScaffoldContext {
            chdir: None,
            file: None,
            root: Some(PathBuf::from("workspace")),
            dry_run: false,
        };

        let resolved = ctx.resolve_root().unwrap();
        let cwd = Utf8PathBuf::from_path_buf(std::env::current_dir().unwrap()).unwrap();
        assert_eq!(resolved, cwd.join("workspace"));
    }

    #[test]
    fn explicit_layout_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let root = scratch_root(&dir);
        let explicit = root.join("custom.toml");
        fs::write(&explicit, "").unwrap();

        let ctx = ScaffoldContext {
            chdir: None,
            file: Some(explicit.clone().into_std_path_buf()),
            root: None,
            dry_run: false,
        };

        let resolved = ctx.resolve_layout_path().unwrap();
        assert_eq!(resolved.source, LayoutSource::Explicit);
        assert_eq!(resolved.path, Some(explicit));
    }

    #[test]
    fn group_exists_reads_layout_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = scratch_root(&dir);
        let path = root.join(LAYOUT_FILENAME);
        fs::write(&path, "[[group]]\npath = \"src\"\nfiles = [\"a.rs\"]\n").unwrap();

        assert!(group_exists(&path, "src").unwrap());
        assert!(!group_exists(&path, "docs").unwrap());
        assert!(!group_exists(&root.join("absent.toml"), "src").unwrap());
    }
}

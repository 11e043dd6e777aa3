use std::fs;

use anyhow::{Context, Result, anyhow};
use camino::Utf8Path;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "layouts"]
struct Layouts;

/// Name of the embedded default layout.
pub const DEFAULT_LAYOUT: &str = "research.toml";

pub fn get_bytes(path: &str) -> Result<Vec<u8>> {
    let file = Layouts::get(path).ok_or_else(|| anyhow!("embedded layout `{}` missing", path))?;
    Ok(file.data.as_ref().to_vec())
}

pub fn get_string(path: &str) -> Result<String> {
    let bytes = get_bytes(path)?;
    std::str::from_utf8(&bytes)
        .with_context(|| format!("decoding embedded layout `{}`", path))
        .map(|value| value.to_owned())
}

pub fn write_to(destination: &Utf8Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent))?;
    }
    fs::write(destination, bytes).with_context(|| format!("writing {}", destination))
}

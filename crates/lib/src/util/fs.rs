//! Filesystem helpers shared by the packaging stages.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// A regular file found under some root, keyed by its `/`-separated relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeFile {
  pub name: String,
  pub path: PathBuf,
}

/// Relative `/`-separated name of `path` under `root`, or `None` for the root itself.
pub fn relative_name(root: &Path, path: &Path) -> Option<String> {
  let rel = path.strip_prefix(root).ok()?;
  let parts: Vec<String> = rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy().into_owned())
    .collect();
  if parts.is_empty() {
    None
  } else {
    Some(parts.join("/"))
  }
}

/// Every regular file under `root` in sorted order.
///
/// Top-level directories named in `skip_top` are not descended into.
pub fn list_files(root: &Path, skip_top: &[&str]) -> Result<Vec<RelativeFile>, walkdir::Error> {
  let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| {
    if e.depth() != 1 || !e.file_type().is_dir() {
      return true;
    }
    e.file_name()
      .to_str()
      .map(|name| !skip_top.contains(&name))
      .unwrap_or(true)
  });

  let mut files = Vec::new();
  for entry in walker {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }
    if let Some(name) = relative_name(root, entry.path()) {
      files.push(RelativeFile {
        name,
        path: entry.into_path(),
      });
    }
  }
  Ok(files)
}

/// Write `content` to `path` through a temporary sibling and a rename.
pub fn write_atomic(path: &Path, content: impl AsRef<[u8]>) -> io::Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
  temp_name.push(".tmp");
  let temp_path = path.with_file_name(temp_name);
  fs::write(&temp_path, content)?;
  fs::rename(&temp_path, path)
}

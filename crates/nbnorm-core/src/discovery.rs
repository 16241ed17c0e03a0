//! Path discovery — expand CLI arguments into notebook files
//!
//! Each argument is, in order of preference:
//! 1. a directory, walked recursively for `*.ipynb` files,
//! 2. an existing `.ipynb` file, yielded as-is,
//! 3. a glob pattern relative to the current directory.
//!
//! Problems (bad patterns, unreadable directories) are logged and skipped.

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{Error, Result};

/// File extension identifying notebooks
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// Lazily expand `paths` into notebook files
pub fn find_notebooks<'a, P>(paths: &'a [P]) -> impl Iterator<Item = PathBuf> + 'a
where
    P: AsRef<Path>,
{
    paths.iter().flat_map(|arg| expand(arg.as_ref()))
}

/// Whether `path` carries the notebook extension
pub fn is_notebook(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == NOTEBOOK_EXTENSION)
}

fn expand(arg: &Path) -> Box<dyn Iterator<Item = PathBuf>> {
    if arg.is_dir() {
        debug!(dir = %arg.display(), "walking directory");
        return Box::new(walk_dir(arg));
    }
    if arg.is_file() && is_notebook(arg) {
        return Box::new(std::iter::once(tidy(arg)));
    }

    let pattern = arg.to_string_lossy();
    match glob_notebooks(Path::new("."), &pattern) {
        Ok(found) => {
            if found.is_empty() {
                debug!(%pattern, "pattern matched no notebooks");
            }
            Box::new(found.into_iter())
        }
        Err(err) => {
            warn!("{err}");
            Box::new(std::iter::empty())
        }
    }
}

/// Every notebook file below `dir`, in file-name order per directory
fn walk_dir(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(readable)
        .filter(|entry| is_notebook(entry.path()) && entry.path().is_file())
        .map(|entry| tidy(entry.path()))
}

/// Match `pattern` against paths relative to `root`, sorted
///
/// `*` and `?` stay within one path component; `**` spans directories.
/// `.` components in the pattern are ignored, so `./*.ipynb` equals `*.ipynb`.
pub(crate) fn glob_notebooks(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = tidy_pattern(pattern);
    let matcher = compile(&pattern)?;
    let (prefix, depth) = literal_prefix(&pattern);

    let mut walker = WalkDir::new(root.join(prefix));
    if !pattern.contains("**") {
        walker = walker.max_depth(depth);
    }

    let mut found: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(readable)
        .filter(|entry| is_notebook(entry.path()) && entry.path().is_file())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            matcher.is_match(tidy(rel)).then(|| tidy(entry.path()))
        })
        .collect();
    found.sort();
    Ok(found)
}

fn readable(entry: walkdir::Result<DirEntry>) -> Option<DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(err) => {
            warn!("skipping unreadable entry: {err}");
            None
        }
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| Error::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
    Ok(glob.compile_matcher())
}

/// Pattern with its `.` components removed
fn tidy_pattern(pattern: &str) -> String {
    pattern
        .split('/')
        .filter(|part| *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Leading components of `pattern` free of glob syntax, and how many
/// components remain below them
///
/// Walking starts at the prefix instead of at the root, and without `**`
/// never needs to go deeper than the remaining component count.
fn literal_prefix(pattern: &str) -> (PathBuf, usize) {
    let mut prefix = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();
    let mut taken = 0;
    // The last component names files, never a directory to start from.
    for part in components.iter().take(components.len().saturating_sub(1)) {
        if part.contains(GLOB_META) {
            break;
        }
        prefix.push(part);
        taken += 1;
    }
    (prefix, components.len() - taken)
}

/// Drop `.` components, so `./a/./b.ipynb` reads `a/b.ipynb`
fn tidy(path: &Path) -> PathBuf {
    let tidied: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if tidied.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        tidied
    }
}

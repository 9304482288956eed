use anyhow::Result;
use ignore::WalkBuilder;
use log::{debug, trace};
use std::path::{Path, PathBuf};

use crate::constants::JS_TS_EXTENSIONS;

/// Collect entry files for a build when none were given explicitly.
///
/// Walks the project (honoring .gitignore), keeping JS/TS sources under a
/// `src/` directory. With `entry_glob`, keeps any source file whose
/// root-relative path contains the pattern instead.
pub fn collect_entries(root: &Path, entry_glob: Option<&str>) -> Result<Vec<PathBuf>> {
    debug!("Collecting entry files under {}", root.display());
    let mut entries: Vec<PathBuf> = Vec::new();

    let walker = WalkBuilder::new(root).hidden(false).ignore(true).git_ignore(true).build();
    for result in walker {
        let dirent = result?;
        let path = dirent.path();
        if !path.is_file() || !is_source_file(path) {
            continue;
        }

        let path_str = path.to_string_lossy();
        if path_str.contains("/node_modules/") {
            continue;
        }
        // Test files are not bundle entries.
        if path_str.contains(".test.") || path_str.contains(".spec.") {
            trace!("Skipping test file: {}", path_str);
            continue;
        }

        let keep = match entry_glob {
            Some(glob) => path
                .strip_prefix(root)
                .map(|rel| rel.to_string_lossy().contains(glob))
                .unwrap_or(false),
            None => path_str.contains("/src/"),
        };
        if keep {
            trace!("Collected entry: {}", path.display());
            entries.push(path.to_path_buf());
        }
    }

    entries.sort();
    debug!("Collected {} entry files", entries.len());
    Ok(entries)
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| JS_TS_EXTENSIONS.contains(&ext))
}

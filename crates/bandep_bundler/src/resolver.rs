use dashmap::DashMap;
use log::trace;
use path_clean::clean;
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::constants::{INDEX_FILES, NODE_BUILTINS, RESOLVE_EXTENSIONS};

/// Outcome of default module resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A source file to pull into the bundle and traverse.
    File(PathBuf),
    /// External to the bundle (node builtins); nothing to traverse.
    External,
    NotFound,
}

/// Default resolution for `request` imported from `from_file`: relative
/// paths with extension/index probing, node builtins, then a node_modules
/// walk-up capped at `root`. Results are memoized per (importer, request).
pub fn resolve(
    root: &Path,
    from_file: &Path,
    request: &str,
    cache: &DashMap<(PathBuf, String), Resolved>,
) -> Resolved {
    let key = (from_file.to_path_buf(), request.to_string());
    if let Some(hit) = cache.get(&key) {
        trace!("Cache hit for resolve: '{}' from {}", request, from_file.display());
        return hit.clone();
    }

    let resolved = resolve_uncached(root, from_file, request);
    trace!("Resolved '{}' from {} -> {:?}", request, from_file.display(), resolved);
    cache.insert(key, resolved.clone());
    resolved
}

fn resolve_uncached(root: &Path, from_file: &Path, request: &str) -> Resolved {
    if is_builtin(request) {
        return Resolved::External;
    }

    if request.starts_with("./") || request.starts_with("../") || request.starts_with('/') {
        let base = from_file.parent().unwrap_or(root);
        return match probe(&clean(base.join(request))) {
            Some(path) => Resolved::File(path),
            None => Resolved::NotFound,
        };
    }

    resolve_in_node_modules(root, from_file, request)
}

/// `node:`-prefixed specifiers are always builtins; bare ones are checked by
/// their package name (`fs/promises` -> `fs`).
fn is_builtin(request: &str) -> bool {
    if let Some(rest) = request.strip_prefix("node:") {
        return !rest.is_empty();
    }
    let package = request.split('/').next().unwrap_or(request);
    NODE_BUILTINS.binary_search(&package).is_ok()
}

fn resolve_in_node_modules(root: &Path, from_file: &Path, request: &str) -> Resolved {
    let mut dir = from_file.parent().unwrap_or(root);
    loop {
        let candidate = dir.join("node_modules").join(request);
        if let Some(found) = probe_package(&candidate) {
            return Resolved::File(found);
        }
        // Stop at the project root; imports must not escape it.
        if dir == root {
            break;
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }
    Resolved::NotFound
}

/// A node_modules entry: package directories resolve through package.json,
/// subpaths like `moment/locale/de.js` probe like plain files.
fn probe_package(path: &Path) -> Option<PathBuf> {
    if path.is_dir()
        && let Some(entry) = package_entry_point(path)
    {
        return Some(entry);
    }
    probe(path)
}

fn package_entry_point(package_dir: &Path) -> Option<PathBuf> {
    let manifest = package_dir.join("package.json");
    if let Ok(text) = fs::read_to_string(&manifest)
        && let Ok(json) = serde_json::from_str::<Value>(&text)
    {
        // Prefer the ESM entry over main.
        for field in ["module", "main"] {
            if let Some(rel) = json.get(field).and_then(|v| v.as_str())
                && let Some(found) = probe(&package_dir.join(rel))
            {
                return Some(found);
            }
        }
    }
    // No manifest, or nothing usable in it; index files still apply.
    None
}

/// Exact file, then extension probing, then index files for directories.
fn probe(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(canonical(path));
    }

    for ext in RESOLVE_EXTENSIONS {
        let candidate = PathBuf::from(format!("{}.{}", path.display(), ext));
        if candidate.is_file() {
            return Some(canonical(&candidate));
        }
    }

    if path.is_dir() {
        for index in INDEX_FILES {
            let candidate = path.join(index);
            if candidate.is_file() {
                return Some(canonical(&candidate));
            }
        }
    }

    None
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    fn assert_resolves_to(root: &Path, from: &Path, request: &str, expected: &Path) {
        let cache = DashMap::new();
        match resolve(root, from, request, &cache) {
            Resolved::File(path) => {
                assert_eq!(path, canonical(expected), "request '{}'", request)
            }
            other => panic!("expected '{}' to resolve to a file, got {:?}", request, other),
        }
    }

    #[test]
    fn test_relative_with_extension_probing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        let target = create_test_file(root, "src/util.ts", "");

        assert_resolves_to(root, &entry, "./util", &target);
    }

    #[test]
    fn test_relative_exact_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        let target = create_test_file(root, "src/data.js", "");

        assert_resolves_to(root, &entry, "./data.js", &target);
    }

    #[test]
    fn test_relative_directory_index() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        let target = create_test_file(root, "src/lib/index.ts", "");

        assert_resolves_to(root, &entry, "./lib", &target);
    }

    #[test]
    fn test_parent_relative_import() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        let target = create_test_file(root, "moment.js", "");

        assert_resolves_to(root, &entry, "../moment", &target);
    }

    #[test]
    fn test_node_modules_main_field() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        create_test_file(root, "node_modules/jquery/package.json", r#"{"main": "dist/jquery.js"}"#);
        let target = create_test_file(root, "node_modules/jquery/dist/jquery.js", "");

        assert_resolves_to(root, &entry, "jquery", &target);
    }

    #[test]
    fn test_node_modules_module_field_preferred() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        create_test_file(
            root,
            "node_modules/lodash/package.json",
            r#"{"main": "lodash.js", "module": "lodash.esm.js"}"#,
        );
        create_test_file(root, "node_modules/lodash/lodash.js", "");
        let esm = create_test_file(root, "node_modules/lodash/lodash.esm.js", "");

        assert_resolves_to(root, &entry, "lodash", &esm);
    }

    #[test]
    fn test_node_modules_index_without_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        let target = create_test_file(root, "node_modules/left-pad/index.js", "");

        assert_resolves_to(root, &entry, "left-pad", &target);
    }

    #[test]
    fn test_node_modules_subpath() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        create_test_file(root, "node_modules/moment/index.js", "");
        let locale = create_test_file(root, "node_modules/moment/locale/de.js", "");

        assert_resolves_to(root, &entry, "moment/locale/de.js", &locale);
    }

    #[test]
    fn test_scoped_package() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        let target = create_test_file(root, "node_modules/@acme/ui/index.js", "");

        assert_resolves_to(root, &entry, "@acme/ui", &target);
    }

    #[test]
    fn test_node_modules_walk_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "packages/app/src/index.js", "");
        let target = create_test_file(root, "node_modules/shared/index.js", "");

        assert_resolves_to(root, &entry, "shared", &target);
    }

    #[test]
    fn test_builtins_are_external() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        let cache = DashMap::new();

        assert_eq!(resolve(root, &entry, "fs", &cache), Resolved::External);
        assert_eq!(resolve(root, &entry, "fs/promises", &cache), Resolved::External);
        assert_eq!(resolve(root, &entry, "node:path", &cache), Resolved::External);
        assert_eq!(resolve(root, &entry, "node:test", &cache), Resolved::External);
    }

    #[test]
    fn test_unresolvable_request() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        let cache = DashMap::new();

        assert_eq!(resolve(root, &entry, "no-such-pkg", &cache), Resolved::NotFound);
        assert_eq!(resolve(root, &entry, "./missing", &cache), Resolved::NotFound);
    }

    #[test]
    fn test_resolution_is_memoized() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let entry = create_test_file(root, "src/index.js", "");
        let target = create_test_file(root, "src/util.js", "");
        let cache = DashMap::new();

        assert_resolves_to_cached(root, &entry, "./util", &target, &cache);
        // Deleting the file does not evict the cached answer.
        fs::remove_file(&target).unwrap();
        assert_resolves_to_cached(root, &entry, "./util", &target, &cache);
        assert_eq!(cache.len(), 1);
    }

    fn assert_resolves_to_cached(
        root: &Path,
        from: &Path,
        request: &str,
        expected: &Path,
        cache: &DashMap<(PathBuf, String), Resolved>,
    ) {
        match resolve(root, from, request, cache) {
            Resolved::File(path) => assert_eq!(path.file_name(), expected.file_name()),
            other => panic!("expected a file for '{}', got {:?}", request, other),
        }
    }
}

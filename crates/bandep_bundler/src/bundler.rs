use dashmap::{DashMap, DashSet};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use bandep_plugin::{
    BuildHost, EndHook, Plugin, Resolution, ResolveArgs, ResolveHook, SpecifierFilter,
};

use crate::parser::imports_for;
use crate::resolver::{Resolved, resolve};
use crate::types::{BuildResult, Message, Specifier};

/// Minimal bundler that drives plugins the way a real build system would:
/// resolve hooks while the module graph is walked, end hooks exactly once
/// after the walk has quiesced.
pub struct Bundler {
    root: PathBuf,
    plugins: Vec<Box<dyn Plugin>>,
}

struct RegisteredResolver {
    plugin_name: String,
    filter: SpecifierFilter,
    hook: ResolveHook,
}

/// Hook registry that plugin `setup` calls write into. `current_plugin`
/// tracks whose setup is running so every hook is attributable.
#[derive(Default)]
struct HookRegistry {
    current_plugin: String,
    resolve_hooks: Vec<RegisteredResolver>,
    end_hooks: Vec<(String, EndHook)>,
}

impl BuildHost for HookRegistry {
    fn on_resolve(&mut self, filter: SpecifierFilter, hook: ResolveHook) {
        trace!("Plugin '{}' registered a resolve hook", self.current_plugin);
        self.resolve_hooks.push(RegisteredResolver {
            plugin_name: self.current_plugin.clone(),
            filter,
            hook,
        });
    }

    fn on_end(&mut self, hook: EndHook) {
        trace!("Plugin '{}' registered an end hook", self.current_plugin);
        self.end_hooks.push((self.current_plugin.clone(), hook));
    }
}

impl Bundler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), plugins: Vec::new() }
    }

    pub fn add_plugin(&mut self, plugin: impl Plugin + 'static) {
        self.plugins.push(Box::new(plugin));
    }

    /// Walk the module graph from `entries` and produce the build outcome.
    /// All per-build state (caches, visited set, diagnostics) lives inside
    /// this call; running `build` again starts from scratch.
    pub fn build(&self, entries: &[PathBuf]) -> BuildResult {
        info!("Bundling {} entry points under {}", entries.len(), self.root.display());

        let mut registry = HookRegistry::default();
        for plugin in &self.plugins {
            registry.current_plugin = plugin.name().to_string();
            debug!("Setting up plugin '{}'", registry.current_plugin);
            plugin.setup(&mut registry);
        }
        let HookRegistry { resolve_hooks, end_hooks, .. } = registry;

        let import_cache: DashMap<PathBuf, Vec<Specifier>> = DashMap::new();
        let resolve_cache: DashMap<(PathBuf, String), Resolved> = DashMap::new();
        let visited: DashSet<PathBuf> = DashSet::new();
        // Host diagnostics, deduplicated per import site.
        let host_errors: DashMap<(PathBuf, String), Message> = DashMap::new();
        let host_warnings: DashMap<PathBuf, Message> = DashMap::new();

        let root = &self.root;
        let mut frontier: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.canonicalize().unwrap_or_else(|_| entry.clone());
            if visited.insert(entry.clone()) {
                frontier.push(entry);
            }
        }

        // Parallel breadth-first waves; resolve hooks run concurrently here.
        while !frontier.is_empty() {
            trace!("Walking wave of {} modules", frontier.len());
            let discovered: Vec<PathBuf> = frontier
                .par_iter()
                .flat_map(|file| {
                    process_module(
                        root,
                        file,
                        &resolve_hooks,
                        &import_cache,
                        &resolve_cache,
                        &host_errors,
                        &host_warnings,
                    )
                })
                .filter(|next| visited.insert(next.clone()))
                .collect();
            frontier = discovered;
        }

        let mut result = BuildResult {
            errors: sorted_messages(host_errors.into_iter().map(|(_, m)| m)),
            warnings: sorted_messages(host_warnings.into_iter().map(|(_, m)| m)),
            modules_visited: visited.len(),
        };

        // The walk has quiesced; end hooks fire exactly once, in
        // registration order, and their messages carry the plugin's name.
        for (plugin_name, hook) in end_hooks {
            debug!("Running end hook for '{}'", plugin_name);
            let partial = hook();
            result.errors.extend(partial.errors.into_iter().map(|m| Message {
                plugin_name: Some(plugin_name.clone()),
                text: m.text,
            }));
            result.warnings.extend(partial.warnings.into_iter().map(|m| Message {
                plugin_name: Some(plugin_name.clone()),
                text: m.text,
            }));
        }

        info!(
            "Build finished: {} modules, {} errors, {} warnings",
            result.modules_visited,
            result.errors.len(),
            result.warnings.len()
        );
        result
    }
}

/// Parse one module and resolve its imports, returning the files to visit
/// next.
fn process_module(
    root: &Path,
    file: &Path,
    resolve_hooks: &[RegisteredResolver],
    import_cache: &DashMap<PathBuf, Vec<Specifier>>,
    resolve_cache: &DashMap<(PathBuf, String), Resolved>,
    host_errors: &DashMap<(PathBuf, String), Message>,
    host_warnings: &DashMap<PathBuf, Message>,
) -> Vec<PathBuf> {
    trace!("Visiting module: {}", file.display());
    let specs = match imports_for(file, import_cache) {
        Ok(specs) => specs,
        Err(e) => {
            warn!("Skipping {}: {:#}", file.display(), e);
            host_warnings.entry(file.to_path_buf()).or_insert_with(|| Message {
                plugin_name: None,
                text: format!("Could not read module {}: {:#}", file.display(), e),
            });
            return Vec::new();
        }
    };

    let mut next = Vec::new();
    for spec in specs {
        let args = ResolveArgs {
            request: spec.request.clone(),
            importer: file.to_path_buf(),
            kind: spec.kind,
        };

        if let Some(resolution) = dispatch(resolve_hooks, &args) {
            if !resolution.external {
                next.push(resolution.path);
            }
            continue;
        }

        match resolve(root, file, &spec.request, resolve_cache) {
            Resolved::File(path) => next.push(path),
            Resolved::External => {}
            Resolved::NotFound => {
                trace!("Unresolved import '{}' in {}", spec.request, file.display());
                host_errors.entry((file.to_path_buf(), spec.request.clone())).or_insert_with(
                    || Message {
                        plugin_name: None,
                        text: format!(
                            "Could not resolve '{}' from {}",
                            spec.request,
                            file.display()
                        ),
                    },
                );
            }
        }
    }
    next
}

/// First hook whose filter accepts the request and that does not decline
/// wins; declines fall through to later hooks and finally to default
/// resolution.
fn dispatch(resolve_hooks: &[RegisteredResolver], args: &ResolveArgs) -> Option<Resolution> {
    for registered in resolve_hooks {
        if !registered.filter.is_match(&args.request) {
            continue;
        }
        trace!("Hook from '{}' consulted for '{}'", registered.plugin_name, args.request);
        if let Some(resolution) = (registered.hook)(args) {
            return Some(resolution);
        }
    }
    None
}

fn sorted_messages(messages: impl Iterator<Item = Message>) -> Vec<Message> {
    let mut collected: Vec<Message> = messages.collect();
    collected.sort_by(|a, b| a.text.cmp(&b.text));
    collected
}

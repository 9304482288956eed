use std::path::PathBuf;

use crate::diagnostics::OnEndResult;
use crate::rules::SpecifierFilter;

/// How an import specifier appeared in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Static,
    Dynamic,
}

/// A module-resolution request as presented to resolve hooks. Only `request`
/// participates in matching; the context fields are passed through for hooks
/// that want them.
#[derive(Debug, Clone)]
pub struct ResolveArgs {
    /// The raw specifier, exactly as written in the importing module. May be
    /// relative, bare, or scoped; never a resolved file path.
    pub request: String,
    /// The file the specifier was imported from.
    pub importer: PathBuf,
    pub kind: ImportKind,
}

/// A resolution supplied by a hook in place of the host's default resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    /// External modules are kept out of the bundle and not traversed.
    pub external: bool,
}

/// Resolve hooks may be invoked concurrently from many threads; returning
/// `None` declines the request and lets resolution continue elsewhere.
pub type ResolveHook = Box<dyn Fn(&ResolveArgs) -> Option<Resolution> + Send + Sync>;

/// End hooks run exactly once per build, after all resolution has quiesced.
pub type EndHook = Box<dyn FnOnce() -> OnEndResult + Send>;

/// The capabilities a build host offers a plugin during setup.
pub trait BuildHost {
    /// Register a resolve hook, scoped to specifiers accepted by `filter`.
    fn on_resolve(&mut self, filter: SpecifierFilter, hook: ResolveHook);

    /// Register an end-of-build hook.
    fn on_end(&mut self, hook: EndHook);
}

/// A build plugin. The host attributes everything a plugin reports to its
/// `name`.
pub trait Plugin {
    fn name(&self) -> &str;

    fn setup(&self, build: &mut dyn BuildHost);
}

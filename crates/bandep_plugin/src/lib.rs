//! Build plugin that bans dependencies from JavaScript/TypeScript bundles.
//!
//! This crate provides the plugin core, independent of any concrete bundler:
//! - Ban rules (regex pattern + optional reason) with first-match-wins lookup
//! - A combined pre-filter so hosts only invoke the plugin for specifiers
//!   that could plausibly match a rule
//! - The resolve-hook / end-hook pair that records one diagnostic per banned
//!   specifier and reports them sorted at the end of a build
//! - A minimal `BuildHost` capability interface so the plugin can be driven
//!   by any build system (or a test harness)

mod config;
mod diagnostics;
mod host;
mod plugin;
mod rules;

// Re-export public API
pub use config::{BanListFile, RuleSpec, load_ban_list};
pub use diagnostics::{OnEndResult, PartialMessage, compare_ignore_case};
pub use host::{BuildHost, EndHook, ImportKind, Plugin, Resolution, ResolveArgs, ResolveHook};
pub use plugin::{BannedDependenciesPlugin, PLUGIN_NAME};
pub use rules::{BannedDependency, RuleIndex, SpecifierFilter};

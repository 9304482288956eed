//! Reference build host for bandep plugins.
//!
//! A minimal bundler front-end for JavaScript/TypeScript projects:
//! - Extracts import specifiers from source files (oxc parser)
//! - Resolves them like a bundler would (relative paths, node builtins,
//!   node_modules)
//! - Walks the module graph from the entry points in parallel
//! - Drives plugin resolve hooks during the walk and end hooks once after it
//!
//! It exists so the banned-dependencies plugin can be exercised end-to-end;
//! it does not transpile or write output bundles.

mod bundler;
mod collector;
mod config;
mod constants;
mod parser;
mod reporter;
mod resolver;
mod types;

// Re-export public API
pub use bundler::Bundler;
pub use collector::collect_entries;
pub use config::Config;
pub use reporter::print_build_report;
pub use types::{BuildResult, Message, Specifier};

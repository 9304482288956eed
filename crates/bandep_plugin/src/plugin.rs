use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, trace};

use crate::diagnostics::{OnEndResult, PartialMessage, compare_ignore_case};
use crate::host::{BuildHost, Plugin};
use crate::rules::{BannedDependency, RuleIndex};

/// Name under which the host attributes this plugin's diagnostics.
pub const PLUGIN_NAME: &str = "banned-dependencies-plugin";

/// Plugin that raises one build error per distinct banned dependency
/// imported anywhere in the build.
///
/// The plugin never resolves anything itself: its resolve hook records a
/// diagnostic and declines, and its end hook reports the recorded
/// diagnostics sorted by specifier.
pub struct BannedDependenciesPlugin {
    rules: Arc<RuleIndex>,
}

impl BannedDependenciesPlugin {
    pub fn new(banned_dependencies: Vec<BannedDependency>) -> anyhow::Result<Self> {
        let rules = RuleIndex::new(banned_dependencies)?;
        debug!("Configured {} ban rules", rules.len());
        Ok(Self { rules: Arc::new(rules) })
    }
}

fn render_message(request: &str, reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("Dependency '{request}' is banned: {reason}"),
        None => format!("Dependency '{request}' is banned"),
    }
}

impl Plugin for BannedDependenciesPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn setup(&self, build: &mut dyn BuildHost) {
        // One message per distinct specifier, scoped to this build. First
        // write wins; later imports of the same specifier change nothing.
        let errors: Arc<DashMap<String, String>> = Arc::new(DashMap::new());

        let rules = Arc::clone(&self.rules);
        let sink = Arc::clone(&errors);
        build.on_resolve(
            self.rules.filter(),
            Box::new(move |args| {
                let Some(rule) = rules.find(&args.request) else {
                    // Reachable only when a host calls past its own filter.
                    trace!("'{}' matches no ban rule", args.request);
                    return None;
                };
                debug!(
                    "Banned dependency '{}' imported from {}",
                    args.request,
                    args.importer.display()
                );
                sink.entry(args.request.clone())
                    .or_insert_with(|| render_message(&args.request, rule.reason.as_deref()));
                // Decline: the host's default resolution proceeds.
                None
            }),
        );

        build.on_end(Box::new(move || {
            let mut entries: Vec<(String, String)> =
                errors.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect();
            entries.sort_by(|(a, _), (b, _)| compare_ignore_case(a, b));
            debug!("Reporting {} banned dependencies", entries.len());
            OnEndResult {
                errors: entries.into_iter().map(|(_, text)| PartialMessage { text }).collect(),
                warnings: Vec::new(),
            }
        }));
    }
}

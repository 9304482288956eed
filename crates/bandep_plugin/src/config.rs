use anyhow::{Context, Result};
use log::debug;
use regex::Regex;
use serde::Deserialize;
use std::{fs, path::Path};

use crate::rules::BannedDependency;

/// On-disk ban list, conventionally `bandep.json` at the project root.
///
/// ```json
/// {
///   "bannedDependencies": [
///     { "pattern": "jquery" },
///     { "pattern": "moment", "reason": "moment is deprecated" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanListFile {
    pub banned_dependencies: Vec<RuleSpec>,
}

/// One rule as written in the ban list.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    /// Regular expression matched anywhere in an import specifier.
    pub pattern: String,
    pub reason: Option<String>,
}

impl RuleSpec {
    pub fn compile(&self) -> Result<BannedDependency> {
        let pattern = Regex::new(&self.pattern)
            .with_context(|| format!("Invalid ban pattern '{}'", self.pattern))?;
        Ok(BannedDependency { pattern, reason: self.reason.clone() })
    }
}

/// Read and compile a ban list file. Rule order in the file is preserved and
/// determines first-match-wins precedence.
pub fn load_ban_list(path: &Path) -> Result<Vec<BannedDependency>> {
    debug!("Loading ban list from {}", path.display());
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ban list {}", path.display()))?;
    let file: BanListFile = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse ban list {}", path.display()))?;
    let rules: Vec<BannedDependency> =
        file.banned_dependencies.iter().map(RuleSpec::compile).collect::<Result<_>>()?;
    debug!("Loaded {} ban rules", rules.len());
    Ok(rules)
}

use bandep_plugin::ImportKind;

/// An import found in a module, as written in the source.
#[derive(Debug, Clone)]
pub struct Specifier {
    pub request: String,
    pub kind: ImportKind,
}

/// A diagnostic attributed to its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Name of the plugin that produced the message; `None` for the host's
    /// own diagnostics (e.g. resolve failures).
    pub plugin_name: Option<String>,
    pub text: String,
}

/// Outcome of one build run.
#[derive(Debug, Default)]
pub struct BuildResult {
    pub errors: Vec<Message>,
    pub warnings: Vec<Message>,
    pub modules_visited: usize,
}

impl BuildResult {
    /// A build succeeds iff nothing reported an error.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

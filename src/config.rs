use std::path::PathBuf;

/// Backend configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory receiving one assembly file per compilation unit
    pub output_dir: PathBuf,
    /// Treat referenced-but-undeclared types as opaque external types
    /// instead of rejecting the program
    pub allow_unresolved_types: bool,
    /// Emit `;` comments naming the source construct of each code block
    pub emit_comments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(crate::consts::DEFAULT_OUTPUT_DIR),
            allow_unresolved_types: false,
            emit_comments: true,
        }
    }
}

impl Config {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn allow_unresolved(mut self, allow: bool) -> Self {
        self.allow_unresolved_types = allow;
        self
    }
}

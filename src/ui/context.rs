//! UI context for detecting interactive vs CI environments

use std::io::IsTerminal;

/// UI context that determines output styling
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    /// Whether stdout is a terminal that accepts colors
    color: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            color: Self::detect_color(),
        }
    }

    /// Create a plain context (for testing or when piping output)
    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Check if output should be styled
    pub fn use_color(&self) -> bool {
        self.color
    }

    fn detect_color() -> bool {
        if !std::io::stdout().is_terminal() {
            return false;
        }

        if std::env::var_os("NO_COLOR").is_some() {
            return false;
        }

        // Build platforms capture output into logs
        let ci_vars = ["CI", "CNB_PLATFORM_API", "GITHUB_ACTIONS", "GITLAB_CI"];
        !ci_vars.iter().any(|var| std::env::var_os(var).is_some())
    }
}

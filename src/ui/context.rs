//! Terminal vs CI detection

use std::io::IsTerminal;

/// CI environment indicators, besides `CI` itself
const CI_VARS: [&str; 6] = [
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "JENKINS_URL",
    "BUILDKITE",
    "TF_BUILD",
];

/// Decides how output is rendered
#[derive(Debug, Clone)]
pub struct UiContext {
    /// Spinners and colors allowed
    interactive: bool,
    /// Running as a GitHub Actions step (log groups available)
    github_actions: bool,
    /// Skip confirmation prompts
    auto_yes: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            interactive: Self::detect_interactive(),
            github_actions: std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true"),
            auto_yes: false,
        }
    }

    /// Plain output, no prompts, no log groups
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            github_actions: false,
            auto_yes: false,
        }
    }

    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Spinners, progress bars and cliclack framing
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }

    /// Whether `::group::` workflow commands should wrap long output
    pub fn use_log_groups(&self) -> bool {
        self.github_actions && !self.interactive
    }

    fn detect_interactive() -> bool {
        if !std::io::stdout().is_terminal() || !std::io::stdin().is_terminal() {
            return false;
        }

        std::env::var("CI").is_err() && CI_VARS.iter().all(|var| std::env::var(var).is_err())
    }
}

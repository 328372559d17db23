use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z0-9_]+)\}|\$([a-zA-Z0-9_]+)").expect("static pattern compiles")
});

/// Replaces `${VAR}` and `$VAR` with values from the process environment.
///
/// Unset variables are left exactly as written.
pub fn substitute(input: &str) -> Cow<'_, str> {
    substitute_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute`] but resolves names through `lookup`.
pub fn substitute_with<F>(input: &str, lookup: F) -> Cow<'_, str>
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR.replace_all(input, |caps: &Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();

        lookup(name).unwrap_or_else(|| caps[0].to_string())
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

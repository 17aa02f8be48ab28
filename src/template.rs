// src/template.rs

//! `{{ $name }}` placeholder compilation for shell commands.
//!
//! Compilation never splices bound values into the command text. Each
//! placeholder is rewritten to a quoted POSIX parameter expansion of a
//! crate-prefixed environment variable, and the value travels to the child
//! through its environment. The shell expands the variable only after the
//! command line has been parsed, so values containing spaces, quotes or
//! metacharacters reach the program verbatim and cannot change the command
//! structure.
//!
//! Unbound placeholders still get their environment variable, set to the
//! empty string, and expand to an empty argument rather than leftover
//! template syntax.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Prefix of the environment variables carrying bound placeholder values.
pub(crate) const ENV_PREFIX: &str = "termrun_";

/// Matches `{{ $name }}` with optional inner whitespace; the capture is the
/// bare placeholder name.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*\$(\w+)\s*\}\}").unwrap());

/// Rewrite every placeholder in `line` and record the carrying environment
/// variables in `env`. Repeated placeholders with the same name collapse to
/// one environment variable, and re-running compilation over a fresh `env`
/// never accumulates duplicate keys.
pub(crate) fn compile(
    line: &str,
    bindings: &BTreeMap<String, String>,
    env: &mut BTreeMap<String, String>,
) -> String {
    PLACEHOLDER
        .replace_all(line, |caps: &Captures<'_>| {
            let name = &caps[1];
            let key = format!("{ENV_PREFIX}{name}");
            let value = bindings.get(name).cloned().unwrap_or_default();
            env.insert(key.clone(), value);
            format!("\"${{{key}}}\"")
        })
        .into_owned()
}

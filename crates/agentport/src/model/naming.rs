//! Identifier helpers shared by every generator.
//!
//! Generated Python identifiers must be ASCII, start with a letter or an
//! underscore, and stay within [`MAX_IDENTIFIER_LEN`]. Truncation appends a
//! short SHA-256 digest of the full name so re-runs produce identical output.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};

/// Upper bound for every emitted tool, type and dispatch-key identifier.
pub const MAX_IDENTIFIER_LEN: usize = 64;
/// Tool-name budget when the tool is not exposed through a gateway namespace.
pub const TOOL_NAME_BUDGET: usize = 50;
/// Budget shared by a gateway namespace and the tool names inside it.
pub const NAMESPACED_BUDGET: usize = 54;
/// Longest gateway namespace kept verbatim before it is pruned itself.
pub const MAX_NAMESPACE_LEN: usize = 24;

const DIGEST_HEX_LEN: usize = 6;

/// Lowercase, underscore-separated identifier. Runs of non-alphanumeric
/// characters collapse into one separator; a leading digit gains a `_`.
pub fn clean_variable_name(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    if joined.is_empty() {
        return "variable".to_string();
    }
    if joined.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{joined}")
    } else {
        joined
    }
}

/// CamelCase class name. Names that do not start with a letter are prefixed
/// with `Model_` before camel-casing.
pub fn clean_class_name(name: &str) -> String {
    let underscored: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let prefixed = if underscored.starts_with(|c: char| c.is_ascii_alphabetic()) {
        underscored
    } else {
        format!("Model_{underscored}")
    };
    let camel: String = prefixed.split('_').map(capitalize).collect();
    bound_identifier(&camel, MAX_IDENTIFIER_LEN)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let mut out = first.to_ascii_uppercase().to_string();
            out.push_str(&chars.as_str().to_ascii_lowercase());
            out
        }
        None => String::new(),
    }
}

/// First hex characters of the SHA-256 digest of `name`.
pub fn name_digest(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(DIGEST_HEX_LEN);
    hex
}

/// Keep `name` when it fits `budget`, otherwise cut it to `budget` characters
/// and append `_<digest>` of the untruncated name.
pub fn prune_tool_name(name: &str, budget: usize) -> String {
    if name.chars().count() <= budget {
        return name.to_string();
    }
    let head: String = name.chars().take(budget).collect();
    let pruned = format!("{head}_{}", name_digest(name));
    tracing::debug!("pruned tool name '{}' -> '{}'", name, pruned);
    pruned
}

/// Shorten `name` so the result, digest included, is at most `max` characters.
pub fn bound_identifier(name: &str, max: usize) -> String {
    let reserved = DIGEST_HEX_LEN + 1;
    if name.chars().count() <= max || max <= reserved {
        return name.to_string();
    }
    prune_tool_name(name, max - reserved)
}

/// Gateway namespaces for the action groups of one agent, unique across them.
pub fn gateway_namespaces<'a>(action_groups: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = action_groups.into_iter().map(clean_variable_name).collect();
    dedupe_names(&mut names);
    names
        .iter()
        .map(|name| prune_tool_name(name, MAX_NAMESPACE_LEN))
        .collect()
}

/// Tool-name budget left inside `namespace`.
pub fn namespaced_budget(namespace: &str) -> usize {
    NAMESPACED_BUDGET.saturating_sub(namespace.len())
}

/// Dispatch key a gateway proxy uses to route a call to its backing function.
pub fn dispatch_key(namespace: &str, tool_name: &str) -> String {
    format!("{namespace}___{tool_name}")
}

/// Append `_2`, `_3`, ... to repeated names, keeping first occurrences intact.
///
/// A suffixed name never equals another name in the list, assigned or not.
pub fn dedupe_names(names: &mut [String]) {
    let reserved: HashSet<String> = names.iter().cloned().collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    for name in names.iter_mut() {
        if taken.insert(name.clone()) {
            continue;
        }
        let counter = counters.entry(name.clone()).or_insert(1);
        let candidate = loop {
            *counter += 1;
            let candidate = format!("{name}_{counter}");
            if !reserved.contains(&candidate) && !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(candidate.clone());
        *name = candidate;
    }
}

/// Python keywords that cannot be used as field names.
pub fn is_python_keyword(word: &str) -> bool {
    matches!(
        word,
        "False"
            | "None"
            | "True"
            | "and"
            | "as"
            | "assert"
            | "async"
            | "await"
            | "break"
            | "class"
            | "continue"
            | "def"
            | "del"
            | "elif"
            | "else"
            | "except"
            | "finally"
            | "for"
            | "from"
            | "global"
            | "if"
            | "import"
            | "in"
            | "is"
            | "lambda"
            | "nonlocal"
            | "not"
            | "or"
            | "pass"
            | "raise"
            | "return"
            | "try"
            | "while"
            | "with"
            | "yield"
    )
}

/// True when `word` can be emitted verbatim as a Python identifier.
pub fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !is_python_keyword(word)
}

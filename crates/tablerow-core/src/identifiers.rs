//! Identifier helpers: table name derivation and flat primary-key strings.

use regex::Regex;
use std::sync::OnceLock;

/// Separator placed between primary-key components.
pub const KEY_SEPARATOR: char = '-';

const ESCAPE: char = '\\';

fn camel_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([a-z0-9])([A-Z])|([A-Z])([A-Z][a-z])").expect("static regex compiles")
    })
}

fn identifier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex compiles"))
}

/// Last path segment of a Rust type name, without generic arguments.
///
/// # Examples
///
/// ```
/// use tablerow_core::identifiers::short_type_name;
///
/// assert_eq!(short_type_name("game::model::PlayerScore"), "PlayerScore");
/// assert_eq!(short_type_name("Wrapper<game::Player>"), "Wrapper");
/// ```
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Convert a CamelCase type name to snake_case.
///
/// # Examples
///
/// ```
/// use tablerow_core::identifiers::snake_case;
///
/// assert_eq!(snake_case("PlayerScore"), "player_score");
/// assert_eq!(snake_case("HTTPRequest"), "http_request");
/// assert_eq!(snake_case("player"), "player");
/// ```
pub fn snake_case(name: &str) -> String {
    // Two passes so that runs like "ABc" split after each replacement.
    let once = camel_boundary().replace_all(name, "${1}${3}_${2}${4}");
    let twice = camel_boundary().replace_all(&once, "${1}${3}_${2}${4}");
    twice.to_lowercase()
}

/// Check whether `name` is a plain SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

fn escape_component(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        if c == ESCAPE || c == KEY_SEPARATOR {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Join primary-key components into one lookup string.
///
/// Components are escaped so that distinct key tuples never produce the same
/// string: `\` becomes `\\` and `-` becomes `\-`.
///
/// # Examples
///
/// ```
/// use tablerow_core::identifiers::join_primary_key;
///
/// assert_eq!(join_primary_key(["7"]), "7");
/// assert_eq!(join_primary_key(["eu", "42"]), "eu-42");
/// assert_eq!(join_primary_key(["a-b", "c"]), "a\\-b-c");
/// ```
pub fn join_primary_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push(KEY_SEPARATOR);
        }
        out.push_str(&escape_component(part.as_ref()));
    }
    out
}

/// Split a string produced by [`join_primary_key`] back into components.
pub fn split_primary_key(key: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => {
                if let Some(next) = chars.next() {
                    current.push(next);
                } else {
                    current.push(ESCAPE);
                }
            }
            KEY_SEPARATOR => parts.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    parts.push(current);
    parts
}

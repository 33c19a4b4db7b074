//! `{key}` placeholder substitution for node config strings.
//!
//! Rendering is a single left-to-right scan. `{{` and `}}` produce literal
//! braces, `{key}` is replaced only when `key` is exactly present in the
//! variable map, and unknown placeholders are kept verbatim. Substituted text
//! is never scanned again, so a value containing `{other}` stays as written.

use crate::Value;
use std::collections::HashMap;

/// Render `template`, replacing `{key}` tokens with the display form of
/// `vars[key]`.
pub fn render(template: &str, vars: &HashMap<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
        } else {
            match placeholder_at(tail) {
                Some((name, len)) => {
                    match vars.get(name) {
                        Some(value) => out.push_str(&value.to_display_string()),
                        None => out.push_str(&tail[..len]),
                    }
                    rest = &tail[len..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
    }

    out.push_str(rest);
    out
}

/// Placeholder names referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            rest = &tail[2..];
            continue;
        }
        match placeholder_at(tail) {
            Some((name, len)) => {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
                rest = &tail[len..];
            }
            None => rest = &tail[1..],
        }
    }

    names
}

/// Parse `{name}` at the start of `text`, returning the name and the token
/// length. Names may not be empty or contain braces or whitespace.
fn placeholder_at(text: &str) -> Option<(&str, usize)> {
    let body = text.strip_prefix('{')?;
    let end = body.find(['}', '{'])?;
    if !body[end..].starts_with('}') {
        return None;
    }
    let name = &body[..end];
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return None;
    }
    Some((name, end + 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn substitutes_known_keys() {
        let vars = vars(&[("name", Value::from("Ada"))]);
        assert_eq!(render("Hello {name}", &vars), "Hello Ada");
    }

    #[test]
    fn prefix_keys_do_not_collide() {
        let vars = vars(&[
            ("topic", Value::from("rust")),
            ("topic_detail", Value::from("ownership")),
        ]);
        assert_eq!(
            render("{topic_detail} of {topic}", &vars),
            "ownership of rust"
        );
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let vars = vars(&[("a", Value::from("1"))]);
        assert_eq!(render("{a} {missing}", &vars), "1 {missing}");
    }

    #[test]
    fn escaped_braces_are_literal() {
        let vars = vars(&[("name", Value::from("Ada"))]);
        assert_eq!(render("{{name}} is {name}", &vars), "{name} is Ada");
        assert_eq!(render("set {{ x }}", &vars), "set { x }");
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let vars = vars(&[
            ("a", Value::from("{b}")),
            ("b", Value::from("boom")),
        ]);
        assert_eq!(render("{a}", &vars), "{b}");
    }

    #[test]
    fn numbers_render_without_fraction() {
        let vars = vars(&[("count", Value::Number(5.0))]);
        assert_eq!(render("{count} items", &vars), "5 items");
    }

    #[test]
    fn lists_placeholders() {
        assert_eq!(
            placeholders("{a} and {b} and {a} {{c}} { d }"),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}

//! Interpolation of `${...}` expressions inside a composed tree.
//!
//! Supported forms:
//! - `${a.b.c}` / `${servers[0].host}` - absolute reference into the tree
//! - `${oc.env:VAR}` / `${oc.env:VAR,default}` - environment lookup
//!
//! A string consisting of a single expression takes the referenced value's
//! type; expressions embedded in longer strings are rendered as text.
//! `\${` produces a literal `${`.

use super::tree::{lookup, render_scalar};
use crate::error::{BuddyError, BuddyResult};
use serde_yaml::{Mapping, Value};

const ENV_RESOLVER: &str = "oc.env:";

/// Resolve every interpolation in `tree`, returning a new tree.
pub fn resolve(tree: &Value) -> BuddyResult<Value> {
    let mut resolver = Resolver {
        root: tree,
        stack: Vec::new(),
    };
    resolver.resolve_value(tree)
}

/// Piece of a string after splitting out interpolations.
#[derive(Debug, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expr(String),
}

struct Resolver<'a> {
    root: &'a Value,
    /// References currently being resolved, for cycle detection.
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn resolve_value(&mut self, value: &Value) -> BuddyResult<Value> {
        match value {
            Value::Mapping(map) => {
                let mut out = Mapping::with_capacity(map.len());
                for (key, child) in map {
                    out.insert(key.clone(), self.resolve_value(child)?);
                }
                Ok(Value::Mapping(out))
            }
            Value::Sequence(items) => items
                .iter()
                .map(|item| self.resolve_value(item))
                .collect::<BuddyResult<Vec<_>>>()
                .map(Value::Sequence),
            Value::String(s) => self.resolve_string(s),
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&mut self, s: &str) -> BuddyResult<Value> {
        if !s.contains("${") {
            return Ok(Value::String(s.to_string()));
        }
        let parts = split_parts(s)?;
        if let [Part::Expr(expr)] = parts.as_slice() {
            return self.evaluate(expr);
        }

        let mut out = String::new();
        for part in parts {
            match part {
                Part::Literal(text) => out.push_str(&text),
                Part::Expr(expr) => out.push_str(&render_scalar(&self.evaluate(&expr)?)),
            }
        }
        Ok(Value::String(out))
    }

    fn evaluate(&mut self, expr: &str) -> BuddyResult<Value> {
        // Nested expressions are resolved first, e.g. ${oc.env:X,${fallback}}
        let expr = if expr.contains("${") {
            render_scalar(&self.resolve_string(expr)?)
        } else {
            expr.to_string()
        };
        let expr = expr.trim();

        if let Some(args) = expr.strip_prefix(ENV_RESOLVER) {
            return resolve_env(expr, args);
        }
        if expr.contains(':') {
            return Err(BuddyError::interpolation(expr, "unsupported resolver"));
        }

        if self.stack.iter().any(|seen| seen == expr) {
            let chain = format!("{} -> {}", self.stack.join(" -> "), expr);
            return Err(BuddyError::interpolation(expr, "reference cycle").with_details(chain));
        }
        let root = self.root;
        let target = lookup(root, expr)
            .ok_or_else(|| BuddyError::interpolation(expr, "key not found"))?;

        self.stack.push(expr.to_string());
        let resolved = self.resolve_value(target);
        self.stack.pop();
        resolved
    }
}

fn resolve_env(expr: &str, args: &str) -> BuddyResult<Value> {
    let (name, default) = match args.split_once(',') {
        Some((name, default)) => (name.trim(), Some(default.trim())),
        None => (args.trim(), None),
    };
    if name.is_empty() {
        return Err(BuddyError::interpolation(expr, "missing variable name"));
    }
    match (std::env::var(name), default) {
        (Ok(value), _) => Ok(Value::String(value)),
        (Err(_), Some("null")) => Ok(Value::Null),
        (Err(_), Some(default)) => Ok(Value::String(unquote(default).to_string())),
        (Err(_), None) => Err(BuddyError::interpolation(
            expr,
            &format!("environment variable {} not set", name),
        )),
    }
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

fn split_parts(s: &str) -> BuddyResult<Vec<Part>> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = s;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("\\${") {
            literal.push_str("${");
            rest = after;
            continue;
        }
        if let Some(body) = rest.strip_prefix("${") {
            let end = matching_brace(body).ok_or_else(|| {
                BuddyError::interpolation(body, "unterminated interpolation")
                    .with_details(s.to_string())
            })?;
            if !literal.is_empty() {
                parts.push(Part::Literal(std::mem::take(&mut literal)));
            }
            parts.push(Part::Expr(body[..end].to_string()));
            rest = &body[end + 1..];
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            literal.push(c);
        }
        rest = chars.as_str();
    }
    if !literal.is_empty() {
        parts.push(Part::Literal(literal));
    }
    Ok(parts)
}

/// Byte offset of the `}` closing an expression body, honouring nesting.
fn matching_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_split_parts() {
        assert_eq!(
            split_parts("http://${api.host}:${api.port}/v1").unwrap(),
            vec![
                Part::Literal("http://".into()),
                Part::Expr("api.host".into()),
                Part::Literal(":".into()),
                Part::Expr("api.port".into()),
                Part::Literal("/v1".into()),
            ]
        );
        assert_eq!(
            split_parts("\\${not.this}").unwrap(),
            vec![Part::Literal("${not.this}".into())]
        );
        assert!(split_parts("${open").is_err());
    }

    #[test]
    fn test_whole_string_reference_keeps_type() {
        let tree = yaml("db: {port: 5432}\nport: ${db.port}");
        let resolved = resolve(&tree).unwrap();
        assert_eq!(resolved["port"].as_u64(), Some(5432));
    }

    #[test]
    fn test_embedded_reference_renders_text() {
        let tree = yaml("api: {host: example.com, port: 80}\nurl: 'http://${api.host}:${api.port}'");
        let resolved = resolve(&tree).unwrap();
        assert_eq!(resolved["url"].as_str(), Some("http://example.com:80"));
    }

    #[test]
    fn test_chained_references() {
        let tree = yaml("a: ${b}\nb: ${c}\nc: final");
        let resolved = resolve(&tree).unwrap();
        assert_eq!(resolved["a"].as_str(), Some("final"));
    }

    #[test]
    fn test_reference_to_mapping_is_resolved_too() {
        let tree = yaml("base: {url: '${host}/x'}\nhost: h\ncopy: ${base}");
        let resolved = resolve(&tree).unwrap();
        assert_eq!(resolved["copy"]["url"].as_str(), Some("h/x"));
    }

    #[test]
    fn test_cycle_detected() {
        let tree = yaml("a: ${b}\nb: ${a}");
        let err = resolve(&tree).unwrap_err();
        assert_eq!(err.code, ErrorCode::InterpolationFailed);
        assert!(err.details.unwrap().contains("->"));
    }

    #[test]
    fn test_missing_reference() {
        let tree = yaml("a: ${nowhere.to.be.found}");
        let err = resolve(&tree).unwrap_err();
        assert_eq!(err.code, ErrorCode::InterpolationFailed);
    }

    #[test]
    fn test_env_resolver_default() {
        let tree = yaml(
            "home: ${oc.env:HYDRA_BUDDIES_SURELY_UNSET_VAR,/tmp/fallback}\n\
             quoted: \"${oc.env:HYDRA_BUDDIES_SURELY_UNSET_VAR,'q'}\"",
        );
        let resolved = resolve(&tree).unwrap();
        assert_eq!(resolved["home"].as_str(), Some("/tmp/fallback"));
        assert_eq!(resolved["quoted"].as_str(), Some("q"));
    }

    #[test]
    fn test_env_resolver_missing_without_default() {
        let tree = yaml("x: ${oc.env:HYDRA_BUDDIES_SURELY_UNSET_VAR}");
        assert!(resolve(&tree).is_err());
    }

    #[test]
    fn test_unknown_resolver() {
        let tree = yaml("x: ${now:%Y}");
        let err = resolve(&tree).unwrap_err();
        assert!(err.message.contains("now:%Y"));
    }

    #[test]
    fn test_sequence_index_reference() {
        let tree = yaml("servers: [{host: a}, {host: b}]\nprimary: ${servers[1].host}");
        let resolved = resolve(&tree).unwrap();
        assert_eq!(resolved["primary"].as_str(), Some("b"));
    }
}

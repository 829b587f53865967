//! Object predicates: `[!]<template>=<regex>`
//!
//! The template is rendered with the object's top-level fields as context and
//! the regex is searched (not anchored) in the result. A leading `!` negates
//! the outcome. The split happens at the first `=` that is not escaped as `\=`.
//!
//! ```text
//! {{ metadata.name }}=^frontend-
//! !{{ kind }}=^(Secret|ConfigMap)$
//! {{.metadata.labels.tier}}=web
//! ```
//!
//! Fields that do not exist render as the empty string.

use minijinja::{Environment, UndefinedBehavior};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use tidemark_core::Document;

use crate::engine::environment;
use crate::error::PredicateError;

const TEMPLATE_NAME: &str = "predicate";

/// `{{.field` / `{%- .field`: Go-template style leading-dot references
static LEADING_DOT_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\{[{%]-?\s*)\.([A-Za-z_])").expect("valid regex"));

/// A parsed, immutable object filter. The default predicate matches everything.
#[derive(Clone, Default)]
pub struct Predicate {
    text: String,
    compiled: Option<Arc<Compiled>>,
}

struct Compiled {
    negate: bool,
    template: String,
    pattern: Regex,
    env: Environment<'static>,
}

impl Predicate {
    /// Parse predicate text. Empty text yields the match-everything predicate.
    pub fn parse(text: &str) -> Result<Self, PredicateError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let (negate, body) = match text.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let (template, pattern) = split_at_separator(body).ok_or_else(|| PredicateError::Syntax {
            text: text.to_string(),
            message: "expected <template>=<regex>".to_string(),
        })?;

        let pattern = Regex::new(pattern).map_err(|e| PredicateError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut env = environment(UndefinedBehavior::Chainable);
        env.add_template_owned(TEMPLATE_NAME, normalize_field_refs(&template).into_owned())
            .map_err(|e| PredicateError::InvalidTemplate {
                template: template.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            text: text.to_string(),
            compiled: Some(Arc::new(Compiled {
                negate,
                template,
                pattern,
                env,
            })),
        })
    }

    /// The text this predicate was parsed from
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True for the empty predicate
    pub fn matches_everything(&self) -> bool {
        self.compiled.is_none()
    }

    pub fn is_negated(&self) -> bool {
        self.compiled.as_ref().is_some_and(|c| c.negate)
    }

    /// Evaluate against a manifest object
    pub fn matches(&self, document: &Document) -> Result<bool, PredicateError> {
        self.matches_value(document.inner())
    }

    /// Evaluate against any JSON value used as template context
    pub fn matches_value(&self, value: &JsonValue) -> Result<bool, PredicateError> {
        let Some(compiled) = &self.compiled else {
            return Ok(true);
        };

        let rendered = compiled
            .env
            .get_template(TEMPLATE_NAME)
            .and_then(|tmpl| tmpl.render(value))
            .map_err(|e| PredicateError::Evaluation {
                template: compiled.template.clone(),
                message: e.to_string(),
            })?;

        let matched = compiled.pattern.is_match(&rendered);
        Ok(matched != compiled.negate)
    }
}

/// Split at the first unescaped `=`; `\=` in the template becomes `=`
fn split_at_separator(body: &str) -> Option<(String, &str)> {
    let mut escaped = false;

    for (index, c) in body.char_indices() {
        match c {
            '=' if !escaped => {
                let template = body[..index].replace("\\=", "=");
                return Some((template, &body[index + 1..]));
            }
            '\\' => escaped = !escaped,
            _ => escaped = false,
        }
    }

    None
}

fn normalize_field_refs(template: &str) -> Cow<'_, str> {
    LEADING_DOT_REF.replace_all(template, "${1}${2}")
}

impl FromStr for Predicate {
    type Err = PredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("text", &self.text).finish()
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(name: &str) -> Document {
        Document::from(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": name}
        }))
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        let predicate = Predicate::parse("").unwrap();
        assert!(predicate.matches_everything());
        assert!(predicate.matches(&named("anything")).unwrap());
        assert!(predicate.matches(&Document::new()).unwrap());
        assert!(Predicate::parse("   ").unwrap().matches_everything());
    }

    #[test]
    fn test_go_style_field_reference() {
        let predicate = Predicate::parse("{{.metadata.name}}=^foo").unwrap();
        assert!(predicate.matches(&named("foobar")).unwrap());
        assert!(!predicate.matches(&named("barfoo")).unwrap());
    }

    #[test]
    fn test_jinja_field_reference_is_unanchored() {
        let predicate = Predicate::parse("{{ metadata.name }}=foo").unwrap();
        assert!(predicate.matches(&named("foobar")).unwrap());
        assert!(predicate.matches(&named("barfoo")).unwrap());
        assert!(!predicate.matches(&named("bar")).unwrap());
    }

    #[test]
    fn test_negation_law() {
        let plain = Predicate::parse("{{ metadata.name }}=^foo").unwrap();
        let negated = Predicate::parse("!{{ metadata.name }}=^foo").unwrap();
        assert!(negated.is_negated());

        for name in ["foo", "foobar", "barfoo", ""] {
            let doc = named(name);
            assert_eq!(negated.matches(&doc).unwrap(), !plain.matches(&doc).unwrap());
        }
    }

    #[test]
    fn test_missing_field_renders_empty() {
        let predicate = Predicate::parse("{{ metadata.labels.app }}=^$").unwrap();
        assert!(predicate.matches(&named("x")).unwrap());

        let predicate = Predicate::parse("{{ metadata.labels.app }}=web").unwrap();
        assert!(!predicate.matches(&named("x")).unwrap());
    }

    #[test]
    fn test_repeated_evaluation_is_stable() {
        let predicate = Predicate::parse("{{ kind }}=Map$").unwrap();
        let doc = named("x");
        let first = predicate.matches(&doc).unwrap();
        for _ in 0..3 {
            assert_eq!(predicate.matches(&doc).unwrap(), first);
        }
        let cloned = predicate.clone();
        assert_eq!(cloned.matches(&doc).unwrap(), first);
    }

    #[test]
    fn test_first_unescaped_equals_splits() {
        let predicate = Predicate::parse("{{ metadata.name }}=a=b").unwrap();
        assert!(predicate.matches(&named("xa=by")).unwrap());

        let escaped = Predicate::parse(r#"{{ kind \=\= "ConfigMap" }}=true"#).unwrap();
        assert!(escaped.matches(&named("x")).unwrap());
    }

    #[test]
    fn test_split_at_separator() {
        assert_eq!(split_at_separator("a=b"), Some(("a".to_string(), "b")));
        assert_eq!(split_at_separator(r"a\=b=c"), Some(("a=b".to_string(), "c")));
        assert_eq!(split_at_separator(r"a\\=b"), Some((r"a\\".to_string(), "b")));
        assert_eq!(split_at_separator("abc"), None);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            Predicate::parse("{{ kind }}"),
            Err(PredicateError::Syntax { .. })
        ));
        assert!(matches!(
            Predicate::parse("{{ kind }}=(unclosed"),
            Err(PredicateError::InvalidPattern { .. })
        ));
        assert!(matches!(
            Predicate::parse("{{ kind =x"),
            Err(PredicateError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_evaluation_error_carries_template() {
        let predicate = Predicate::parse("{{ fail('nope') }}=x").unwrap();
        match predicate.matches(&named("x")) {
            Err(PredicateError::Evaluation { template, .. }) => {
                assert_eq!(template, "{{ fail('nope') }}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_from_str_and_display() {
        let predicate: Predicate = "!{{ kind }}=Secret".parse().unwrap();
        assert_eq!(predicate.to_string(), "!{{ kind }}=Secret");
        assert_eq!(predicate.text(), "!{{ kind }}=Secret");
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let predicate: Predicate = serde_yaml::from_str("\"{{ kind }}=^Service$\"").unwrap();
        assert!(!predicate.matches(&named("x")).unwrap());
    }
}

//! `$VAR` / `${VAR}` template substitution.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Failure to expand a template string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TemplateError {
    /// The template contains a `$` that starts no valid reference.
    #[error("Invalid template: {template:?}")]
    Invalid {
        /// The whole template being expanded.
        template: String,
    },
    /// A `${VAR:?err}` or `${VAR?err}` reference was not satisfied.
    #[error("required variable {variable} is missing a value{}", reason_suffix(.reason))]
    MissingRequired {
        /// Variable that is unset or empty.
        variable: String,
        /// Text following the `?` operator.
        reason: String,
    },
}

fn reason_suffix(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(": {reason}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    DefaultIfEmpty,
    DefaultIfUnset,
    RequiredNonEmpty,
    RequiredSet,
    AltIfNonEmpty,
    AltIfSet,
}

// Two-character forms come first so `:-` is not read as `:` plus `-`.
const OPERATORS: [(&str, Operator); 6] = [
    (":-", Operator::DefaultIfEmpty),
    (":?", Operator::RequiredNonEmpty),
    (":+", Operator::AltIfNonEmpty),
    ("-", Operator::DefaultIfUnset),
    ("?", Operator::RequiredSet),
    ("+", Operator::AltIfSet),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Dollar,
    Variable {
        name: &'a str,
        modifier: Option<(Operator, &'a str)>,
    },
}

struct Tokens<'a> {
    template: &'a str,
    rest: &'a str,
}

const fn tokens(template: &str) -> Tokens<'_> {
    Tokens {
        template,
        rest: template,
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let Some(position) = self.rest.find('$') else {
            return Some(Ok(Token::Text(std::mem::take(&mut self.rest))));
        };
        let (text, from_dollar) = self.rest.split_at(position);
        if !text.is_empty() {
            self.rest = from_dollar;
            return Some(Ok(Token::Text(text)));
        }
        let reference = self.reference(from_dollar.strip_prefix('$').unwrap_or_default());
        if reference.is_err() {
            self.rest = "";
        }
        Some(reference)
    }
}

impl<'a> Tokens<'a> {
    fn reference(&mut self, after: &'a str) -> Result<Token<'a>, TemplateError> {
        if let Some(rest) = after.strip_prefix('$') {
            self.rest = rest;
            return Ok(Token::Dollar);
        }
        if let Some(inner) = after.strip_prefix('{') {
            let close = closing_brace(inner).ok_or_else(|| self.invalid())?;
            let (body, rest) = inner.split_at(close);
            self.rest = rest.strip_prefix('}').unwrap_or(rest);
            return parse_braced(body).ok_or_else(|| self.invalid());
        }
        let length = name_length(after);
        if length == 0 {
            return Err(self.invalid());
        }
        let (name, rest) = after.split_at(length);
        self.rest = rest;
        Ok(Token::Variable { name, modifier: None })
    }

    fn invalid(&self) -> TemplateError {
        TemplateError::Invalid {
            template: self.template.to_owned(),
        }
    }
}

fn closing_brace(text: &str) -> Option<usize> {
    let mut depth = 0_usize;
    for (position, ch) in text.char_indices() {
        match ch {
            '{' => depth = depth.saturating_add(1),
            '}' if depth == 0 => return Some(position),
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

fn name_length(text: &str) -> usize {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, ch)) if ch == '_' || ch.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, ch)| !(*ch == '_' || ch.is_ascii_alphanumeric()))
        .map_or(text.len(), |(position, _)| position)
}

fn parse_braced(body: &str) -> Option<Token<'_>> {
    let length = name_length(body);
    if length == 0 {
        return None;
    }
    let (name, rest) = body.split_at(length);
    if rest.is_empty() {
        return Some(Token::Variable { name, modifier: None });
    }
    OPERATORS.iter().find_map(|(prefix, operator)| {
        rest.strip_prefix(prefix).map(|argument| Token::Variable {
            name,
            modifier: Some((*operator, argument)),
        })
    })
}

/// Expand every variable reference in `template`.
///
/// Unset variables referenced without a modifier expand to the empty
/// string and log a warning.
///
/// # Errors
///
/// Returns [`TemplateError::Invalid`] for malformed references and
/// [`TemplateError::MissingRequired`] for unsatisfied `?` references.
///
/// # Examples
///
/// ```
/// use compose_loader::interpolation::substitute;
///
/// let lookup = |name: &str| (name == "TAG").then(|| "1.2".to_owned());
/// assert_eq!(substitute("app:${TAG:-latest}", &lookup).ok().as_deref(), Some("app:1.2"));
/// assert_eq!(substitute("${MISSING-off} $$HOME", &lookup).ok().as_deref(), Some("off $HOME"));
/// ```
pub fn substitute(template: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String, TemplateError> {
    let mut expanded = String::with_capacity(template.len());
    for token in tokens(template) {
        match token? {
            Token::Text(text) => expanded.push_str(text),
            Token::Dollar => expanded.push('$'),
            Token::Variable { name, modifier } => expanded.push_str(&resolve(name, modifier, lookup)?),
        }
    }
    Ok(expanded)
}

fn resolve(
    name: &str,
    modifier: Option<(Operator, &str)>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, TemplateError> {
    let value = lookup(name);
    let Some((operator, argument)) = modifier else {
        return Ok(value.unwrap_or_else(|| {
            warn!(variable = name, "The {name} variable is not set. Defaulting to a blank string.");
            String::new()
        }));
    };
    let non_empty = value.as_deref().is_some_and(|v| !v.is_empty());
    let missing = || TemplateError::MissingRequired {
        variable: name.to_owned(),
        reason: argument.to_owned(),
    };
    match operator {
        Operator::DefaultIfEmpty if !non_empty => substitute(argument, lookup),
        Operator::DefaultIfUnset if value.is_none() => substitute(argument, lookup),
        Operator::RequiredNonEmpty if !non_empty => Err(missing()),
        Operator::RequiredSet if value.is_none() => Err(missing()),
        Operator::AltIfNonEmpty if non_empty => substitute(argument, lookup),
        Operator::AltIfSet if value.is_some() => substitute(argument, lookup),
        Operator::AltIfNonEmpty | Operator::AltIfSet => Ok(String::new()),
        _ => Ok(value.unwrap_or_default()),
    }
}

/// A variable referenced by a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    /// Variable name.
    pub name: String,
    /// Value used when the variable is unset, from `${VAR:-x}` or `${VAR-x}`.
    pub default_value: Option<String>,
    /// `true` for `${VAR:?err}` and `${VAR?err}` references.
    pub required: bool,
}

/// List the variables referenced anywhere in `value`, keyed by name.
///
/// References inside default values are included. Strings that are not
/// valid templates contribute the references found before the error.
#[must_use]
pub fn extract_variables(value: &Value) -> BTreeMap<String, Variable> {
    let mut found = BTreeMap::new();
    collect_value(value, &mut found);
    found
}

fn collect_value(value: &Value, found: &mut BTreeMap<String, Variable>) {
    match value {
        Value::String(text) => collect_template(text, found),
        Value::Array(items) => items.iter().for_each(|item| collect_value(item, found)),
        Value::Object(map) => map.values().for_each(|item| collect_value(item, found)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn collect_template(template: &str, found: &mut BTreeMap<String, Variable>) {
    for token in tokens(template).map_while(Result::ok) {
        let Token::Variable { name, modifier } = token else {
            continue;
        };
        let (default_value, required) = match modifier {
            Some((Operator::DefaultIfEmpty | Operator::DefaultIfUnset, argument)) => {
                collect_template(argument, found);
                (Some(argument.to_owned()), false)
            }
            Some((Operator::RequiredNonEmpty | Operator::RequiredSet, _)) => (None, true),
            Some((Operator::AltIfNonEmpty | Operator::AltIfSet, argument)) => {
                collect_template(argument, found);
                (None, false)
            }
            None => (None, false),
        };
        let entry = found.entry(name.to_owned()).or_insert_with(|| Variable {
            name: name.to_owned(),
            default_value: None,
            required: false,
        });
        entry.required |= required;
        if entry.default_value.is_none() {
            entry.default_value = default_value;
        }
    }
}

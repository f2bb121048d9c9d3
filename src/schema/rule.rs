//! Field rules checked against a document's storage representation.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde_json::{Map, Value};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

/// A single check applied to one field value.
#[derive(Clone)]
pub enum Constraint {
    /// Field present and not null.
    Defined,
    /// Present and not `""`, `[]` or `{}`.
    NotEmpty,
    /// String holding a syntactically valid email address.
    Email,
    /// String (chars) or array length at least `n`.
    MinLength(usize),
    /// String (chars) or array length at most `n`.
    MaxLength(usize),
    /// Number greater than or equal to the bound.
    Min(f64),
    /// Number less than or equal to the bound.
    Max(f64),
    /// String matching the pattern.
    Matches(Regex),
    /// Named predicate for anything the built-ins don't cover.
    Custom {
        name: &'static str,
        check: fn(&Value) -> bool,
    },
}

impl Constraint {
    /// Key under which a violation of this constraint is reported.
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Defined => "isDefined",
            Constraint::NotEmpty => "isNotEmpty",
            Constraint::Email => "isEmail",
            Constraint::MinLength(_) => "minLength",
            Constraint::MaxLength(_) => "maxLength",
            Constraint::Min(_) => "min",
            Constraint::Max(_) => "max",
            Constraint::Matches(_) => "matches",
            Constraint::Custom { name, .. } => *name,
        }
    }

    /// Whether `value` satisfies the constraint. `None` means the field is
    /// absent from the document.
    pub fn check(&self, value: Option<&Value>) -> bool {
        let value = match value {
            Some(Value::Null) | None => return false,
            Some(value) => value,
        };

        match self {
            Constraint::Defined => true,
            Constraint::NotEmpty => match value {
                Value::String(s) => !s.is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(fields) => !fields.is_empty(),
                _ => true,
            },
            Constraint::Email => value.as_str().is_some_and(|s| EMAIL.is_match(s)),
            Constraint::MinLength(min) => length(value).is_some_and(|len| len >= *min),
            Constraint::MaxLength(max) => length(value).is_some_and(|len| len <= *max),
            Constraint::Min(min) => value.as_f64().is_some_and(|n| n >= *min),
            Constraint::Max(max) => value.as_f64().is_some_and(|n| n <= *max),
            Constraint::Matches(pattern) => value.as_str().is_some_and(|s| pattern.is_match(s)),
            Constraint::Custom { check, .. } => check(value),
        }
    }

    fn default_message(&self, property: &str) -> String {
        match self {
            Constraint::Defined => format!("{} should not be null or undefined", property),
            Constraint::NotEmpty => format!("{} should not be empty", property),
            Constraint::Email => format!("{} must be an email", property),
            Constraint::MinLength(min) => {
                format!("{} must be longer than or equal to {} characters", property, min)
            }
            Constraint::MaxLength(max) => {
                format!("{} must be shorter than or equal to {} characters", property, max)
            }
            Constraint::Min(min) => format!("{} must not be less than {}", property, min),
            Constraint::Max(max) => format!("{} must not be greater than {}", property, max),
            Constraint::Matches(pattern) => {
                format!("{} must match {} regular expression", property, pattern.as_str())
            }
            Constraint::Custom { name, .. } => format!("{} failed {}", property, name),
        }
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::MinLength(n) => write!(f, "MinLength({})", n),
            Constraint::MaxLength(n) => write!(f, "MaxLength({})", n),
            Constraint::Min(n) => write!(f, "Min({})", n),
            Constraint::Max(n) => write!(f, "Max({})", n),
            Constraint::Matches(pattern) => write!(f, "Matches({:?})", pattern.as_str()),
            other => f.write_str(other.name()),
        }
    }
}

/// A constraint bound to one top-level field of a collection's documents.
///
/// ```ignore
/// FieldRule::new("contactEmail", Constraint::Email)
///     .optional()
///     .with_message("Invalid email!")
/// ```
#[derive(Debug, Clone)]
pub struct FieldRule {
    property: String,
    constraint: Constraint,
    message: Option<String>,
    optional: bool,
}

impl FieldRule {
    pub fn new(property: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            property: property.into(),
            constraint,
            message: None,
            optional: false,
        }
    }

    /// Replace the generated message reported on violation.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Skip the rule when the field is absent or null.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// Message reported when the rule fails.
    pub fn message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.constraint.default_message(&self.property))
    }

    /// Check the rule against a document; `false` means violated.
    pub fn check(&self, data: &Map<String, Value>) -> bool {
        let value = data.get(&self.property);
        if self.optional && matches!(value, None | Some(Value::Null)) {
            return true;
        }
        self.constraint.check(value)
    }
}

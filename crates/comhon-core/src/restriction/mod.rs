//! Value restrictions
//!
//! Restrictions are attached to scalar properties, to arrays and to array
//! elements. A restriction is checked against a [`Subject`]: either a value
//! or the element count of an array, optionally shifted by an increment so
//! that a push or removal can be checked before it happens.

pub mod interval;
pub mod pattern;

pub use interval::{Interval, IntervalDomain, IntervalValue};
pub use pattern::PatternCache;

use crate::errors::{ComhonError, Result};
use crate::model::{ModelType, SimpleKind};
use crate::value::Value;
use std::fmt;

/// What a restriction is evaluated against
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// A scalar value
    Value(&'a Value),
    /// Number of elements of an array
    Count(usize),
}

/// Compiled regular expression restriction
#[derive(Debug, Clone)]
pub struct RegexRestriction {
    name: Option<String>,
    regex: regex::Regex,
}

impl RegexRestriction {
    /// Compile `pattern`. `name` is the pattern registry key when the
    /// expression was declared by name.
    pub fn new(name: Option<String>, pattern: &str) -> Result<Self> {
        let regex =
            regex::Regex::new(pattern).map_err(|e| ComhonError::InvalidRestriction {
                restriction: format!("regex {}", pattern),
                reason: e.to_string(),
            })?;
        Ok(Self { name, regex })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

#[derive(Debug, Clone)]
pub enum Restriction {
    Enum(Vec<Value>),
    Interval(Interval),
    Length(Interval),
    Size(Interval),
    Regex(RegexRestriction),
    NotNull,
    NotEmptyString,
    NotEmptyArray,
}

impl Restriction {
    /// Whether the subject satisfies the restriction.
    ///
    /// Null values only fail [`Restriction::NotNull`].
    pub fn satisfy(&self, subject: Subject<'_>, increment: i64) -> bool {
        match (self, subject) {
            (Restriction::NotNull, Subject::Value(v)) => !v.is_null(),
            (Restriction::NotNull, Subject::Count(_)) => true,
            (_, Subject::Value(Value::Null)) => true,
            (Restriction::Enum(values), Subject::Value(v)) => values.contains(v),
            (Restriction::Interval(interval), Subject::Value(v)) => match interval_value(v) {
                Some(iv) => interval.contains(&iv),
                None => false,
            },
            (Restriction::Length(interval), Subject::Value(Value::String(s))) => {
                interval.contains_count(s.chars().count() as i64 + increment)
            }
            (Restriction::Regex(re), Subject::Value(Value::String(s))) => re.regex.is_match(s),
            (Restriction::NotEmptyString, Subject::Value(Value::String(s))) => !s.is_empty(),
            (Restriction::Size(interval), Subject::Count(n)) => {
                interval.contains_count(n as i64 + increment)
            }
            (Restriction::NotEmptyArray, Subject::Count(n)) => n as i64 + increment > 0,
            _ => false,
        }
    }

    /// Structural equality of kind and parameters
    pub fn is_equal(&self, other: &Restriction) -> bool {
        match (self, other) {
            (Restriction::Enum(a), Restriction::Enum(b)) => {
                a.len() == b.len() && a.iter().all(|v| b.contains(v))
            }
            (Restriction::Interval(a), Restriction::Interval(b))
            | (Restriction::Length(a), Restriction::Length(b))
            | (Restriction::Size(a), Restriction::Size(b)) => a == b,
            (Restriction::Regex(a), Restriction::Regex(b)) => a.pattern() == b.pattern(),
            (Restriction::NotNull, Restriction::NotNull)
            | (Restriction::NotEmptyString, Restriction::NotEmptyString)
            | (Restriction::NotEmptyArray, Restriction::NotEmptyArray) => true,
            _ => false,
        }
    }

    /// Whether the restriction may be declared on values of `model`
    pub fn is_allowed_model(&self, model: &ModelType) -> bool {
        match self {
            Restriction::NotNull => true,
            Restriction::Size(_) | Restriction::NotEmptyArray => {
                matches!(model.without_foreign(), ModelType::Array(_))
            }
            Restriction::Enum(_) => matches!(
                model,
                ModelType::Simple(
                    SimpleKind::String
                        | SimpleKind::Integer
                        | SimpleKind::Index
                        | SimpleKind::Float
                        | SimpleKind::Percentage
                )
            ),
            Restriction::Interval(interval) => match model {
                ModelType::Simple(kind) => kind.interval_domain() == Some(interval.domain()),
                _ => false,
            },
            Restriction::Length(_) | Restriction::Regex(_) | Restriction::NotEmptyString => {
                matches!(model, ModelType::Simple(SimpleKind::String))
            }
        }
    }

    /// Human readable explanation of why `subject` fails the restriction
    pub fn describe(&self, subject: Subject<'_>, increment: i64) -> String {
        let shown = match subject {
            Subject::Value(v) => v.to_string(),
            Subject::Count(n) => format!("{} element(s)", n as i64 + increment),
        };
        match self {
            Restriction::NotNull => "value must not be null".to_string(),
            Restriction::Enum(values) => format!(
                "{} is not in enumeration [{}]",
                shown,
                values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Restriction::Interval(i) => format!("{} is not in interval {}", shown, i),
            Restriction::Length(i) => match subject {
                Subject::Value(Value::String(s)) => format!(
                    "length {} of {} is not in interval {}",
                    s.chars().count() as i64 + increment,
                    s,
                    i
                ),
                _ => format!("{} has no length", shown),
            },
            Restriction::Size(i) => format!("size of {} is not in interval {}", shown, i),
            Restriction::Regex(re) => format!("{} does not match {}", shown, re.pattern()),
            Restriction::NotEmptyString => "string must not be empty".to_string(),
            Restriction::NotEmptyArray => "array must not be empty".to_string(),
        }
    }
}

impl PartialEq for Restriction {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Restriction::Enum(values) => write!(
                f,
                "enum [{}]",
                values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Restriction::Interval(i) => write!(f, "interval {}", i),
            Restriction::Length(i) => write!(f, "length {}", i),
            Restriction::Size(i) => write!(f, "size {}", i),
            Restriction::Regex(re) => match re.name() {
                Some(name) => write!(f, "pattern {}", name),
                None => write!(f, "regex {}", re.pattern()),
            },
            Restriction::NotNull => write!(f, "not null"),
            Restriction::NotEmptyString => write!(f, "not empty string"),
            Restriction::NotEmptyArray => write!(f, "not empty array"),
        }
    }
}

fn interval_value(value: &Value) -> Option<IntervalValue> {
    match value {
        Value::Integer(i) => Some(IntervalValue::Integer(*i)),
        Value::Index(i) => Some(match i64::try_from(*i) {
            Ok(i) => IntervalValue::Integer(i),
            Err(_) => IntervalValue::Float(*i as f64),
        }),
        Value::Float(f) | Value::Percentage(f) => Some(IntervalValue::Float(*f)),
        Value::DateTime(d) => Some(IntervalValue::DateTime(*d)),
        _ => None,
    }
}

/// First restriction of `restrictions` not satisfied by `subject`
pub fn first_not_satisfied<'r>(
    restrictions: &'r [Restriction],
    subject: Subject<'_>,
    increment: i64,
) -> Option<&'r Restriction> {
    restrictions.iter().find(|r| !r.satisfy(subject, increment))
}

/// Error reporting that `subject` fails `restriction`
pub fn violation(restriction: &Restriction, subject: Subject<'_>, increment: i64) -> ComhonError {
    let value = match subject {
        Subject::Value(v) => v.to_string(),
        Subject::Count(n) => format!("{} element(s)", n as i64 + increment),
    };
    ComhonError::ValueValidation {
        restriction: restriction.clone(),
        value,
        message: restriction.describe(subject, increment),
    }
}

/// Check `subject` against every restriction
///
/// # Errors
///
/// Returns `ValueValidation` for the first restriction not satisfied.
pub fn check(restrictions: &[Restriction], subject: Subject<'_>, increment: i64) -> Result<()> {
    match first_not_satisfied(restrictions, subject, increment) {
        Some(failed) => Err(violation(failed, subject, increment)),
        None => Ok(()),
    }
}

/// Set equality of two restriction lists
pub fn compare(a: &[Restriction], b: &[Restriction]) -> bool {
    a.len() == b.len()
        && a.iter().all(|r| b.iter().any(|o| r.is_equal(o)))
        && b.iter().all(|r| a.iter().any(|o| r.is_equal(o)))
}

//! Interval notation used by interval, length and size restrictions
//!
//! An interval reads `[min,max]`. A bracket facing outwards (`]min,` or
//! `,max[`) excludes the bound, an empty side leaves it open.

use crate::errors::{ComhonError, Result};
use chrono::{DateTime, FixedOffset};
use std::cmp::Ordering;
use std::fmt;

/// Domain of the interval bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalDomain {
    Integer,
    Float,
    DateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntervalValue {
    Integer(i64),
    Float(f64),
    DateTime(DateTime<FixedOffset>),
}

impl IntervalValue {
    fn partial_cmp_to(&self, other: &IntervalValue) -> Option<Ordering> {
        match (self, other) {
            (IntervalValue::Integer(a), IntervalValue::Integer(b)) => Some(a.cmp(b)),
            (IntervalValue::DateTime(a), IntervalValue::DateTime(b)) => Some(a.cmp(b)),
            (IntervalValue::Integer(a), IntervalValue::Float(b)) => (*a as f64).partial_cmp(b),
            (IntervalValue::Float(a), IntervalValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (IntervalValue::Float(a), IntervalValue::Float(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    value: IntervalValue,
    inclusive: bool,
}

/// Parsed interval with optional bounds
#[derive(Debug, Clone)]
pub struct Interval {
    raw: String,
    domain: IntervalDomain,
    left: Option<Bound>,
    right: Option<Bound>,
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.left == other.left && self.right == other.right
    }
}

impl Interval {
    /// Parse an interval whose bounds belong to `domain`
    pub fn parse(raw: &str, domain: IntervalDomain) -> Result<Self> {
        let invalid = |reason: &str| ComhonError::InvalidRestriction {
            restriction: format!("interval {}", raw),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        let first = chars.next().ok_or_else(|| invalid("empty interval"))?;
        let last = chars.next_back().ok_or_else(|| invalid("too short"))?;
        let left_inclusive = match first {
            '[' => true,
            ']' => false,
            _ => return Err(invalid("must start with '[' or ']'")),
        };
        let right_inclusive = match last {
            ']' => true,
            '[' => false,
            _ => return Err(invalid("must end with ']' or '['")),
        };

        let body = chars.as_str();
        let (left_raw, right_raw) = body
            .split_once(',')
            .ok_or_else(|| invalid("bounds must be separated by ','"))?;

        let parse_bound = |text: &str, inclusive: bool| -> Result<Option<Bound>> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            let value = match domain {
                IntervalDomain::Integer => text
                    .parse::<i64>()
                    .map(IntervalValue::Integer)
                    .map_err(|_| invalid("bound is not an integer"))?,
                IntervalDomain::Float => text
                    .parse::<f64>()
                    .map(IntervalValue::Float)
                    .map_err(|_| invalid("bound is not a number"))?,
                IntervalDomain::DateTime => DateTime::parse_from_rfc3339(text)
                    .map(IntervalValue::DateTime)
                    .map_err(|_| invalid("bound is not a RFC 3339 date time"))?,
            };
            Ok(Some(Bound { value, inclusive }))
        };

        let left = parse_bound(left_raw, left_inclusive)?;
        let right = parse_bound(right_raw, right_inclusive)?;

        if let (Some(l), Some(r)) = (&left, &right) {
            if l.value.partial_cmp_to(&r.value) == Some(Ordering::Greater) {
                return Err(invalid("left bound is greater than right bound"));
            }
        }

        Ok(Self {
            raw: trimmed.to_string(),
            domain,
            left,
            right,
        })
    }

    pub fn domain(&self) -> IntervalDomain {
        self.domain
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `value` lies inside the interval
    pub fn contains(&self, value: &IntervalValue) -> bool {
        let left_ok = match &self.left {
            None => true,
            Some(bound) => match value.partial_cmp_to(&bound.value) {
                Some(Ordering::Greater) => true,
                Some(Ordering::Equal) => bound.inclusive,
                _ => false,
            },
        };
        let right_ok = match &self.right {
            None => true,
            Some(bound) => match value.partial_cmp_to(&bound.value) {
                Some(Ordering::Less) => true,
                Some(Ordering::Equal) => bound.inclusive,
                _ => false,
            },
        };
        left_ok && right_ok
    }

    pub fn contains_count(&self, count: i64) -> bool {
        self.contains(&IntervalValue::Integer(count))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

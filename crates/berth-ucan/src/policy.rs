//! Delegation policy statements.
//!
//! A policy is a list of `[operator, selector, value]` triples evaluated
//! against invocation arguments. Selectors are jq-like paths such as
//! `.blob.size` or `.location[0].url`.

use berth_core::error::{BerthError, BerthResult};
use ipld_core::ipld::Ipld;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a policy statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Operator {
    /// Wire symbol
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
        }
    }

    fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(Operator::Equal),
            ">" => Some(Operator::GreaterThan),
            ">=" => Some(Operator::GreaterThanOrEqual),
            "<" => Some(Operator::LessThan),
            "<=" => Some(Operator::LessThanOrEqual),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One policy predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub operator: Operator,
    pub selector: String,
    pub value: Ipld,
}

impl Statement {
    pub fn equal(selector: &str, value: impl Into<Ipld>) -> Self {
        Self::new(Operator::Equal, selector, value)
    }

    pub fn greater_than(selector: &str, value: impl Into<Ipld>) -> Self {
        Self::new(Operator::GreaterThan, selector, value)
    }

    pub fn less_than_or_equal(selector: &str, value: impl Into<Ipld>) -> Self {
        Self::new(Operator::LessThanOrEqual, selector, value)
    }

    pub fn new(operator: Operator, selector: &str, value: impl Into<Ipld>) -> Self {
        Self {
            operator,
            selector: selector.to_string(),
            value: value.into(),
        }
    }

    /// Evaluate the statement against `args`; a selector that resolves to nothing fails
    pub fn matches(&self, args: &Ipld) -> BerthResult<bool> {
        let Some(found) = select(&self.selector, args)? else {
            return Ok(false);
        };

        if self.operator == Operator::Equal {
            return Ok(found == &self.value);
        }
        let Some(ordering) = compare(found, &self.value) else {
            return Ok(false);
        };

        Ok(match self.operator {
            Operator::Equal => ordering == Ordering::Equal,
            Operator::GreaterThan => ordering == Ordering::Greater,
            Operator::GreaterThanOrEqual => ordering != Ordering::Less,
            Operator::LessThan => ordering == Ordering::Less,
            Operator::LessThanOrEqual => ordering != Ordering::Greater,
        })
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.selector, self.operator, self.value)
    }
}

impl Serialize for Statement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(self.operator.as_str())?;
        tuple.serialize_element(&self.selector)?;
        tuple.serialize_element(&self.value)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Statement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let (symbol, selector, value) = <(String, String, Ipld)>::deserialize(deserializer)?;
        let operator = Operator::parse(&symbol)
            .ok_or_else(|| D::Error::custom(format!("unsupported policy operator '{}'", symbol)))?;
        Ok(Self {
            operator,
            selector,
            value,
        })
    }
}

/// Check every statement of a policy, reporting the first one that fails
pub fn check(policy: &[Statement], args: &Ipld, capability: &str) -> BerthResult<()> {
    for statement in policy {
        if !statement.matches(args)? {
            return Err(BerthError::PolicyViolation {
                capability: capability.to_string(),
                reason: format!("policy statement failed: {}", statement),
            });
        }
    }
    Ok(())
}

fn compare(a: &Ipld, b: &Ipld) -> Option<Ordering> {
    match (a, b) {
        (Ipld::Integer(a), Ipld::Integer(b)) => Some(a.cmp(b)),
        (Ipld::Float(a), Ipld::Float(b)) => a.partial_cmp(b),
        (Ipld::Integer(a), Ipld::Float(b)) => (*a as f64).partial_cmp(b),
        (Ipld::Float(a), Ipld::Integer(b)) => a.partial_cmp(&(*b as f64)),
        _ => None,
    }
}

/// Resolve a selector like `.a.b[0].c` against a value
pub fn select<'a>(selector: &str, value: &'a Ipld) -> BerthResult<Option<&'a Ipld>> {
    let malformed = |reason: &str| BerthError::Encoding {
        message: format!("malformed selector '{}': {}", selector, reason),
    };

    let mut rest = selector
        .strip_prefix('.')
        .ok_or_else(|| malformed("must start with '.'"))?;
    let mut current = value;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            let (index, tail) = after
                .split_once(']')
                .ok_or_else(|| malformed("unterminated index"))?;
            let index: usize = index.parse().map_err(|_| malformed("index must be a number"))?;
            current = match current {
                Ipld::List(items) => match items.get(index) {
                    Some(item) => item,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            };
            rest = tail;
        } else {
            let rest_field = rest.strip_prefix('.').unwrap_or(rest);
            let end = rest_field
                .find(|c| c == '.' || c == '[')
                .unwrap_or(rest_field.len());
            let (field, tail) = rest_field.split_at(end);
            if field.is_empty() {
                return Err(malformed("empty field name"));
            }
            current = match current {
                Ipld::Map(map) => match map.get(field) {
                    Some(item) => item,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            };
            rest = tail;
        }
    }

    Ok(Some(current))
}

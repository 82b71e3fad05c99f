//! Trigger expressions: `address [operator value]`

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Comparison applied to an incoming value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equal,
    Different,
    Greater,
    GreaterEqual,
    Lower,
    LowerEqual,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::Different => "!=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Lower => "<",
            Operator::LowerEqual => "<=",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => Operator::Equal,
            "!=" => Operator::Different,
            ">" => Operator::Greater,
            ">=" => Operator::GreaterEqual,
            "<" => Operator::Lower,
            "<=" => Operator::LowerEqual,
            _ => return None,
        })
    }

    fn accepts(&self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Operator::Different, None) => true,
            (_, None) => false,
            (Operator::Equal, Some(o)) => o == Ordering::Equal,
            (Operator::Different, Some(o)) => o != Ordering::Equal,
            (Operator::Greater, Some(o)) => o == Ordering::Greater,
            (Operator::GreaterEqual, Some(o)) => o != Ordering::Less,
            (Operator::Lower, Some(o)) => o == Ordering::Less,
            (Operator::LowerEqual, Some(o)) => o != Ordering::Greater,
        }
    }
}

/// A test on the values received at one address
///
/// Without an operator, any value received at the address passes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Expression {
    address: String,
    test: Option<(Operator, Value)>,
}

impl Expression {
    /// Expression passing on anything received at `address`
    pub fn on(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            test: None,
        }
    }

    /// Expression comparing the received value with `value`
    pub fn compare(address: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            address: address.into(),
            test: Some((operator, value.into())),
        }
    }

    /// Parse `"address"` or `"address op value"`
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.split_whitespace();
        let Some(address) = parts.next() else {
            return Ok(Self::default());
        };
        let Some(symbol) = parts.next() else {
            return Ok(Self::on(address));
        };
        let operator = Operator::from_symbol(symbol).ok_or_else(|| {
            Error::Validation(format!("unknown operator '{}' in '{}'", symbol, text))
        })?;
        let rest: Vec<&str> = parts.collect();
        if rest.is_empty() {
            return Err(Error::Validation(format!(
                "missing value after '{}' in '{}'",
                symbol, text
            )));
        }
        Ok(Self::compare(
            address,
            operator,
            Value::parse_literal(&rest.join(" ")),
        ))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_empty(&self) -> bool {
        self.address.is_empty()
    }

    pub fn operator(&self) -> Option<Operator> {
        self.test.as_ref().map(|(op, _)| *op)
    }

    pub fn value(&self) -> Option<&Value> {
        self.test.as_ref().map(|(_, v)| v)
    }

    /// Check an incoming value, reading the expression as `incoming op value`
    pub fn evaluate(&self, incoming: &Value) -> bool {
        match &self.test {
            None => true,
            Some((operator, expected)) => operator.accepts(incoming.compare(expected)),
        }
    }

    /// Check an incoming `(address, value)` pair
    pub fn matches(&self, address: &str, incoming: &Value) -> bool {
        !self.is_empty() && self.address == address && self.evaluate(incoming)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        if let Some((operator, value)) = &self.test {
            match value {
                Value::String(s) if !s.contains(' ') => write!(f, " {} {}", operator.symbol(), s)?,
                other => write!(f, " {} {}", operator.symbol(), other)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Expression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Expression {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Expression> for String {
    fn from(e: Expression) -> Self {
        e.to_string()
    }
}

//! Selection conditions over `(key, value)` tuples.

use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Comparator {
    /// Parse an operator symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Self::Eq),
            "<>" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            "<=" => Some(Self::Le),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }

    /// Whether `lhs <op> rhs` holds given `lhs.cmp(rhs)`
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Lt => ord == Ordering::Less,
            Self::Gt => ord == Ordering::Greater,
            Self::Le => ord != Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One predicate of a `WHERE` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Compares the integer key
    Key { comp: Comparator, value: i32 },
    /// Compares the value string byte-wise
    Value { comp: Comparator, value: String },
}

impl Condition {
    pub fn key(comp: Comparator, value: i32) -> Self {
        Self::Key { comp, value }
    }

    pub fn value(comp: Comparator, value: impl Into<String>) -> Self {
        Self::Value {
            comp,
            value: value.into(),
        }
    }

    /// Evaluate the condition against a tuple
    pub fn matches(&self, key: i32, value: &str) -> bool {
        match self {
            Self::Key { comp, value: rhs } => comp.holds(key.cmp(rhs)),
            Self::Value { comp, value: rhs } => comp.holds(value.as_bytes().cmp(rhs.as_bytes())),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { comp, value } => write!(f, "key {} {}", comp, value),
            Self::Value { comp, value } => write!(f, "value {} '{}'", comp, value),
        }
    }
}

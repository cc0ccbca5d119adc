//! Access path selection for `SELECT`.

use crate::query::{Comparator, Condition};

/// Half-open key interval `[start, end)`, widened to `i64` so bounds next to
/// `i32::MIN` and `i32::MAX` stay representable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    start: i64,
    end: i64,
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::full()
    }
}

impl KeyRange {
    /// Every `i32` key
    pub fn full() -> Self {
        Self {
            start: i64::from(i32::MIN),
            end: i64::from(i32::MAX) + 1,
        }
    }

    /// Narrow the range by one key predicate. `<>` leaves it unchanged.
    pub fn restrict(&mut self, comp: Comparator, value: i32) {
        let v = i64::from(value);
        match comp {
            Comparator::Eq => {
                self.start = self.start.max(v);
                self.end = self.end.min(v + 1);
            }
            Comparator::Lt => self.end = self.end.min(v),
            Comparator::Le => self.end = self.end.min(v + 1),
            Comparator::Gt => self.start = self.start.max(v + 1),
            Comparator::Ge => self.start = self.start.max(v),
            Comparator::Ne => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, key: i32) -> bool {
        (self.start..self.end).contains(&i64::from(key))
    }

    /// Smallest key in the range, `None` if empty
    pub fn first_key(&self) -> Option<i32> {
        if self.is_empty() {
            None
        } else {
            i32::try_from(self.start).ok()
        }
    }

    /// True once `key` lies at or beyond the end of the range
    pub fn is_past(&self, key: i32) -> bool {
        i64::from(key) >= self.end
    }
}

/// How a `SELECT` reaches its tuples
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    /// The conditions cannot all hold; no tuple is read
    Empty,
    /// Walk the index over a key range, then read each tuple
    IndexRange(KeyRange),
    /// Read every tuple of the table
    TableScan,
}

/// Choose an access path for `conditions`.
///
/// The index is used when it exists and at least one key predicate other
/// than `<>` narrows the key range. Value predicates never select the index
/// but are still applied to every tuple read.
pub fn plan(conditions: &[Condition], index_available: bool) -> AccessPath {
    let mut range = KeyRange::full();
    let mut narrowed = false;
    let mut value_eq: Option<&str> = None;

    for condition in conditions {
        match condition {
            Condition::Key { comp, value } => {
                range.restrict(*comp, *value);
                narrowed |= *comp != Comparator::Ne;
            }
            Condition::Value {
                comp: Comparator::Eq,
                value,
            } => match value_eq {
                Some(prev) if prev != value.as_str() => return AccessPath::Empty,
                _ => value_eq = Some(value.as_str()),
            },
            Condition::Value { .. } => {}
        }
    }

    if range.is_empty() {
        AccessPath::Empty
    } else if index_available && narrowed {
        AccessPath::IndexRange(range)
    } else {
        AccessPath::TableScan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Comparator::*;

    fn range(conds: &[(Comparator, i32)]) -> KeyRange {
        let mut r = KeyRange::full();
        for (comp, v) in conds {
            r.restrict(*comp, *v);
        }
        r
    }

    #[test]
    fn test_range_folding() {
        let r = range(&[(Gt, 10), (Le, 20)]);
        assert_eq!(r.first_key(), Some(11));
        assert!(r.contains(20));
        assert!(!r.contains(21));
        assert!(r.is_past(21));

        let r = range(&[(Ge, 5), (Lt, 5)]);
        assert!(r.is_empty());

        let r = range(&[(Eq, 7), (Eq, 8)]);
        assert!(r.is_empty());

        let r = range(&[(Eq, 7), (Ge, 3), (Ne, 7)]);
        assert_eq!(r.first_key(), Some(7));
        assert!(!r.is_past(7));
    }

    #[test]
    fn test_range_extremes() {
        assert!(range(&[(Gt, i32::MAX)]).is_empty());
        assert!(range(&[(Lt, i32::MIN)]).is_empty());
        assert_eq!(range(&[(Le, i32::MAX)]).first_key(), Some(i32::MIN));
        assert!(range(&[(Ge, i32::MAX)]).contains(i32::MAX));
    }

    #[test]
    fn test_index_choice() {
        let key_eq = [Condition::key(Eq, 5)];
        assert!(matches!(plan(&key_eq, true), AccessPath::IndexRange(_)));
        assert_eq!(plan(&key_eq, false), AccessPath::TableScan);

        let only_ne = [Condition::key(Ne, 5)];
        assert_eq!(plan(&only_ne, true), AccessPath::TableScan);

        let mixed = [Condition::key(Lt, 100), Condition::value(Eq, "x")];
        assert!(matches!(plan(&mixed, true), AccessPath::IndexRange(_)));

        let only_value = [Condition::value(Gt, "m")];
        assert_eq!(plan(&only_value, true), AccessPath::TableScan);
        assert_eq!(plan(&[], true), AccessPath::TableScan);
    }

    #[test]
    fn test_contradictions_are_empty() {
        let keys = [Condition::key(Eq, 1), Condition::key(Eq, 2)];
        assert_eq!(plan(&keys, true), AccessPath::Empty);
        assert_eq!(plan(&keys, false), AccessPath::Empty);

        let values = [Condition::value(Eq, "a"), Condition::value(Eq, "b")];
        assert_eq!(plan(&values, false), AccessPath::Empty);

        let same = [Condition::value(Eq, "a"), Condition::value(Eq, "a")];
        assert_eq!(plan(&same, false), AccessPath::TableScan);
    }
}

//! Records of model metrics.
//!
//! [`Record`] is what [`ModelV2::metrics`](crate::ModelV2::metrics) returns: a
//! flat map from metric names to values, merged by the caller into its own
//! logging.
//!
//! ```rust
//! use rlmodel_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("policy_entropy", 1.2);
//! record.insert("lstm_cell_size", RecordValue::Scalar(256.0));
//! assert_eq!(record.get_scalar("policy_entropy"), Some(1.2));
//! ```
use std::collections::{hash_map::Iter, HashMap};

/// Represents possible types of values in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value.
    Scalar(f32),

    /// A 1-dimensional array.
    Array1(Vec<f32>),

    /// A text value.
    String(String),
}

/// A container of key-value pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Gets a scalar value, `None` if the key is missing or not a scalar.
    pub fn get_scalar(&self, k: &str) -> Option<f32> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns an iterator over the key-value pairs.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Merges two records. Values of `record` overwrite those of `self`.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Returns `true` if the record contains no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_merge_overwrites() {
        let r1 = Record::from_scalar("loss", 1.0);
        let mut r2 = Record::from_scalar("loss", 2.0);
        r2.insert("name", RecordValue::String("fc".into()));

        let r = r1.merge(r2);
        assert_eq!(r.len(), 2);
        assert_eq!(r.get_scalar("loss"), Some(2.0));
        assert_eq!(r.get_scalar("name"), None);
    }
}

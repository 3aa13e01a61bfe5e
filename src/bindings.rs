//! Parameter binding storage for prepared statements
//!
//! A [`BindingStore`] is a 1-based, growable list of typed values. Binding
//! past the end grows the store and fills the gap with nulls; clearing
//! resets every slot to null but keeps the size. Execution reads the whole
//! list, gaps included, without changing it.

use duckdb::types::{ToSql, ToSqlOutput, Value};
use tracing::debug;

use crate::error::{BridgeError, Result};

/// Highest parameter position accepted by [`BindingStore::bind`]
///
/// Matches the engine's limit on declared parameters. Anything larger can
/// never line up with a placeholder, and growing to it would only burn
/// memory.
pub const MAX_PARAMETER_INDEX: i64 = 65_535;

/// One bound parameter value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BoundValue {
    /// SQL NULL (also the filler for unbound gaps)
    #[default]
    Null,
    /// VARCHAR
    Text(String),
    /// BIGINT
    BigInt(i64),
    /// DOUBLE
    Double(f64),
    /// BOOLEAN
    Boolean(bool),
}

impl BoundValue {
    /// Whether this slot holds SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, BoundValue::Null)
    }

    /// Convert one element of a JSON parameter list
    ///
    /// Integers that fit in `i64` bind as BIGINT, other numbers as DOUBLE.
    /// Arrays and objects bind as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => BoundValue::Null,
            serde_json::Value::Bool(b) => BoundValue::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => BoundValue::BigInt(i),
                None => n
                    .as_f64()
                    .map(BoundValue::Double)
                    .unwrap_or_else(|| BoundValue::Text(n.to_string())),
            },
            serde_json::Value::String(s) => BoundValue::Text(s.clone()),
            other => BoundValue::Text(other.to_string()),
        }
    }
}

impl ToSql for BoundValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            BoundValue::Null => Value::Null,
            BoundValue::Text(s) => Value::Text(s.clone()),
            BoundValue::BigInt(i) => Value::BigInt(*i),
            BoundValue::Double(d) => Value::Double(*d),
            BoundValue::Boolean(b) => Value::Boolean(*b),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

impl From<&str> for BoundValue {
    fn from(s: &str) -> Self {
        BoundValue::Text(s.to_string())
    }
}

impl From<String> for BoundValue {
    fn from(s: String) -> Self {
        BoundValue::Text(s)
    }
}

impl From<i64> for BoundValue {
    fn from(i: i64) -> Self {
        BoundValue::BigInt(i)
    }
}

impl From<i32> for BoundValue {
    fn from(i: i32) -> Self {
        BoundValue::BigInt(i64::from(i))
    }
}

impl From<f64> for BoundValue {
    fn from(d: f64) -> Self {
        BoundValue::Double(d)
    }
}

impl From<bool> for BoundValue {
    fn from(b: bool) -> Self {
        BoundValue::Boolean(b)
    }
}

impl<T: Into<BoundValue>> From<Option<T>> for BoundValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(BoundValue::Null, Into::into)
    }
}

/// Ordered, 1-based parameter values of one prepared statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingStore {
    slots: Vec<BoundValue>,
}

impl BindingStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-sized to `len` null slots
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: vec![BoundValue::Null; len],
        }
    }

    /// Number of slots (never less than the highest index bound)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no slot exists
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Bind `value` at 1-based `index`, growing the store if needed
    ///
    /// Fails without touching the store when `index` is below 1 or above
    /// [`MAX_PARAMETER_INDEX`].
    pub fn bind(&mut self, index: i64, value: impl Into<BoundValue>) -> Result<()> {
        if index < 1 {
            return Err(BridgeError::InvalidParameterIndex(index));
        }
        if index > MAX_PARAMETER_INDEX {
            return Err(BridgeError::ParameterIndexTooLarge(index));
        }

        let slot = (index - 1) as usize;
        if slot >= self.slots.len() {
            debug!(from = self.slots.len(), to = slot + 1, "growing binding store");
            self.slots.resize(slot + 1, BoundValue::Null);
        }
        self.slots[slot] = value.into();
        Ok(())
    }

    /// Bind SQL NULL at 1-based `index`
    pub fn bind_null(&mut self, index: i64) -> Result<()> {
        self.bind(index, BoundValue::Null)
    }

    /// Bind each element of `values` at positions 1, 2, ...
    pub fn bind_all<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<BoundValue>,
    {
        for (index, value) in (1..).zip(values) {
            self.bind(index, value)?;
        }
        Ok(())
    }

    /// Bind a JSON array positionally
    ///
    /// The whole text is parsed before anything is bound, so a malformed
    /// list leaves the store as it was.
    pub fn bind_json(&mut self, json: &str) -> Result<usize> {
        let parsed: serde_json::Value =
            serde_json::from_str(json).map_err(|e| BridgeError::Params(e.to_string()))?;
        let items = match parsed {
            serde_json::Value::Array(items) => items,
            other => {
                return Err(BridgeError::Params(format!(
                    "expected a JSON array, got {}",
                    json_kind(&other)
                )))
            }
        };
        if items.len() as u64 > MAX_PARAMETER_INDEX as u64 {
            return Err(BridgeError::ParameterIndexTooLarge(items.len() as i64));
        }

        let count = items.len();
        self.bind_all(items.iter().map(BoundValue::from_json))?;
        Ok(count)
    }

    /// Reset every slot to null, keeping the size
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = BoundValue::Null;
        }
    }

    /// Value at 1-based `index`, if that slot exists
    pub fn get(&self, index: i64) -> Option<&BoundValue> {
        if index < 1 {
            return None;
        }
        self.slots.get((index - 1) as usize)
    }

    /// All slots in position order
    pub fn values(&self) -> &[BoundValue] {
        &self.slots
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bind_grows_with_null_gap() {
        let mut store = BindingStore::new();
        store.bind(5, "five").unwrap();
        assert!(store.len() >= 5);
        for index in 1..5 {
            assert_eq!(store.get(index), Some(&BoundValue::Null));
        }
        assert_eq!(store.get(5), Some(&BoundValue::Text("five".into())));

        store.clear();
        assert!(store.len() >= 5);
        assert!(store.values().iter().all(BoundValue::is_null));
    }

    #[test]
    fn test_bind_rejects_low_index() {
        let mut store = BindingStore::with_len(2);
        store.bind(1, 10i64).unwrap();
        let before = store.clone();

        assert!(matches!(
            store.bind(0, 1i64),
            Err(BridgeError::InvalidParameterIndex(0))
        ));
        assert!(matches!(
            store.bind(-3, "x"),
            Err(BridgeError::InvalidParameterIndex(-3))
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn test_bind_rejects_huge_index() {
        let mut store = BindingStore::new();
        assert!(matches!(
            store.bind(MAX_PARAMETER_INDEX + 1, true),
            Err(BridgeError::ParameterIndexTooLarge(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_bind_overwrites() {
        let mut store = BindingStore::with_len(1);
        store.bind(1, 1i64).unwrap();
        store.bind(1, 2.5).unwrap();
        store.bind_null(1).unwrap();
        store.bind(1, false).unwrap();
        assert_eq!(store.values(), &[BoundValue::Boolean(false)]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_option_binds_null() {
        let mut store = BindingStore::new();
        store.bind(1, None::<&str>).unwrap();
        store.bind(2, Some("y")).unwrap();
        assert_eq!(
            store.values(),
            &[BoundValue::Null, BoundValue::Text("y".into())]
        );
    }

    #[test]
    fn test_bind_json() {
        let mut store = BindingStore::new();
        let count = store
            .bind_json(r#"[null, "a", 7, 1.5, true, {"k": 1}, [1, 2]]"#)
            .unwrap();
        assert_eq!(count, 7);
        assert_eq!(
            store.values(),
            &[
                BoundValue::Null,
                BoundValue::Text("a".into()),
                BoundValue::BigInt(7),
                BoundValue::Double(1.5),
                BoundValue::Boolean(true),
                BoundValue::Text(r#"{"k":1}"#.into()),
                BoundValue::Text("[1,2]".into()),
            ]
        );
    }

    #[test]
    fn test_bind_json_rejects_non_array() {
        let mut store = BindingStore::with_len(1);
        store.bind(1, "keep").unwrap();
        assert!(matches!(
            store.bind_json(r#"{"a": 1}"#),
            Err(BridgeError::Params(_))
        ));
        assert!(matches!(store.bind_json("[1,"), Err(BridgeError::Params(_))));
        assert_eq!(store.get(1), Some(&BoundValue::Text("keep".into())));
    }

    #[test]
    fn test_large_unsigned_json_number_binds_as_double() {
        assert_eq!(
            BoundValue::from_json(&serde_json::json!(u64::MAX)),
            BoundValue::Double(u64::MAX as f64)
        );
    }

    #[test]
    fn test_to_sql_owned() {
        let out = BoundValue::BigInt(3).to_sql().unwrap();
        assert!(matches!(out, ToSqlOutput::Owned(Value::BigInt(3))));
        let out = BoundValue::Null.to_sql().unwrap();
        assert!(matches!(out, ToSqlOutput::Owned(Value::Null)));
    }

    proptest! {
        #[test]
        fn prop_size_covers_highest_index(indexes in proptest::collection::vec(1i64..200, 1..20)) {
            let mut store = BindingStore::new();
            for &index in &indexes {
                store.bind(index, index).unwrap();
            }
            let highest = *indexes.iter().max().unwrap();
            prop_assert_eq!(store.len(), highest as usize);
            prop_assert_eq!(store.get(highest), Some(&BoundValue::BigInt(highest)));
        }
    }
}

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;

use super::controller::{FormError, FormResult};
use super::transform::TransformError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl From<&'static str> for FieldKey {
    fn from(value: &'static str) -> Self {
        Self(value)
    }
}

/// Typed value of a single field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    /// `None` when the native text is empty or not a number.
    Number(Option<Decimal>),
    List(Vec<String>),
    /// The field has rules but no readable element: never bound, dropped or
    /// unmounted. Only rule evaluation produces it; no element accepts it.
    Missing,
}

impl FieldValue {
    pub const fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Bool(_) => "bool",
            FieldValue::Number(_) => "number",
            FieldValue::List(_) => "list",
            FieldValue::Missing => "missing",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(value) => *value,
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(values) => Some(values),
            _ => None,
        }
    }

    /// Empty text, unchecked, missing number, empty selection or no element.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Bool(value) => !value,
            FieldValue::Number(value) => value.is_none(),
            FieldValue::List(values) => values.is_empty(),
            FieldValue::Missing => true,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Number(Some(value))
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Rust types a field can be read into and written from.
pub trait FieldType: Sized {
    const EXPECTED: &'static str;

    fn from_field_value(value: FieldValue) -> Option<Self>;
    fn into_field_value(self) -> FieldValue;
}

impl FieldType for String {
    const EXPECTED: &'static str = "text";

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::Text(self)
    }
}

impl FieldType for bool {
    const EXPECTED: &'static str = "bool";

    fn from_field_value(value: FieldValue) -> Option<Self> {
        value.as_bool()
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::Bool(self)
    }
}

impl FieldType for Option<Decimal> {
    const EXPECTED: &'static str = "number";

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Number(number) => Some(number),
            _ => None,
        }
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::Number(self)
    }
}

impl FieldType for Decimal {
    const EXPECTED: &'static str = "number";

    fn from_field_value(value: FieldValue) -> Option<Self> {
        value.as_number()
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::Number(Some(self))
    }
}

impl FieldType for Vec<String> {
    const EXPECTED: &'static str = "list";

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::List(values) => Some(values),
            _ => None,
        }
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::List(self)
    }
}

impl FieldType for FieldValue {
    const EXPECTED: &'static str = "any";

    fn from_field_value(value: FieldValue) -> Option<Self> {
        Some(value)
    }

    fn into_field_value(self) -> FieldValue {
        self
    }
}

/// Values of every readable field at one point in time.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValueSnapshot {
    values: BTreeMap<FieldKey, FieldValue>,
}

impl ValueSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: FieldKey, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.values.insert(key, value.into())
    }

    pub fn with(mut self, key: FieldKey, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: FieldKey) -> Option<&FieldValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &FieldValue)> + '_ {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads one field as `T`.
    pub fn decode<T: FieldType>(&self, key: FieldKey) -> FormResult<T> {
        let value = self
            .values
            .get(&key)
            .cloned()
            .ok_or(FormError::MissingField(key))?;
        T::from_field_value(value).ok_or_else(|| {
            TransformError::TypeMismatch {
                key,
                expected: T::EXPECTED,
            }
            .into()
        })
    }

    pub fn into_inner(self) -> BTreeMap<FieldKey, FieldValue> {
        self.values
    }
}

impl FromIterator<(FieldKey, FieldValue)> for ValueSnapshot {
    fn from_iter<I: IntoIterator<Item = (FieldKey, FieldValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValueSnapshot {
    type Item = (FieldKey, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<FieldKey, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Typed record view of a form, usually derived with `#[derive(FormModel)]`.
pub trait FormModel: Sized {
    type Fields;

    fn fields() -> Self::Fields;
    fn field_keys() -> &'static [FieldKey];
    fn from_snapshot(snapshot: &ValueSnapshot) -> FormResult<Self>;
    fn into_snapshot(self) -> ValueSnapshot;
}

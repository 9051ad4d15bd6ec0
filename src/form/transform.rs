use std::str::FromStr;

use rust_decimal::Decimal;

use super::model::{FieldKey, FieldValue};
use crate::element::{ChangeEvent, ChangeOrigin, ElementKind, FormElement};

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("field `{0}` is not registered")]
    Unregistered(FieldKey),
    #[error("element is no longer mounted")]
    Detached,
    #[error("{kind} element cannot hold a {value} value")]
    KindMismatch {
        kind: ElementKind,
        value: &'static str,
    },
    #[error("field `{key}` does not hold a {expected} value")]
    TypeMismatch {
        key: FieldKey,
        expected: &'static str,
    },
}

/// Reads the element's native state as a typed value.
pub fn read_value(element: &dyn FormElement) -> Result<FieldValue, TransformError> {
    if !element.is_mounted() {
        return Err(TransformError::Detached);
    }
    let native = element.read_native();
    let value = match element.kind() {
        ElementKind::Text | ElementKind::Password | ElementKind::Textarea | ElementKind::Select => {
            FieldValue::Text(native.value)
        }
        ElementKind::Checkbox | ElementKind::Switch => FieldValue::Bool(native.checked),
        ElementKind::Number => FieldValue::Number(parse_number(&native.value)),
        ElementKind::MultiSelect => FieldValue::List(native.selected),
    };
    Ok(value)
}

/// Writes `value` into the element and notifies its listeners with `origin`.
///
/// Nothing is written when the value does not fit the element kind.
pub fn write_value(
    element: &dyn FormElement,
    value: FieldValue,
    origin: ChangeOrigin,
) -> Result<(), TransformError> {
    if !element.is_mounted() {
        return Err(TransformError::Detached);
    }
    ensure_fits(element.kind(), &value)?;
    let mut native = element.read_native();
    match value {
        FieldValue::Text(text) => native.value = text,
        FieldValue::Bool(checked) => native.checked = checked,
        FieldValue::Number(number) => {
            native.value = number.map(|n| n.to_string()).unwrap_or_default()
        }
        FieldValue::List(selected) => native.selected = selected,
        // rejected by ensure_fits
        FieldValue::Missing => return Ok(()),
    }
    element.write_native(native);
    element.dispatch(ChangeEvent { origin });
    Ok(())
}

/// Checks that an element of `kind` can hold `value` without touching it.
pub(crate) fn ensure_fits(kind: ElementKind, value: &FieldValue) -> Result<(), TransformError> {
    let fits = matches!(
        (kind, value),
        (
            ElementKind::Text | ElementKind::Password | ElementKind::Textarea | ElementKind::Select,
            FieldValue::Text(_),
        ) | (ElementKind::Checkbox | ElementKind::Switch, FieldValue::Bool(_))
            | (ElementKind::Number, FieldValue::Number(_))
            | (ElementKind::MultiSelect, FieldValue::List(_))
    );
    if fits {
        Ok(())
    } else {
        Err(TransformError::KindMismatch {
            kind,
            value: value.type_name(),
        })
    }
}

fn parse_number(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

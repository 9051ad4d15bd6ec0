use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use super::model::FieldKey;
use super::transform::TransformError;
use crate::element::{ElementRef, FormElement};

/// Key to element index. Holds weak handles only; the UI layer owns elements.
#[derive(Default)]
pub(crate) struct FieldRegistry {
    entries: BTreeMap<FieldKey, Weak<dyn FormElement>>,
}

impl FieldRegistry {
    pub(crate) fn insert(&mut self, key: FieldKey, element: &ElementRef) -> bool {
        self.entries.insert(key, Arc::downgrade(element)).is_some()
    }

    pub(crate) fn resolve(&self, key: FieldKey) -> Result<ElementRef, TransformError> {
        let weak = self
            .entries
            .get(&key)
            .ok_or(TransformError::Unregistered(key))?;
        match weak.upgrade() {
            Some(element) if element.is_mounted() => Ok(element),
            _ => Err(TransformError::Detached),
        }
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.entries.keys().copied()
    }

    /// Every entry, live or stale, in key order.
    pub(crate) fn entries(&self) -> Vec<(FieldKey, Weak<dyn FormElement>)> {
        self.entries
            .iter()
            .map(|(key, weak)| (*key, weak.clone()))
            .collect()
    }
}

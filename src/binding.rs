//! Binding between a calculator's form fields and the [`CalculatorStore`].
//!
//! A [`PersistedCalculator`] keeps a local copy of one calculator's fields.
//! It starts from the defaults, picks up previously stored values when
//! activated, and writes the whole field set back to the store after every
//! edit. Edits made through [`PersistedCalculator::edit`] are observed as a
//! batch: the guard writes back once when dropped, and only if something
//! changed.

use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::storage::KeyValueStorage;
use crate::values::{CalculatorStore, FieldValue, FieldValues};

pub struct PersistedCalculator {
    calculator_id: String,
    defaults: FieldValues,
    values: FieldValues,
}

impl PersistedCalculator {
    pub fn new(calculator_id: &str, defaults: FieldValues) -> Self {
        Self {
            calculator_id: calculator_id.to_string(),
            values: defaults.clone(),
            defaults,
        }
    }

    /// Build from `(field, default)` pairs.
    pub fn with_defaults<K, V>(
        calculator_id: &str,
        defaults: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let defaults = defaults
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(calculator_id, defaults)
    }

    /// Overlay stored values for the fields this calculator declares.
    /// Fields with nothing stored keep their defaults; stored fields that
    /// are not declared are ignored. If the overlay changed anything, the
    /// merged field set (defaults included) is written back.
    pub fn activate<S: KeyValueStorage>(&mut self, store: &mut CalculatorStore<S>) {
        let stored = store.calculator_values(&self.calculator_id);
        let mut changed = false;
        for (field, value) in self.values.iter_mut() {
            if let Some(saved) = stored.get(field) {
                if *value != *saved {
                    *value = saved.clone();
                    changed = true;
                }
            }
        }
        debug!(
            "Activated calculator '{}' ({} stored fields)",
            self.calculator_id,
            stored.len()
        );

        if changed {
            self.write_back(store);
        }
    }

    pub fn calculator_id(&self) -> &str {
        &self.calculator_id
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldValue> {
        self.values.get(field_id)
    }

    /// Number value of a field, if it holds one.
    pub fn number(&self, field_id: &str) -> Option<f64> {
        self.get(field_id)?.as_f64()
    }

    /// Set one field and write the field set back.
    pub fn set<S: KeyValueStorage>(
        &mut self,
        store: &mut CalculatorStore<S>,
        field_id: &str,
        value: impl Into<FieldValue>,
    ) {
        self.values.insert(field_id.to_string(), value.into());
        self.write_back(store);
    }

    /// Mutable access to the whole field set. Changes are written back when
    /// the returned guard is dropped.
    pub fn edit<'a, S: KeyValueStorage>(
        &'a mut self,
        store: &'a mut CalculatorStore<S>,
    ) -> ValuesGuard<'a, S> {
        let snapshot = self.values.clone();
        ValuesGuard {
            binding: self,
            store,
            snapshot,
        }
    }

    /// Restore the defaults and drop the calculator's stored entry.
    pub fn reset<S: KeyValueStorage>(&mut self, store: &mut CalculatorStore<S>) {
        self.values = self.defaults.clone();
        store.clear_calculator(&self.calculator_id);
    }

    fn write_back<S: KeyValueStorage>(&self, store: &mut CalculatorStore<S>) {
        store.set_calculator_values(&self.calculator_id, self.values.clone());
    }
}

/// Write-back guard returned by [`PersistedCalculator::edit`].
pub struct ValuesGuard<'a, S: KeyValueStorage> {
    binding: &'a mut PersistedCalculator,
    store: &'a mut CalculatorStore<S>,
    snapshot: FieldValues,
}

impl<S: KeyValueStorage> Deref for ValuesGuard<'_, S> {
    type Target = FieldValues;

    fn deref(&self) -> &FieldValues {
        &self.binding.values
    }
}

impl<S: KeyValueStorage> DerefMut for ValuesGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut FieldValues {
        &mut self.binding.values
    }
}

impl<S: KeyValueStorage> Drop for ValuesGuard<'_, S> {
    fn drop(&mut self) {
        if self.binding.values != self.snapshot {
            self.binding.write_back(&mut *self.store);
        }
    }
}

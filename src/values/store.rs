use chrono::{SubsecRound, Utc};
use tracing::{debug, info, warn};

use super::types::{CalculatorValues, FieldValue, FieldValues};
use crate::storage::{KeyValueStorage, Persistence, CALCULATOR_VALUES_KEY, LAST_PAGE_KEY};
use crate::transfer::{parse_section, ValuesExport, VersionPolicy, EXPORT_VERSION};

/// Page shown when nothing has been visited yet.
pub const DEFAULT_PAGE: &str = "home";

/// Per-calculator field values, persisted on every mutation.
///
/// A calculator with no entry behaves exactly like one with an empty
/// mapping. Every mutating call writes the whole values mapping and the
/// last visited page before it returns; a failed write is logged and the
/// in-memory change is kept.
pub struct CalculatorStore<S> {
    values: CalculatorValues,
    last_visited_page: String,
    persistence: Persistence<S>,
}

impl<S: KeyValueStorage> CalculatorStore<S> {
    /// Load the store from `storage`. Missing or malformed data yields an
    /// empty store.
    pub fn load(storage: S) -> Self {
        let persistence = Persistence::new(storage);
        let values: CalculatorValues = persistence
            .load_json(CALCULATOR_VALUES_KEY)
            .unwrap_or_default();
        let last_visited_page = persistence
            .load(LAST_PAGE_KEY)
            .unwrap_or_else(|| DEFAULT_PAGE.to_string());

        info!(
            "Loaded values for {} calculators (last page: {})",
            values.len(),
            last_visited_page
        );
        Self {
            values,
            last_visited_page,
            persistence,
        }
    }

    /// Stored value of a field, or `default` when it was never set.
    pub fn get_value(&self, calculator_id: &str, field_id: &str, default: FieldValue) -> FieldValue {
        self.values
            .get(calculator_id)
            .and_then(|fields| fields.get(field_id))
            .cloned()
            .unwrap_or(default)
    }

    pub fn set_value(
        &mut self,
        calculator_id: &str,
        field_id: &str,
        value: impl Into<FieldValue>,
    ) {
        self.values
            .entry(calculator_id.to_string())
            .or_default()
            .insert(field_id.to_string(), value.into());
        self.save();
    }

    /// All fields of a calculator; empty when the calculator is unknown.
    pub fn calculator_values(&self, calculator_id: &str) -> FieldValues {
        self.values.get(calculator_id).cloned().unwrap_or_default()
    }

    /// Replace a calculator's fields wholesale.
    pub fn set_calculator_values(&mut self, calculator_id: &str, fields: FieldValues) {
        self.values.insert(calculator_id.to_string(), fields);
        self.save();
    }

    pub fn clear_calculator(&mut self, calculator_id: &str) {
        self.values.remove(calculator_id);
        self.save();
    }

    pub fn clear_all(&mut self) {
        self.values.clear();
        self.save();
    }

    pub fn last_visited_page(&self) -> &str {
        &self.last_visited_page
    }

    pub fn set_last_visited_page(&mut self, page_id: &str) {
        self.last_visited_page = page_id.to_string();
        self.save();
    }

    pub fn values(&self) -> &CalculatorValues {
        &self.values
    }

    /// Snapshot every calculator's values for backup.
    pub fn export_data(&self) -> ValuesExport {
        ValuesExport {
            values: self.values.clone(),
            exported_at: Utc::now().trunc_subsecs(3),
            version: EXPORT_VERSION.to_string(),
        }
    }

    /// Replace all values with those of a backup payload.
    ///
    /// Returns `false`, leaving the store untouched, when the payload has
    /// no `values` mapping, the mapping is not calculator -> field ->
    /// number|string, or the payload carries a version other than "1.0".
    pub fn import_data(&mut self, data: &serde_json::Value) -> bool {
        match parse_section::<CalculatorValues>(data, "values", VersionPolicy::Optional) {
            Ok(values) => {
                info!("Imported values for {} calculators", values.len());
                self.values = values;
                self.save();
                true
            }
            Err(e) => {
                warn!("Failed to import calculator values: {}", e);
                false
            }
        }
    }

    fn save(&self) {
        let saved_values = self.persistence.save_json(CALCULATOR_VALUES_KEY, &self.values);
        let saved_page = self.persistence.save(LAST_PAGE_KEY, &self.last_visited_page);
        if saved_values && saved_page {
            debug!("Persisted values for {} calculators", self.values.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn create_test_store() -> (CalculatorStore<MemoryStorage>, MemoryStorage) {
        let storage = MemoryStorage::new();
        (CalculatorStore::load(storage.clone()), storage)
    }

    #[test]
    fn test_unset_field_returns_default() {
        let (store, _storage) = create_test_store();
        assert_eq!(
            store.get_value("extruder", "eSteps", FieldValue::from(93)),
            FieldValue::Number(93.0)
        );
        assert_eq!(
            store.get_value("flow", "method", FieldValue::from("pass1")),
            FieldValue::from("pass1")
        );
    }

    #[test]
    fn test_set_value_is_visible() {
        let (mut store, _storage) = create_test_store();
        store.set_value("extruder", "eSteps", 415);
        assert_eq!(
            store.get_value("extruder", "eSteps", FieldValue::from(0)),
            FieldValue::Number(415.0)
        );
    }

    #[test]
    fn test_set_value_creates_calculator_entry() {
        let (mut store, _storage) = create_test_store();
        store.set_value("extruder", "eSteps", 415);
        store.set_value("extruder", "rotationDistance", 8.0);

        let fields = store.calculator_values("extruder");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["eSteps"], FieldValue::Number(415.0));
        assert_eq!(fields["rotationDistance"], FieldValue::Number(8.0));
    }

    #[test]
    fn test_unknown_calculator_is_empty() {
        let (store, _storage) = create_test_store();
        assert!(store.calculator_values("never-used").is_empty());
    }

    #[test]
    fn test_set_calculator_values_replaces() {
        let (mut store, _storage) = create_test_store();
        store.set_value("flow", "oldFlow", 0.98);
        store.set_value("flow", "slide", 5);

        let mut fields = FieldValues::new();
        fields.insert("oldFlow".to_string(), FieldValue::from(1.02));
        store.set_calculator_values("flow", fields.clone());

        assert_eq!(store.calculator_values("flow"), fields);
    }

    #[test]
    fn test_clear_calculator() {
        let (mut store, _storage) = create_test_store();
        store.set_value("extruder", "eSteps", 415);
        store.set_value("flow", "oldFlow", 0.98);

        store.clear_calculator("extruder");
        assert!(store.calculator_values("extruder").is_empty());
        assert!(!store.values().contains_key("extruder"));
        assert_eq!(store.calculator_values("flow").len(), 1);
    }

    #[test]
    fn test_clear_all() {
        let (mut store, storage) = create_test_store();
        store.set_value("extruder", "eSteps", 415);
        store.set_value("flow", "oldFlow", 0.98);
        store.clear_all();

        assert!(store.values().is_empty());
        let reloaded = CalculatorStore::load(storage);
        assert!(reloaded.values().is_empty());
    }

    #[test]
    fn test_mutations_persist() {
        let (mut store, storage) = create_test_store();
        store.set_value("extruder", "eSteps", 415);
        store.set_last_visited_page("extruder");
        assert_eq!(
            storage.get_item(CALCULATOR_VALUES_KEY).unwrap().as_deref(),
            Some(r#"{"extruder":{"eSteps":415}}"#)
        );

        let reloaded = CalculatorStore::load(storage);
        assert_eq!(reloaded.last_visited_page(), "extruder");
        assert_eq!(
            reloaded.get_value("extruder", "eSteps", FieldValue::from(0)),
            FieldValue::Number(415.0)
        );
    }

    #[test]
    fn test_last_page_defaults_to_home() {
        let (store, _storage) = create_test_store();
        assert_eq!(store.last_visited_page(), DEFAULT_PAGE);
    }

    #[test]
    fn test_malformed_storage_loads_empty() {
        let storage = MemoryStorage::new();
        storage
            .set_item(CALCULATOR_VALUES_KEY, "[1, 2, 3")
            .unwrap();

        let store = CalculatorStore::load(storage);
        assert!(store.values().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_memory_state() {
        let (mut store, storage) = create_test_store();
        storage.set_fail_writes(true);

        store.set_value("extruder", "eSteps", 415);
        assert_eq!(
            store.get_value("extruder", "eSteps", FieldValue::from(0)),
            FieldValue::Number(415.0)
        );
        assert!(storage.is_empty());
    }

    #[test]
    fn test_export_import_round_trip() {
        let (mut store, _storage) = create_test_store();
        store.set_value("extruder", "eSteps", 415);
        store.set_value("input-shaping", "shaper", "mzv");
        let before = store.values().clone();

        let exported = store.export_data();
        assert_eq!(exported.version, "1.0");

        let payload = serde_json::to_value(&exported).unwrap();
        assert!(store.import_data(&payload));
        assert_eq!(store.values(), &before);
    }

    #[test]
    fn test_import_replaces_everything() {
        let (mut store, storage) = create_test_store();
        store.set_value("extruder", "eSteps", 415);

        let payload = json!({ "values": { "flow": { "oldFlow": 0.95 } } });
        assert!(store.import_data(&payload));
        assert!(store.calculator_values("extruder").is_empty());

        let reloaded = CalculatorStore::load(storage);
        assert_eq!(
            reloaded.get_value("flow", "oldFlow", FieldValue::from(0)),
            FieldValue::Number(0.95)
        );
    }

    #[test]
    fn test_import_rejects_bad_payloads() {
        let (mut store, _storage) = create_test_store();
        store.set_value("extruder", "eSteps", 415);
        let before = store.values().clone();

        assert!(!store.import_data(&json!({ "exportedAt": "2024-01-01T00:00:00Z" })));
        assert!(!store.import_data(&json!({ "values": { "flow": [1, 2] } })));
        assert!(!store.import_data(&json!({ "values": {}, "version": "0.9" })));
        assert!(!store.import_data(&json!(null)));
        assert_eq!(store.values(), &before);
    }
}

// ============================================================================
// Settings Store
// ============================================================================
//
// Stages read their user-facing switches from a settings source and react to
// changes through per-key callbacks. The source only keeps the callbacks; a
// stage that wants to be notified must not be kept alive by them, so stages
// register closures holding weak references.

mod schema;

pub use schema::{KeySpec, SettingsKey, SettingsValue};

use crate::error::SettingsError;
use crate::signal::{Connection, Signal};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Callback invoked with the new value of a key
pub type ChangeCallback = Box<dyn Fn(&SettingsValue) + Send + Sync>;

/// Read access to a settings store plus change notification
pub trait SettingsSource: Send + Sync {
    /// Current value of `key`, `None` if the key is unknown
    fn get(&self, key: &str) -> Option<SettingsValue>;

    /// Subscribe to changes of `key`
    ///
    /// The callback runs on the thread that performed the change.
    fn connect_changed(&self, key: &str, callback: ChangeCallback) -> Connection;

    /// Boolean value of `key`, `None` if the key is unknown or not a bool
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }
}

struct Entry {
    spec: KeySpec,
    value: SettingsValue,
    changed: Signal<SettingsValue>,
}

/// In-memory settings store backed by a schema
pub struct MemorySettings {
    /// Schema identity (e.g. "com.example.spectrum")
    schema_id: String,
    entries: RwLock<BTreeMap<SettingsKey, Entry>>,
}

impl MemorySettings {
    /// Create a store holding the defaults of `schema`
    pub fn new(schema_id: &str, schema: Vec<KeySpec>) -> Self {
        let entries = schema
            .into_iter()
            .map(|spec| {
                let entry = Entry {
                    value: spec.default_value,
                    spec,
                    changed: Signal::new(),
                };
                (entry.spec.key.clone(), entry)
            })
            .collect();

        Self {
            schema_id: schema_id.to_string(),
            entries: RwLock::new(entries),
        }
    }

    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    /// All declared keys, sorted
    pub fn keys(&self) -> Vec<SettingsKey> {
        self.entries.read().keys().cloned().collect()
    }

    /// Store `value` under `key` and notify subscribers if it changed
    pub fn set(&self, key: &str, value: SettingsValue) -> Result<(), SettingsError> {
        let changed = {
            let mut entries = self.entries.write();
            let entry = entries
                .get_mut(&SettingsKey::from(key))
                .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

            entry.spec.validate(&value)?;

            if entry.value == value {
                None
            } else {
                entry.value = value;
                Some(entry.changed.clone())
            }
        };

        // Notify outside the lock so callbacks may read the store
        if let Some(signal) = changed {
            log::debug!("{}: key '{}' changed to {}", self.schema_id, key, value);
            signal.emit(&value);
        }

        Ok(())
    }

    pub fn set_bool(&self, key: &str, value: bool) -> Result<(), SettingsError> {
        self.set(key, SettingsValue::Bool(value))
    }

    /// Restore the default of `key`
    pub fn reset(&self, key: &str) -> Result<(), SettingsError> {
        let default = self
            .entries
            .read()
            .get(&SettingsKey::from(key))
            .map(|entry| entry.spec.default_value)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

        self.set(key, default)
    }

    /// Restore the defaults of every key not listed in `keep`
    pub fn reset_all_except(&self, keep: &[&str]) {
        let to_reset: Vec<(SettingsKey, SettingsValue)> = self
            .entries
            .read()
            .iter()
            .filter(|(key, _)| !keep.contains(&key.0.as_str()))
            .map(|(key, entry)| (key.clone(), entry.spec.default_value))
            .collect();

        for (key, default) in to_reset {
            // Defaults always validate against their own spec
            if let Err(e) = self.set(&key.0, default) {
                log::warn!("{}: failed to reset '{}': {}", self.schema_id, key, e);
            }
        }
    }
}

impl SettingsSource for MemorySettings {
    fn get(&self, key: &str) -> Option<SettingsValue> {
        self.entries
            .read()
            .get(&SettingsKey::from(key))
            .map(|entry| entry.value)
    }

    fn connect_changed(&self, key: &str, callback: ChangeCallback) -> Connection {
        let mut entries = self.entries.write();
        match entries.get_mut(&SettingsKey::from(key)) {
            Some(entry) => entry.changed.connect(move |value| callback(value)),
            None => {
                // Unknown keys never change; hand back a detached connection
                log::warn!("{}: no key named '{}'", self.schema_id, key);
                Signal::<SettingsValue>::new().connect(move |value| callback(value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn store() -> MemorySettings {
        MemorySettings::new(
            "test.spectrum",
            vec![
                KeySpec::new_bool("show", "Show spectrum", true),
                KeySpec::new_int("n-points", "Points", 100, 2, 2048),
            ],
        )
    }

    #[test]
    fn test_defaults() {
        let settings = store();
        assert_eq!(settings.get_bool("show"), Some(true));
        assert_eq!(settings.get("n-points"), Some(SettingsValue::Int(100)));
        assert_eq!(settings.get("missing"), None);
        assert_eq!(settings.get_bool("n-points"), None);
    }

    #[test]
    fn test_change_notification_only_on_change() {
        let settings = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _connection = settings.connect_changed(
            "show",
            Box::new(move |value| s.lock().push(value.as_bool())),
        );

        settings.set_bool("show", true).unwrap();
        settings.set_bool("show", false).unwrap();
        settings.set_bool("show", false).unwrap();
        settings.reset("show").unwrap();

        assert_eq!(*seen.lock(), vec![Some(false), Some(true)]);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let settings = store();
        assert!(matches!(
            settings.set("nope", SettingsValue::Bool(true)),
            Err(SettingsError::UnknownKey(_))
        ));
        assert!(settings.set("show", SettingsValue::Int(1)).is_err());
        assert!(settings.set("n-points", SettingsValue::Int(1)).is_err());
        assert_eq!(settings.get("n-points"), Some(SettingsValue::Int(100)));
    }

    #[test]
    fn test_reset_all_except() {
        let settings = store();
        settings.set_bool("show", false).unwrap();
        settings.set("n-points", SettingsValue::Int(50)).unwrap();

        settings.reset_all_except(&["n-points"]);

        assert_eq!(settings.get_bool("show"), Some(true));
        assert_eq!(settings.get("n-points"), Some(SettingsValue::Int(50)));
    }

    #[test]
    fn test_unknown_key_connection_is_detached() {
        let settings = store();
        let connection = settings.connect_changed("missing", Box::new(|_| {}));
        assert!(!connection.is_connected());
    }
}

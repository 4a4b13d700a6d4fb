//! Checkpoint key interning.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Namespace prefix of checkpoint keys.
pub const DEFAULT_KEY_PREFIX: &str = "affogato:checkpoint:";

/// Builds and interns the store key of each application name.
///
/// Owned by one gate; keys are built once per application and shared
/// afterwards.
#[derive(Debug)]
pub struct KeyRegistry {
    prefix: String,
    keys: RwLock<HashMap<String, Arc<str>>>,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl KeyRegistry {
    /// Creates a registry using `prefix` as key namespace.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the key for `app_name`, building it on first use.
    pub fn key(&self, app_name: &str) -> Arc<str> {
        if let Some(key) = self.keys.read().get(app_name) {
            return Arc::clone(key);
        }

        let mut keys = self.keys.write();
        Arc::clone(
            keys.entry(app_name.to_string())
                .or_insert_with(|| Arc::from(format!("{}{app_name}", self.prefix))),
        )
    }

    /// Number of interned keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Returns true if no key has been built yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
